//! Entity mappings, schema construction and validation.
//!
//! A schema is assembled from registrations and then frozen by
//! [`SchemaBuilder::build`], which checks:
//!
//! - the attribute vocabulary (ordinal 0 is reserved, ordinals and names are
//!   unique),
//! - that each kind is registered once and maps each attribute at most once,
//! - that every field accessor resolves on the kind's zero (`Default`) value,
//! - that each attribute has one value type across all kinds (and matches its
//!   declared type, if any),
//! - that entity references and one-of alternatives point at registered kinds,
//!   and that one-of alternative lists are exactly the variant set of the
//!   underlying sum type.
//!
//! The first violation is returned; nothing partially built escapes.

use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attribute::{AttrType, Attribute, Value, ValueType, TYPE_ATTR_ORDINAL};

// ============================================================================
// Accessors
// ============================================================================

pub(crate) type ScalarFn = Box<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;
pub(crate) type RefFn = Box<dyn for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync>;
pub(crate) type OneOfFn =
    Box<dyn for<'a> Fn(&'a dyn Any) -> Option<(&'static str, &'a dyn Any)> + Send + Sync>;

fn ref_fn<F>(f: F) -> RefFn
where
    F: for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync + 'static,
{
    Box::new(f)
}

fn one_of_fn<F>(f: F) -> OneOfFn
where
    F: for<'a> Fn(&'a dyn Any) -> Option<(&'static str, &'a dyn Any)> + Send + Sync + 'static,
{
    Box::new(f)
}

fn zero_value<T: Any + Default>() -> Box<dyn Any> {
    Box::new(T::default())
}

pub(crate) enum Accessor {
    Scalar(ScalarFn),
    Ref {
        kind: TypeId,
        kind_name: &'static str,
        get: RefFn,
    },
    OneOf {
        variants: Vec<Variant>,
        alternatives: Vec<&'static str>,
        get: OneOfFn,
    },
}

impl Accessor {
    /// Follow an entity-valued accessor to the referenced value.
    pub(crate) fn follow<'a>(&self, value: &'a dyn Any) -> Option<&'a dyn Any> {
        match self {
            Accessor::Scalar(_) => None,
            Accessor::Ref { get, .. } => get(value),
            Accessor::OneOf { get, .. } => get(value).map(|(_, payload)| payload),
        }
    }
}

pub(crate) struct FieldLocator<A> {
    pub(crate) attr: A,
    pub(crate) path: &'static str,
    pub(crate) accessor: Accessor,
}

pub(crate) struct KindMapping<A> {
    pub(crate) kind: &'static str,
    pub(crate) type_id: TypeId,
    zero: fn() -> Box<dyn Any>,
    pub(crate) fields: Vec<FieldLocator<A>>,
}

impl<A: Attribute> KindMapping<A> {
    pub(crate) fn field(&self, attr: A) -> Option<&FieldLocator<A>> {
        self.fields.iter().find(|f| f.attr == attr)
    }
}

/// One alternative of a sum type used by a one-of mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant {
    pub name: &'static str,
    pub kind: TypeId,
    pub kind_name: &'static str,
}

impl Variant {
    pub fn new(name: &'static str, kind: TypeId, kind_name: &'static str) -> Self {
        Self {
            name,
            kind,
            kind_name,
        }
    }

    pub fn of<K: Any>(name: &'static str) -> Self {
        Self::new(name, TypeId::of::<K>(), type_name::<K>())
    }
}

// ============================================================================
// EntityMapping
// ============================================================================

/// How to read attributes off entities of kind `T`.
///
/// Field paths are informational (diagnostics, `Schema::describe`); the
/// accessor closures are what the engine evaluates.
pub struct EntityMapping<A: Attribute, T> {
    inner: KindMapping<A>,
    _kind: PhantomData<fn(&T)>,
}

impl<A: Attribute, T: Any + Default> EntityMapping<A, T> {
    pub fn of(kind: &'static str) -> Self {
        Self {
            inner: KindMapping {
                kind,
                type_id: TypeId::of::<T>(),
                zero: zero_value::<T>,
                fields: Vec::new(),
            },
            _kind: PhantomData,
        }
    }

    fn push(mut self, attr: A, path: &'static str, accessor: Accessor) -> Self {
        self.inner.fields.push(FieldLocator {
            attr,
            path,
            accessor,
        });
        self
    }

    /// Map `attr` to a scalar field that is always present.
    pub fn attr<V, F>(self, attr: A, path: &'static str, get: F) -> Self
    where
        V: Into<Value>,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        let get: ScalarFn =
            Box::new(move |any: &dyn Any| any.downcast_ref::<T>().map(|t| get(t).into()));
        self.push(attr, path, Accessor::Scalar(get))
    }

    /// Map `attr` to a scalar reached through a path that may not resolve.
    pub fn try_attr<V, F>(self, attr: A, path: &'static str, get: F) -> Self
    where
        V: Into<Value>,
        F: Fn(&T) -> Option<V> + Send + Sync + 'static,
    {
        let get: ScalarFn = Box::new(move |any: &dyn Any| {
            any.downcast_ref::<T>().and_then(|t| get(t)).map(Into::into)
        });
        self.push(attr, path, Accessor::Scalar(get))
    }

    /// Map `attr` to a contained entity of kind `K`.
    pub fn entity_attr<K, F>(self, attr: A, path: &'static str, get: F) -> Self
    where
        K: Any,
        F: for<'a> Fn(&'a T) -> &'a K + Send + Sync + 'static,
    {
        let get = ref_fn(move |any| any.downcast_ref::<T>().map(|t| get(t) as &dyn Any));
        self.push(
            attr,
            path,
            Accessor::Ref {
                kind: TypeId::of::<K>(),
                kind_name: type_name::<K>(),
                get,
            },
        )
    }

    /// Map `attr` to whichever alternative of a sum type is populated.
    ///
    /// `variants` is the complete variant table of the sum type; `alternatives`
    /// is the list of names this mapping accepts. `get` returns the populated
    /// variant's name and payload.
    pub fn one_of<F>(
        self,
        attr: A,
        path: &'static str,
        variants: Vec<Variant>,
        alternatives: &[&'static str],
        get: F,
    ) -> Self
    where
        F: for<'a> Fn(&'a T) -> (&'static str, &'a dyn Any) + Send + Sync + 'static,
    {
        let get = one_of_fn(move |any| any.downcast_ref::<T>().map(|t| get(t)));
        self.push(
            attr,
            path,
            Accessor::OneOf {
                variants,
                alternatives: alternatives.to_vec(),
                get,
            },
        )
    }
}

// ============================================================================
// Errors
// ============================================================================

/// A schema registration that cannot be frozen.
///
/// Raised while the schema is being built at startup; callers are expected to
/// abort rather than run with a partial schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaDefinitionError {
    #[error("attribute `{attr}` uses the reserved ordinal {ordinal}")]
    ReservedOrdinal { attr: String, ordinal: u16 },

    #[error("attributes `{first}` and `{second}` share ordinal {ordinal}")]
    DuplicateOrdinal {
        ordinal: u16,
        first: String,
        second: String,
    },

    #[error("attribute name `{name}` is used twice")]
    DuplicateAttrName { name: String },

    #[error("{kind}: attribute `{attr}` is not part of the attribute vocabulary")]
    UnknownAttr { kind: String, attr: String },

    #[error("attribute `{attr}` has more than one declared type")]
    DuplicateAttrType { attr: String },

    #[error("entity kind `{kind}` is registered more than once")]
    DuplicateKind { kind: String },

    #[error("{kind}: attribute `{attr}` is mapped more than once")]
    DuplicateAttr { kind: String, attr: String },

    #[error("{kind}: field `{path}` for attribute `{attr}` does not resolve")]
    UnresolvedField {
        kind: String,
        attr: String,
        path: String,
    },

    #[error("{kind}: attribute `{attr}` has type {found}, expected {expected}")]
    ValueTypeMismatch {
        kind: String,
        attr: String,
        expected: ValueType,
        found: ValueType,
    },

    #[error("{kind}: one-of attribute `{attr}` has no declared type")]
    MissingAttrType { kind: String, attr: String },

    #[error("{kind}: one-of attribute `{attr}` lists no alternatives")]
    EmptyAlternatives { kind: String, attr: String },

    #[error("{kind}: alternative `{name}` of `{attr}` is listed twice")]
    DuplicateAlternative {
        kind: String,
        attr: String,
        name: String,
    },

    #[error("{kind}: alternative `{name}` of `{attr}` is not a variant of the element type")]
    UnknownAlternative {
        kind: String,
        attr: String,
        name: String,
    },

    #[error("{kind}: variant `{name}` is missing from the alternatives of `{attr}`")]
    UnlistedVariant {
        kind: String,
        attr: String,
        name: String,
    },

    #[error("{kind}: attribute `{attr}` refers to unregistered kind `{target}`")]
    UnregisteredKind {
        kind: String,
        attr: String,
        target: String,
    },
}

// ============================================================================
// SchemaBuilder
// ============================================================================

/// Accumulates registrations; `build` validates and freezes them.
pub struct SchemaBuilder<A: Attribute> {
    name: String,
    attr_types: Vec<(A, AttrType)>,
    mappings: Vec<KindMapping<A>>,
}

impl<A: Attribute> SchemaBuilder<A> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attr_types: Vec::new(),
            mappings: Vec::new(),
        }
    }

    /// Declare the value type of `attr`.
    pub fn attr_type(mut self, attr: A, ty: AttrType) -> Self {
        self.attr_types.push((attr, ty));
        self
    }

    /// Register an entity kind.
    pub fn entity<T>(mut self, mapping: EntityMapping<A, T>) -> Self {
        self.mappings.push(mapping.inner);
        self
    }

    pub fn build(self) -> Result<Schema<A>, SchemaDefinitionError> {
        let name = self.name.clone();
        match self.freeze() {
            Ok(schema) => {
                tracing::debug!(
                    schema = %schema.name,
                    kinds = schema.kinds.len(),
                    attributes = schema.attr_types.len(),
                    "built relational schema"
                );
                Ok(schema)
            }
            Err(err) => {
                tracing::error!(schema = %name, error = %err, "schema definition rejected");
                Err(err)
            }
        }
    }

    fn freeze(self) -> Result<Schema<A>, SchemaDefinitionError> {
        validate_vocabulary::<A>()?;

        let mut declared: BTreeMap<A, AttrType> = BTreeMap::new();
        for &(attr, ty) in &self.attr_types {
            if !A::ALL.contains(&attr) {
                return Err(SchemaDefinitionError::UnknownAttr {
                    kind: self.name.clone(),
                    attr: attr.name().to_string(),
                });
            }
            if declared.insert(attr, ty).is_some() {
                return Err(SchemaDefinitionError::DuplicateAttrType {
                    attr: attr.name().to_string(),
                });
            }
        }

        let mut by_type: HashMap<TypeId, usize> = HashMap::new();
        let mut kind_names: HashSet<&'static str> = HashSet::new();
        for (idx, mapping) in self.mappings.iter().enumerate() {
            if by_type.insert(mapping.type_id, idx).is_some() || !kind_names.insert(mapping.kind)
            {
                return Err(SchemaDefinitionError::DuplicateKind {
                    kind: mapping.kind.to_string(),
                });
            }
        }

        let mut attr_types: BTreeMap<A, ValueType> = declared
            .iter()
            .map(|(attr, ty)| (*attr, ty.value_type()))
            .collect();

        for mapping in &self.mappings {
            let zero = (mapping.zero)();
            let mut seen: HashSet<A> = HashSet::new();
            for field in &mapping.fields {
                let ctx = FieldContext {
                    kind: mapping.kind,
                    attr: field.attr,
                    path: field.path,
                };
                if !A::ALL.contains(&field.attr) {
                    return Err(ctx.unknown_attr());
                }
                if !seen.insert(field.attr) {
                    return Err(SchemaDefinitionError::DuplicateAttr {
                        kind: ctx.kind.to_string(),
                        attr: ctx.attr_name(),
                    });
                }
                if field.path.is_empty() {
                    return Err(ctx.unresolved());
                }

                let found = match &field.accessor {
                    Accessor::Scalar(get) => match get(&*zero) {
                        Some(value) => value.value_type(),
                        None => return Err(ctx.unresolved()),
                    },
                    Accessor::Ref {
                        kind,
                        kind_name,
                        get,
                    } => {
                        if !by_type.contains_key(kind) {
                            return Err(ctx.unregistered(kind_name));
                        }
                        if get(&*zero).is_none() {
                            return Err(ctx.unresolved());
                        }
                        ValueType::Entity
                    }
                    Accessor::OneOf {
                        variants,
                        alternatives,
                        get,
                    } => {
                        if declared.get(&field.attr) != Some(&AttrType::AnyEntity) {
                            return Err(SchemaDefinitionError::MissingAttrType {
                                kind: ctx.kind.to_string(),
                                attr: ctx.attr_name(),
                            });
                        }
                        validate_alternatives(&ctx, variants, alternatives, &by_type)?;
                        match get(&*zero) {
                            Some((name, payload))
                                if alternatives.contains(&name)
                                    && variants
                                        .iter()
                                        .any(|v| v.name == name && v.kind == payload.type_id()) => {}
                            _ => return Err(ctx.unresolved()),
                        }
                        ValueType::Entity
                    }
                };

                match attr_types.get(&field.attr) {
                    Some(&expected) if expected != found => {
                        return Err(SchemaDefinitionError::ValueTypeMismatch {
                            kind: ctx.kind.to_string(),
                            attr: ctx.attr_name(),
                            expected,
                            found,
                        });
                    }
                    Some(_) => {}
                    None => {
                        attr_types.insert(field.attr, found);
                    }
                }
            }
        }

        Ok(Schema {
            name: self.name,
            declared,
            attr_types,
            kinds: self.mappings,
            by_type,
        })
    }
}

struct FieldContext<A> {
    kind: &'static str,
    attr: A,
    path: &'static str,
}

impl<A: Attribute> FieldContext<A> {
    fn attr_name(&self) -> String {
        self.attr.name().to_string()
    }

    fn unknown_attr(&self) -> SchemaDefinitionError {
        SchemaDefinitionError::UnknownAttr {
            kind: self.kind.to_string(),
            attr: self.attr_name(),
        }
    }

    fn unresolved(&self) -> SchemaDefinitionError {
        SchemaDefinitionError::UnresolvedField {
            kind: self.kind.to_string(),
            attr: self.attr_name(),
            path: self.path.to_string(),
        }
    }

    fn unregistered(&self, target: &str) -> SchemaDefinitionError {
        SchemaDefinitionError::UnregisteredKind {
            kind: self.kind.to_string(),
            attr: self.attr_name(),
            target: target.to_string(),
        }
    }
}

fn validate_vocabulary<A: Attribute>() -> Result<(), SchemaDefinitionError> {
    let mut ordinals: HashMap<u16, A> = HashMap::new();
    let mut names: HashSet<&'static str> = HashSet::new();
    for &attr in A::ALL {
        let ordinal = attr.ordinal();
        if ordinal == TYPE_ATTR_ORDINAL {
            return Err(SchemaDefinitionError::ReservedOrdinal {
                attr: attr.name().to_string(),
                ordinal,
            });
        }
        if let Some(first) = ordinals.insert(ordinal, attr) {
            return Err(SchemaDefinitionError::DuplicateOrdinal {
                ordinal,
                first: first.name().to_string(),
                second: attr.name().to_string(),
            });
        }
        if !names.insert(attr.name()) {
            return Err(SchemaDefinitionError::DuplicateAttrName {
                name: attr.name().to_string(),
            });
        }
    }
    Ok(())
}

fn validate_alternatives<A: Attribute>(
    ctx: &FieldContext<A>,
    variants: &[Variant],
    alternatives: &[&'static str],
    by_type: &HashMap<TypeId, usize>,
) -> Result<(), SchemaDefinitionError> {
    if alternatives.is_empty() {
        return Err(SchemaDefinitionError::EmptyAlternatives {
            kind: ctx.kind.to_string(),
            attr: ctx.attr_name(),
        });
    }

    let mut listed: HashSet<&'static str> = HashSet::new();
    for &name in alternatives {
        if !listed.insert(name) {
            return Err(SchemaDefinitionError::DuplicateAlternative {
                kind: ctx.kind.to_string(),
                attr: ctx.attr_name(),
                name: name.to_string(),
            });
        }
        if !variants.iter().any(|v| v.name == name) {
            return Err(SchemaDefinitionError::UnknownAlternative {
                kind: ctx.kind.to_string(),
                attr: ctx.attr_name(),
                name: name.to_string(),
            });
        }
    }

    for variant in variants {
        if !listed.contains(variant.name) {
            return Err(SchemaDefinitionError::UnlistedVariant {
                kind: ctx.kind.to_string(),
                attr: ctx.attr_name(),
                name: variant.name.to_string(),
            });
        }
        if !by_type.contains_key(&variant.kind) {
            return Err(ctx.unregistered(variant.kind_name));
        }
    }
    Ok(())
}

// ============================================================================
// Schema
// ============================================================================

/// A validated, immutable schema.
///
/// Build it once at startup and share it by reference (it is `Send + Sync`).
pub struct Schema<A: Attribute> {
    name: String,
    declared: BTreeMap<A, AttrType>,
    attr_types: BTreeMap<A, ValueType>,
    kinds: Vec<KindMapping<A>>,
    by_type: HashMap<TypeId, usize>,
}

impl<A: Attribute> fmt::Debug for Schema<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("kinds", &self.kinds.iter().map(|k| k.kind).collect::<Vec<_>>())
            .field("attr_types", &self.attr_types)
            .finish()
    }
}

impl<A: Attribute> Schema<A> {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder<A> {
        SchemaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered kind names, in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.kinds.iter().map(|k| k.kind)
    }

    pub fn contains_kind<K: Any>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<K>())
    }

    pub fn kind_name_of(&self, type_id: TypeId) -> Option<&'static str> {
        self.kind_index(type_id).map(|idx| self.kinds[idx].kind)
    }

    /// Value type of `attr`, if any kind maps it.
    pub fn attr_type(&self, attr: A) -> Option<ValueType> {
        self.attr_types.get(&attr).copied()
    }

    pub fn declared_attr_type(&self, attr: A) -> Option<AttrType> {
        self.declared.get(&attr).copied()
    }

    /// `(attribute, field path)` pairs registered for `kind`.
    pub fn attrs_of(&self, kind: &str) -> Option<Vec<(A, &'static str)>> {
        self.kinds
            .iter()
            .find(|k| k.kind == kind)
            .map(|k| k.fields.iter().map(|f| (f.attr, f.path)).collect())
    }

    /// Alternatives registered for a one-of attribute of `kind`.
    pub fn alternatives_of(&self, kind: &str, attr: A) -> Option<&[&'static str]> {
        let mapping = self.kinds.iter().find(|k| k.kind == kind)?;
        match &mapping.field(attr)?.accessor {
            Accessor::OneOf { alternatives, .. } => Some(alternatives.as_slice()),
            _ => None,
        }
    }

    /// Structural summary, comparable across independently built schemas.
    pub fn describe(&self) -> SchemaDescription {
        SchemaDescription {
            name: self.name.clone(),
            attributes: A::ALL
                .iter()
                .map(|&attr| AttrDescription {
                    name: attr.name().to_string(),
                    ordinal: attr.ordinal(),
                    value_type: self.attr_type(attr),
                })
                .collect(),
            kinds: self
                .kinds
                .iter()
                .map(|k| KindDescription {
                    kind: k.kind.to_string(),
                    fields: k
                        .fields
                        .iter()
                        .map(|f| FieldDescription {
                            attr: f.attr.name().to_string(),
                            path: f.path.to_string(),
                            alternatives: match &f.accessor {
                                Accessor::OneOf { alternatives, .. } => {
                                    alternatives.iter().map(|a| a.to_string()).collect()
                                }
                                _ => Vec::new(),
                            },
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    pub(crate) fn kind_index(&self, type_id: TypeId) -> Option<usize> {
        self.by_type.get(&type_id).copied()
    }

    pub(crate) fn mapping(&self, idx: usize) -> &KindMapping<A> {
        &self.kinds[idx]
    }

    pub(crate) fn mapping_of(&self, type_id: TypeId) -> Option<&KindMapping<A>> {
        self.kind_index(type_id).map(|idx| &self.kinds[idx])
    }

    /// Kinds an entity-valued `attr` may point at, restricted to `subject`
    /// kinds when the subject's kind is known.
    pub(crate) fn referenced_kinds(&self, attr: A, subject: Option<TypeId>) -> HashSet<TypeId> {
        let mut out = HashSet::new();
        for mapping in &self.kinds {
            if subject.is_some_and(|s| s != mapping.type_id) {
                continue;
            }
            match mapping.field(attr).map(|f| &f.accessor) {
                Some(Accessor::Ref { kind, .. }) => {
                    out.insert(*kind);
                }
                Some(Accessor::OneOf { variants, .. }) => {
                    out.extend(variants.iter().map(|v| v.kind));
                }
                _ => {}
            }
        }
        out
    }
}

/// Serializable structural summary of a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescription {
    pub name: String,
    pub attributes: Vec<AttrDescription>,
    pub kinds: Vec<KindDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrDescription {
    pub name: String,
    pub ordinal: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindDescription {
    pub kind: String,
    pub fields: Vec<FieldDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescription {
    pub attr: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
}
