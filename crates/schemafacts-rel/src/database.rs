//! In-memory fact store.
//!
//! Inserting a value registers it as an entity and walks its entity-valued
//! attributes, registering every referenced value as an entity too. Entity
//! identity is the position in that value graph: a `Node` inserted once yields
//! one node, one target and one element entity, and the target's `Element`
//! fact points at exactly that element.
//!
//! Attribute values are resolved eagerly at insert time. Concrete values are
//! kept (owned) so callers can borrow them back by id.
//!
//! Two bitmap indexes are maintained per insert: kind -> entities, and
//! `(attribute, referenced entity)` -> entities holding that reference. Query
//! evaluation draws candidates from them instead of scanning every entity.

use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attribute::{Attribute, Value};
use crate::schema::{Accessor, Schema};

/// Identifier of an entity within one [`Database`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsertError {
    #[error("entity kind `{kind}` is not registered in schema `{schema}`")]
    UnregisteredKind { schema: String, kind: String },

    #[error("{kind}.{attr}: populated alternative `{name}` is not listed in the schema")]
    UnlistedAlternative {
        kind: String,
        attr: String,
        name: String,
    },
}

pub(crate) struct EntityRecord<A> {
    pub(crate) kind: usize,
    root: usize,
    /// Entity-valued attributes followed from the root value.
    path: Vec<A>,
    pub(crate) attrs: BTreeMap<A, Value>,
}

/// Entities and their facts, interpreted through one schema.
pub struct Database<'s, A: Attribute> {
    schema: &'s Schema<A>,
    roots: Vec<Box<dyn Any + Send + Sync>>,
    entities: Vec<EntityRecord<A>>,
    /// Kind index: kind -> bitmap of entity ids
    kind_index: HashMap<usize, RoaringBitmap>,
    /// Reference index: (attribute, referenced entity) -> bitmap of referrers
    ref_index: HashMap<(A, EntityId), RoaringBitmap>,
}

impl<'s, A: Attribute> Database<'s, A> {
    pub fn new(schema: &'s Schema<A>) -> Self {
        Self {
            schema,
            roots: Vec::new(),
            entities: Vec::new(),
            kind_index: HashMap::new(),
            ref_index: HashMap::new(),
        }
    }

    pub fn schema(&self) -> &'s Schema<A> {
        self.schema
    }

    /// Number of entities (including ones reached through references).
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Insert `value` and everything it references; returns the id of `value`.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) -> Result<EntityId, InsertError> {
        if !self.schema.contains_kind::<T>() {
            return Err(InsertError::UnregisteredKind {
                schema: self.schema.name().to_string(),
                kind: type_name::<T>().to_string(),
            });
        }

        let root = self.roots.len();
        let mark = self.entities.len();
        self.roots.push(Box::new(value));

        let schema = self.schema;
        let root_value: &dyn Any = &*self.roots[root];
        let registered = register(
            schema,
            root_value,
            type_name::<T>(),
            root,
            &[],
            &mut self.entities,
        );
        match registered {
            Ok(id) => {
                self.index_from(mark);
                tracing::trace!(
                    schema = %schema.name(),
                    kind = schema.mapping(self.entities[id.index()].kind).kind,
                    entity = id.raw(),
                    entities = self.entities.len() - mark,
                    "inserted entity"
                );
                Ok(id)
            }
            Err(err) => {
                self.entities.truncate(mark);
                self.roots.pop();
                Err(err)
            }
        }
    }

    /// Borrow the concrete value of `id`, if it is of kind `K`.
    pub fn entity<K: Any>(&self, id: EntityId) -> Option<&K> {
        let record = self.entities.get(id.index())?;
        let mut current: &dyn Any = &*self.roots[record.root];
        for attr in &record.path {
            let mapping = self.schema.mapping_of(current.type_id())?;
            current = mapping.field(*attr)?.accessor.follow(current)?;
        }
        current.downcast_ref::<K>()
    }

    /// Registered kind name of `id`.
    pub fn kind_of(&self, id: EntityId) -> Option<&'static str> {
        self.entities
            .get(id.index())
            .map(|r| self.schema.mapping(r.kind).kind)
    }

    /// Value of `attr` on `id`, if the entity's kind maps it.
    pub fn attr(&self, id: EntityId, attr: A) -> Option<&Value> {
        self.entities.get(id.index())?.attrs.get(&attr)
    }

    /// All entity ids, in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        (0..self.entities.len()).map(|i| EntityId(i as u32))
    }

    /// Ids of entities of kind `K`, in insertion order.
    pub fn ids_of<K: Any>(&self) -> Vec<EntityId> {
        match self.schema.kind_index(TypeId::of::<K>()) {
            Some(kind) => self.ids_of_kind(kind),
            None => Vec::new(),
        }
    }

    pub(crate) fn ids_of_kind(&self, kind: usize) -> Vec<EntityId> {
        self.kind_index
            .get(&kind)
            .map(|ids| ids.iter().map(EntityId).collect())
            .unwrap_or_default()
    }

    /// Bitmap of entities of `kind`.
    pub(crate) fn by_kind(&self, kind: usize) -> Option<&RoaringBitmap> {
        self.kind_index.get(&kind)
    }

    /// Bitmap of entities whose `attr` refers to `target`.
    pub(crate) fn referrers(&self, attr: A, target: EntityId) -> Option<&RoaringBitmap> {
        self.ref_index.get(&(attr, target))
    }

    fn index_from(&mut self, mark: usize) {
        for (idx, record) in self.entities.iter().enumerate().skip(mark) {
            let id = idx as u32;
            self.kind_index
                .entry(record.kind)
                .or_insert_with(RoaringBitmap::new)
                .insert(id);
            for (attr, value) in &record.attrs {
                if let Value::Entity(target) = value {
                    self.ref_index
                        .entry((*attr, *target))
                        .or_insert_with(RoaringBitmap::new)
                        .insert(id);
                }
            }
        }
    }

    pub(crate) fn record(&self, id: EntityId) -> Option<&EntityRecord<A>> {
        self.entities.get(id.index())
    }
}

fn register<A: Attribute>(
    schema: &Schema<A>,
    value: &dyn Any,
    kind_name: &str,
    root: usize,
    path: &[A],
    entities: &mut Vec<EntityRecord<A>>,
) -> Result<EntityId, InsertError> {
    let Some(kind) = schema.kind_index(value.type_id()) else {
        return Err(InsertError::UnregisteredKind {
            schema: schema.name().to_string(),
            kind: kind_name.to_string(),
        });
    };

    let id = EntityId(entities.len() as u32);
    entities.push(EntityRecord {
        kind,
        root,
        path: path.to_vec(),
        attrs: BTreeMap::new(),
    });

    let mapping = schema.mapping(kind);
    let mut attrs = BTreeMap::new();
    for field in &mapping.fields {
        let resolved = match &field.accessor {
            Accessor::Scalar(get) => get(value),
            Accessor::Ref { get, kind_name, .. } => match get(value) {
                Some(child) => {
                    let child_path = extend(path, field.attr);
                    Some(Value::Entity(register(
                        schema,
                        child,
                        kind_name,
                        root,
                        &child_path,
                        entities,
                    )?))
                }
                None => None,
            },
            Accessor::OneOf {
                alternatives, get, ..
            } => match get(value) {
                Some((name, _)) if !alternatives.contains(&name) => {
                    return Err(InsertError::UnlistedAlternative {
                        kind: mapping.kind.to_string(),
                        attr: field.attr.name().to_string(),
                        name: name.to_string(),
                    });
                }
                Some((name, payload)) => {
                    let child_path = extend(path, field.attr);
                    Some(Value::Entity(register(
                        schema,
                        payload,
                        name,
                        root,
                        &child_path,
                        entities,
                    )?))
                }
                None => None,
            },
        };
        if let Some(v) = resolved {
            attrs.insert(field.attr, v);
        }
    }

    entities[id.index()].attrs = attrs;
    Ok(id)
}

fn extend<A: Attribute>(path: &[A], attr: A) -> Vec<A> {
    let mut out = Vec::with_capacity(path.len() + 1);
    out.extend_from_slice(path);
    out.push(attr);
    out
}
