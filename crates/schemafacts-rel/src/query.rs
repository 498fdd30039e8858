//! Query type-checking and evaluation.
//!
//! `Query::new` flattens the clause conjunction and checks it against the
//! schema once. Evaluation is a backtracking join: every variable that is the
//! subject of some clause ranges over entities (narrowed by its type clause,
//! or pinned when an earlier clause already bound it), and each subject's
//! clauses are checked as soon as it is bound. Results do not depend on clause
//! order.

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};

use roaring::RoaringBitmap;
use thiserror::Error;

use crate::attribute::{AttrKey, Attribute, Value, ValueType};
use crate::clause::{Clause, Var};
use crate::database::{Database, EntityId, EntityRecord};
use crate::schema::Schema;

/// A query whose clauses do not fit the schema.
///
/// Queries are defined statically next to the rules that use them, so this is
/// a programmer error rather than a runtime condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryConstructionError {
    #[error("query has no clauses")]
    Empty,

    #[error("attribute `{attr}` is not mapped by any entity kind")]
    UnknownAttr { attr: String },

    #[error("{var}: kind `{kind}` is not registered")]
    UnregisteredKind { var: String, kind: String },

    #[error("{var}: constrained to both `{first}` and `{second}`")]
    ConflictingKinds {
        var: String,
        first: String,
        second: String,
    },

    #[error("{var}: kind `{kind}` has no attribute `{attr}`")]
    AttrNotOnKind {
        var: String,
        kind: String,
        attr: String,
    },

    #[error("{var}.{attr}: cannot refer to {other} of kind `{kind}`")]
    IncompatibleReference {
        var: String,
        attr: String,
        other: String,
        kind: String,
    },

    #[error("{var}.{attr}: expected a {expected} value, got {found}")]
    ValueTypeMismatch {
        var: String,
        attr: String,
        expected: ValueType,
        found: ValueType,
    },

    #[error("{var}.{attr}: a variable cannot be equated with itself")]
    SelfReference { var: String, attr: String },
}

#[derive(Debug, Clone)]
enum Constraint<A> {
    Type { var: Var, kind: usize },
    AttrEqVar { var: Var, attr: A, other: Var },
    AttrEq { var: Var, attr: A, value: Value },
}

impl<A> Constraint<A> {
    fn subject(&self) -> &Var {
        match self {
            Constraint::Type { var, .. }
            | Constraint::AttrEqVar { var, .. }
            | Constraint::AttrEq { var, .. } => var,
        }
    }
}

/// A type-checked conjunctive query.
#[derive(Debug, Clone)]
pub struct Query<A: Attribute> {
    constraints: Vec<Constraint<A>>,
    /// Variables that are the subject of some clause, in first-use order.
    subjects: Vec<Var>,
    /// Every variable, in first-use order.
    vars: Vec<Var>,
}

impl<A: Attribute> Query<A> {
    pub fn new(
        schema: &Schema<A>,
        clauses: impl IntoIterator<Item = Clause>,
    ) -> Result<Self, QueryConstructionError> {
        let clauses: Vec<Clause> = clauses.into_iter().collect();
        let leaves: Vec<&Clause> = clauses.iter().flat_map(Clause::leaves).collect();
        if leaves.is_empty() {
            return Err(QueryConstructionError::Empty);
        }

        let mut kinds: HashMap<Var, usize> = HashMap::new();
        let mut constraints = Vec::with_capacity(leaves.len());
        let mut subjects: Vec<Var> = Vec::new();
        let mut vars: Vec<Var> = Vec::new();

        for leaf in leaves {
            let constraint = match leaf {
                Clause::Type {
                    var,
                    kind,
                    kind_name,
                } => {
                    let Some(idx) = schema.kind_index(*kind) else {
                        return Err(QueryConstructionError::UnregisteredKind {
                            var: var.to_string(),
                            kind: kind_name.to_string(),
                        });
                    };
                    if let Some(&prev) = kinds.get(var) {
                        if prev != idx {
                            return Err(QueryConstructionError::ConflictingKinds {
                                var: var.to_string(),
                                first: schema.mapping(prev).kind.to_string(),
                                second: schema.mapping(idx).kind.to_string(),
                            });
                        }
                    }
                    kinds.insert(var.clone(), idx);
                    Constraint::Type {
                        var: var.clone(),
                        kind: idx,
                    }
                }
                Clause::AttrEqVar { var, attr, other } => {
                    if var == other {
                        return Err(QueryConstructionError::SelfReference {
                            var: var.to_string(),
                            attr: attr.name.to_string(),
                        });
                    }
                    Constraint::AttrEqVar {
                        var: var.clone(),
                        attr: resolve_attr(schema, attr)?,
                        other: other.clone(),
                    }
                }
                Clause::AttrEq { var, attr, value } => {
                    let attr = resolve_attr(schema, attr)?;
                    let expected = schema.attr_type(attr).unwrap_or(ValueType::Entity);
                    if value.value_type() != expected {
                        return Err(QueryConstructionError::ValueTypeMismatch {
                            var: var.to_string(),
                            attr: attr.name().to_string(),
                            expected,
                            found: value.value_type(),
                        });
                    }
                    Constraint::AttrEq {
                        var: var.clone(),
                        attr,
                        value: value.clone(),
                    }
                }
                Clause::And(_) => continue,
            };

            note(&mut subjects, constraint.subject());
            note(&mut vars, constraint.subject());
            if let Constraint::AttrEqVar { other, .. } = &constraint {
                note(&mut vars, other);
            }
            constraints.push(constraint);
        }

        for constraint in &constraints {
            check_attr_fits(schema, &kinds, constraint)?;
        }

        Ok(Self {
            constraints,
            subjects,
            vars,
        })
    }

    /// Every variable the query mentions, in first-use order.
    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    /// Number of leaf constraints.
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// All satisfying assignments, in a deterministic order.
    pub fn evaluate(&self, db: &Database<'_, A>) -> Vec<Bindings> {
        let mut out = Vec::new();
        self.search(db, 0, BTreeMap::new(), &mut out);
        out
    }

    fn search(
        &self,
        db: &Database<'_, A>,
        depth: usize,
        bound: BTreeMap<Var, Value>,
        out: &mut Vec<Bindings>,
    ) {
        let Some(subject) = self.subjects.get(depth) else {
            out.push(Bindings { values: bound });
            return;
        };

        let candidates: Vec<EntityId> = match bound.get(subject) {
            Some(Value::Entity(id)) => vec![*id],
            Some(_) => return,
            None => self.candidates(db, subject, &bound),
        };

        for id in candidates {
            let Some(record) = db.record(id) else {
                continue;
            };
            let mut next = bound.clone();
            next.insert(subject.clone(), Value::Entity(id));
            if self.apply(subject, record, &mut next) {
                self.search(db, depth + 1, next, out);
            }
        }
    }

    /// Entities `subject` may range over: the intersection of its kind bitmap
    /// and, for each reference clause whose object is already bound, the
    /// bitmap of entities referring to that object.
    fn candidates(
        &self,
        db: &Database<'_, A>,
        subject: &Var,
        bound: &BTreeMap<Var, Value>,
    ) -> Vec<EntityId> {
        let mut filters: Vec<&RoaringBitmap> = Vec::new();
        if let Some(kind) = self.kind_of(subject) {
            match db.by_kind(kind) {
                Some(ids) => filters.push(ids),
                None => return Vec::new(),
            }
        }
        for constraint in self.constraints.iter().filter(|c| c.subject() == subject) {
            let Constraint::AttrEqVar { attr, other, .. } = constraint else {
                continue;
            };
            if let Some(Value::Entity(target)) = bound.get(other) {
                match db.referrers(*attr, *target) {
                    Some(ids) => filters.push(ids),
                    None => return Vec::new(),
                }
            }
        }

        filters.sort_by_key(|ids| ids.len());
        let Some((first, rest)) = filters.split_first() else {
            return db.ids().collect();
        };
        let mut ids = (*first).clone();
        for other in rest {
            ids &= *other;
        }
        ids.iter().map(EntityId::new).collect()
    }

    /// Check every constraint on `subject` against `record`, binding objects.
    fn apply(
        &self,
        subject: &Var,
        record: &EntityRecord<A>,
        bound: &mut BTreeMap<Var, Value>,
    ) -> bool {
        for constraint in self.constraints.iter().filter(|c| c.subject() == subject) {
            match constraint {
                Constraint::Type { kind, .. } => {
                    if record.kind != *kind {
                        return false;
                    }
                }
                Constraint::AttrEq { attr, value, .. } => {
                    if record.attrs.get(attr) != Some(value) {
                        return false;
                    }
                }
                Constraint::AttrEqVar { attr, other, .. } => {
                    let Some(value) = record.attrs.get(attr) else {
                        return false;
                    };
                    match bound.get(other) {
                        Some(existing) if existing != value => return false,
                        Some(_) => {}
                        None => {
                            bound.insert(other.clone(), value.clone());
                        }
                    }
                }
            }
        }
        true
    }

    fn kind_of(&self, var: &Var) -> Option<usize> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Type { var: v, kind } if v == var => Some(*kind),
            _ => None,
        })
    }
}

fn note(list: &mut Vec<Var>, var: &Var) {
    if !list.contains(var) {
        list.push(var.clone());
    }
}

fn resolve_attr<A: Attribute>(
    schema: &Schema<A>,
    key: &AttrKey,
) -> Result<A, QueryConstructionError> {
    A::from_ordinal(key.ordinal)
        .filter(|attr| attr.name() == key.name && schema.attr_type(*attr).is_some())
        .ok_or_else(|| QueryConstructionError::UnknownAttr {
            attr: key.name.to_string(),
        })
}

fn check_attr_fits<A: Attribute>(
    schema: &Schema<A>,
    kinds: &HashMap<Var, usize>,
    constraint: &Constraint<A>,
) -> Result<(), QueryConstructionError> {
    let (var, attr) = match constraint {
        Constraint::Type { .. } => return Ok(()),
        Constraint::AttrEqVar { var, attr, .. } | Constraint::AttrEq { var, attr, .. } => {
            (var, *attr)
        }
    };

    let subject_kind = kinds.get(var).copied();
    if let Some(kind) = subject_kind {
        let mapping = schema.mapping(kind);
        if mapping.field(attr).is_none() {
            return Err(QueryConstructionError::AttrNotOnKind {
                var: var.to_string(),
                kind: mapping.kind.to_string(),
                attr: attr.name().to_string(),
            });
        }
    }

    let Constraint::AttrEqVar { other, .. } = constraint else {
        return Ok(());
    };
    let Some(&other_kind) = kinds.get(other) else {
        return Ok(());
    };

    let other_type: TypeId = schema.mapping(other_kind).type_id;
    let fits = schema.attr_type(attr) == Some(ValueType::Entity)
        && schema
            .referenced_kinds(attr, subject_kind.map(|k| schema.mapping(k).type_id))
            .contains(&other_type);
    if !fits {
        return Err(QueryConstructionError::IncompatibleReference {
            var: var.to_string(),
            attr: attr.name().to_string(),
            other: other.to_string(),
            kind: schema.mapping(other_kind).kind.to_string(),
        });
    }
    Ok(())
}

/// One satisfying assignment of a query's variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bindings {
    values: BTreeMap<Var, Value>,
}

impl Bindings {
    pub fn get(&self, var: &Var) -> Option<&Value> {
        self.values.get(var)
    }

    /// The entity bound to `var`, if it is bound to an entity.
    pub fn entity(&self, var: &Var) -> Option<EntityId> {
        self.get(var).and_then(Value::as_entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Var, &Value)> {
        self.values.iter()
    }
}
