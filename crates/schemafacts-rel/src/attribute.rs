//! Attribute vocabulary and the value model.

use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::database::EntityId;

/// Ordinal owned by the engine for the "entity kind" pseudo-attribute.
///
/// Type clauses (`Var::type_of`) constrain this dimension; no user attribute
/// may claim it.
pub const TYPE_ATTR_ORDINAL: u16 = 0;

/// A closed vocabulary of attributes.
///
/// Implementors are expected to be fieldless enums. Ordinals must be unique,
/// non-zero and stable for the lifetime of a schema; names are used for
/// diagnostics only. Both properties are checked by `SchemaBuilder::build`.
pub trait Attribute: Copy + Eq + Ord + Hash + fmt::Debug + Send + Sync + 'static {
    /// Every attribute of the vocabulary.
    const ALL: &'static [Self];

    fn ordinal(self) -> u16;

    fn name(self) -> &'static str;

    fn key(self) -> AttrKey {
        AttrKey {
            ordinal: self.ordinal(),
            name: self.name(),
        }
    }

    fn from_ordinal(ordinal: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.ordinal() == ordinal)
    }
}

/// Vocabulary-erased reference to an attribute, carried by clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttrKey {
    pub ordinal: u16,
    pub name: &'static str,
}

impl fmt::Display for AttrKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Runtime type of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Int,
    Str,
    Entity,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Int => f.write_str("int"),
            ValueType::Str => f.write_str("string"),
            ValueType::Entity => f.write_str("entity"),
        }
    }
}

/// Declared value type of an attribute (`SchemaBuilder::attr_type`).
///
/// Declarations are only required for attributes mapped through a one-of
/// accessor, whose payload can be any registered kind. Other attributes infer
/// their type from their accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrType {
    Int,
    Str,
    /// A reference to an entity of any registered kind.
    AnyEntity,
}

impl AttrType {
    pub fn value_type(self) -> ValueType {
        match self {
            AttrType::Int => ValueType::Int,
            AttrType::Str => ValueType::Str,
            AttrType::AnyEntity => ValueType::Entity,
        }
    }
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Int(i64),
    Str(String),
    Entity(EntityId),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Int(_) => ValueType::Int,
            Value::Str(_) => ValueType::Str,
            Value::Entity(_) => ValueType::Entity,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            Value::Entity(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v:?}"),
            Value::Entity(id) => write!(f, "{id}"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Str(value.clone())
    }
}

impl From<EntityId> for Value {
    fn from(value: EntityId) -> Self {
        Value::Entity(value)
    }
}
