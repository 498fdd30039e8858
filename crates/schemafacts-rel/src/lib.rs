//! schemafacts-rel: a small in-memory relational fact engine.
//!
//! Concrete Rust values ("entities") are interpreted as sets of facts of the
//! form `(entity, attribute, value)`. How to read those facts off each entity
//! kind is declared once, up front, in a [`Schema`]:
//!
//! - an [`Attribute`] vocabulary (a closed enum owned by the caller),
//! - one [`EntityMapping`] per concrete kind, pairing attributes with typed
//!   accessors (no reflection; accessors are probed against the kind's
//!   `Default` value while the schema is validated),
//! - optional [`AttrType`] declarations for attributes whose value is a
//!   reference to "any registered entity".
//!
//! Queries are conjunctions of [`Clause`]s over named [`Var`]s. A [`Query`] is
//! type-checked against the schema when it is constructed and evaluated
//! against a [`Database`] of inserted entities.
//!
//! ## Module Organization
//!
//! - `attribute`: the attribute trait, value model, declared attribute types
//! - `schema`: entity mappings, schema builder and validation
//! - `clause`: variables and clause constructors
//! - `query`: query type-checking and evaluation
//! - `database`: the in-memory fact store

pub mod attribute;
pub mod clause;
pub mod database;
pub mod query;
pub mod schema;

pub use attribute::{AttrKey, AttrType, Attribute, Value, ValueType, TYPE_ATTR_ORDINAL};
pub use clause::{and, Clause, Var};
pub use database::{Database, EntityId, InsertError};
pub use query::{Bindings, Query, QueryConstructionError};
pub use schema::{
    AttrDescription, EntityMapping, FieldDescription, KindDescription, Schema, SchemaBuilder,
    SchemaDefinitionError, SchemaDescription, Variant,
};
