//! Element model for declarative schema changes.
//!
//! A schema change is described as a set of **targets**: each target names one
//! schema element (a column, an index, a foreign key, ...) and the direction
//! it should move in (added or dropped). A **node** pairs a target with the
//! element's current status. These are plain data; interpreting them as
//! queryable facts is the job of `schemafacts-core`.
//!
//! All types implement `Default`. The zero value of every kind is meaningful
//! to the fact schema, which probes it while validating field accessors.

pub mod element;
pub mod namespace;
pub mod node;
pub mod relation;
pub mod table;

pub use element::{ElementProto, ElementVariant};
pub use namespace::{Database, Schema, Sequence, Type};
pub use node::{Direction, Node, Status, Target};
pub use relation::{
    InboundForeignKey, OutboundForeignKey, RelationDependedOnBy, SequenceDependency,
    SequenceOwnedBy, TypeReference, View,
};
pub use table::{
    CheckConstraint, Column, ColumnDescriptor, DefaultExpression, Partitioning, PrimaryIndex,
    SecondaryIndex, Table, UniqueConstraint,
};

/// Descriptor identifier.
pub type DescId = u32;

/// Column identifier, unique within a table.
pub type ColumnId = u32;

/// Index identifier, unique within a table.
pub type IndexId = u32;
