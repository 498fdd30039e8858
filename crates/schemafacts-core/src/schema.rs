//! Entity mappings from the element model onto [`Attr`].
//!
//! Nodes point at targets, targets point at exactly one element; every element
//! kind exposes the identity attributes (`DescID`, `ColumnID`, `IndexID`,
//! `Name`, `ReferencedDescID`) that it has.

use schemafacts_elements as el;
use schemafacts_rel::{
    AttrType, EntityMapping, Schema, SchemaBuilder, SchemaDefinitionError, Variant,
};

use crate::attr::Attr::{self, *};

/// Name of the fact schema.
pub const SCHEMA_NAME: &str = "schemafacts";

/// Alternatives of `Target.element`, one per `ElementProto` variant.
pub const ELEMENT_ALTERNATIVES: &[&str] = &[
    "Column",
    "PrimaryIndex",
    "SecondaryIndex",
    "SequenceDependency",
    "UniqueConstraint",
    "CheckConstraint",
    "Sequence",
    "DefaultExpression",
    "View",
    "TypeRef",
    "Table",
    "OutForeignKey",
    "InForeignKey",
    "RelationDependedOnBy",
    "SequenceOwner",
    "Type",
    "Schema",
    "Database",
];

fn entity<T: Default + 'static>(kind: &'static str) -> EntityMapping<Attr, T> {
    EntityMapping::of(kind)
}

fn element_variants() -> Vec<Variant> {
    el::ElementProto::variants()
        .into_iter()
        .map(|v| Variant::new(v.name, v.type_id, v.type_name))
        .collect()
}

/// Validate and freeze the fact schema.
///
/// Call once at startup and pass the result by reference; an error means the
/// registrations below are inconsistent and the process should not continue.
pub fn build_schema() -> Result<Schema<Attr>, SchemaDefinitionError> {
    schema_builder().build()
}

/// All registrations, unvalidated.
pub fn schema_builder() -> SchemaBuilder<Attr> {
    SchemaBuilder::new(SCHEMA_NAME)
        .attr_type(Element, AttrType::AnyEntity)
        .entity(
            entity::<el::Node>("Node")
                .attr(Status, "status", |n| n.status.number())
                .entity_attr(Target, "target", |n| &n.target),
        )
        .entity(
            entity::<el::Target>("Target")
                .attr(Direction, "direction", |t| t.direction.number())
                .one_of(
                    Element,
                    "element",
                    element_variants(),
                    ELEMENT_ALTERNATIVES,
                    |t| t.element.variant(),
                ),
        )
        .entity(
            entity::<el::Column>("Column")
                .attr(DescId, "table_id", |c| c.table_id)
                .attr(ColumnId, "column.id", |c| c.column.id)
                .attr(Name, "column.name", |c| c.column.name.clone()),
        )
        .entity(
            entity::<el::PrimaryIndex>("PrimaryIndex")
                .attr(DescId, "table_id", |i| i.table_id)
                .attr(IndexId, "index_id", |i| i.index_id)
                .attr(Name, "index_name", |i| i.index_name.clone()),
        )
        .entity(
            entity::<el::SecondaryIndex>("SecondaryIndex")
                .attr(DescId, "table_id", |i| i.table_id)
                .attr(IndexId, "index_id", |i| i.index_id)
                .attr(Name, "index_name", |i| i.index_name.clone()),
        )
        .entity(
            entity::<el::SequenceDependency>("SequenceDependency")
                .attr(DescId, "sequence_id", |d| d.sequence_id)
                .attr(ReferencedDescId, "table_id", |d| d.table_id)
                .attr(ColumnId, "column_id", |d| d.column_id),
        )
        .entity(
            entity::<el::UniqueConstraint>("UniqueConstraint")
                .attr(DescId, "table_id", |c| c.table_id)
                .attr(IndexId, "index_id", |c| c.index_id),
        )
        .entity(
            entity::<el::CheckConstraint>("CheckConstraint")
                .attr(DescId, "table_id", |c| c.table_id)
                .attr(Name, "name", |c| c.name.clone()),
        )
        .entity(entity::<el::Sequence>("Sequence").attr(DescId, "sequence_id", |s| s.sequence_id))
        .entity(
            entity::<el::DefaultExpression>("DefaultExpression")
                .attr(DescId, "table_id", |d| d.table_id)
                .attr(ColumnId, "column_id", |d| d.column_id),
        )
        .entity(entity::<el::View>("View").attr(DescId, "table_id", |v| v.table_id))
        .entity(
            entity::<el::TypeReference>("TypeReference")
                .attr(DescId, "desc_id", |r| r.desc_id)
                .attr(ReferencedDescId, "type_id", |r| r.type_id),
        )
        .entity(entity::<el::Table>("Table").attr(DescId, "table_id", |t| t.table_id))
        .entity(
            entity::<el::InboundForeignKey>("InboundForeignKey")
                .attr(DescId, "origin_id", |fk| fk.origin_id)
                .attr(ReferencedDescId, "reference_id", |fk| fk.reference_id)
                .attr(Name, "name", |fk| fk.name.clone()),
        )
        .entity(
            entity::<el::OutboundForeignKey>("OutboundForeignKey")
                .attr(DescId, "origin_id", |fk| fk.origin_id)
                .attr(ReferencedDescId, "reference_id", |fk| fk.reference_id)
                .attr(Name, "name", |fk| fk.name.clone()),
        )
        .entity(
            entity::<el::RelationDependedOnBy>("RelationDependedOnBy")
                .attr(DescId, "table_id", |r| r.table_id)
                .attr(ReferencedDescId, "depended_on_by", |r| r.depended_on_by),
        )
        .entity(
            entity::<el::SequenceOwnedBy>("SequenceOwnedBy")
                .attr(DescId, "sequence_id", |s| s.sequence_id)
                .attr(ReferencedDescId, "owner_table_id", |s| s.owner_table_id),
        )
        .entity(entity::<el::Type>("Type").attr(DescId, "type_id", |t| t.type_id))
        .entity(entity::<el::Schema>("Schema").attr(DescId, "schema_id", |s| s.schema_id))
        .entity(entity::<el::Database>("Database").attr(DescId, "database_id", |d| d.database_id))
        .entity(
            entity::<el::Partitioning>("Partitioning")
                .attr(DescId, "table_id", |p| p.table_id)
                .attr(IndexId, "index_id", |p| p.index_id),
        )
}
