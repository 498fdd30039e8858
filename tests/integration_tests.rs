//! Integration tests across the schemafacts crates
//!
//! These tests drive the full path:
//! - element model → schema registration → validation
//! - fact database → join clauses → query evaluation
//!
//! Run with: cargo test --test integration_tests

use std::collections::BTreeSet;

use anyhow::Result;
use schemafacts_core::{build_schema, join_target_element_node, must_query, Attr};
use schemafacts_elements::{self as el, Direction, ElementProto, Status};
use schemafacts_rel::{
    AttrType, Database, EntityId, EntityMapping, Schema, SchemaBuilder, Value, Var, Variant,
};

type Triple = (EntityId, EntityId, EntityId);

/// Node → Target → Element chaining where the only element kind is `Column`.
fn column_only_schema() -> Result<Schema<Attr>> {
    let schema = SchemaBuilder::new("columns")
        .attr_type(Attr::Element, AttrType::AnyEntity)
        .entity(
            EntityMapping::<Attr, el::Node>::of("Node")
                .attr(Attr::Status, "status", |n| n.status.number())
                .entity_attr(Attr::Target, "target", |n| &n.target),
        )
        .entity(
            EntityMapping::<Attr, el::Target>::of("Target")
                .attr(Attr::Direction, "direction", |t| t.direction.number())
                .one_of(
                    Attr::Element,
                    "element",
                    vec![Variant::of::<el::Column>("Column")],
                    &["Column"],
                    |t| t.element.variant(),
                ),
        )
        .entity(
            EntityMapping::<Attr, el::Column>::of("Column")
                .attr(Attr::DescId, "table_id", |c| c.table_id)
                .attr(Attr::Name, "column.name", |c| c.column.name.clone()),
        )
        .build()?;
    Ok(schema)
}

fn node(element: impl Into<ElementProto>, status: Status) -> el::Node {
    el::Node::new(el::Target::new(element, Direction::Add), status)
}

/// The (element, target, node) triple reachable from an inserted node.
fn chain(db: &Database<'_, Attr>, node: EntityId) -> Result<Triple> {
    let target = db
        .attr(node, Attr::Target)
        .and_then(Value::as_entity)
        .ok_or_else(|| anyhow::anyhow!("{node} has no target"))?;
    let element = db
        .attr(target, Attr::Element)
        .and_then(Value::as_entity)
        .ok_or_else(|| anyhow::anyhow!("{target} has no element"))?;
    Ok((element, target, node))
}

fn triples(db: &Database<'_, Attr>, clauses: Vec<schemafacts_rel::Clause>) -> Result<BTreeSet<Triple>> {
    let (element, target, node) = (Var::new("element"), Var::new("target"), Var::new("node"));
    must_query(db.schema(), clauses)
        .evaluate(db)
        .into_iter()
        .map(|row| -> Result<Triple> {
            let get = |var: &Var| {
                row.entity(var)
                    .ok_or_else(|| anyhow::anyhow!("{var} is unbound"))
            };
            Ok((get(&element)?, get(&target)?, get(&node)?))
        })
        .collect()
}

// ============================================================================
// Minimal schema
// ============================================================================

#[test]
fn test_column_only_schema_enumerates_fixture_triples() -> Result<()> {
    let schema = column_only_schema()?;
    let mut db = Database::new(&schema);

    let mut expected = BTreeSet::new();
    for (column_id, name, status) in [
        (1, "id", Status::Public),
        (2, "email", Status::Absent),
        (3, "created_at", Status::DeleteOnly),
    ] {
        let id = db.insert(node(el::Column::new(104, column_id, name), status))?;
        expected.insert(chain(&db, id)?);
    }
    // Targets and columns without a node do not form triples.
    db.insert(el::Target::new(el::Column::new(104, 9, "stray"), Direction::Drop))?;
    db.insert(el::Column::new(104, 10, "loose"))?;

    let (element, target, node_var) = (Var::new("element"), Var::new("target"), Var::new("node"));
    let found = triples(
        &db,
        vec![
            join_target_element_node(&element, &target, &node_var),
            element.type_of::<el::Column>(),
        ],
    )?;
    assert_eq!(found, expected);

    let names: BTreeSet<String> = found
        .iter()
        .filter_map(|(e, _, _)| db.entity::<el::Column>(*e))
        .map(|c| c.column.name.clone())
        .collect();
    assert_eq!(
        names,
        BTreeSet::from(["created_at".to_string(), "email".to_string(), "id".to_string()])
    );
    Ok(())
}

#[test]
fn test_column_only_schema_rejects_other_elements() -> Result<()> {
    let schema = column_only_schema()?;
    let mut db = Database::new(&schema);

    let err = db
        .insert(node(el::Table { table_id: 104 }, Status::Public))
        .unwrap_err();
    assert!(err.to_string().contains("Table"), "{err}");
    assert!(db.is_empty());
    Ok(())
}

#[test]
#[should_panic(expected = "columns: invalid query")]
fn test_must_query_panic_names_the_schema() {
    let schema = column_only_schema().expect("column schema is well formed");
    let (element, target) = (Var::new("element"), Var::new("target"));
    must_query(&schema, [join_target_element_node(&element, &target, &target)]);
}

// ============================================================================
// Full schema
// ============================================================================

#[test]
fn test_full_schema_joins_every_element_kind() -> Result<()> {
    let schema = build_schema()?;
    let mut db = Database::new(&schema);

    let elements: Vec<ElementProto> = vec![
        el::Column::new(104, 2, "email").into(),
        el::SecondaryIndex {
            table_id: 104,
            index_id: 2,
            index_name: "users_email_idx".to_string(),
            unique: true,
            key_column_ids: vec![2],
            storing_column_ids: Vec::new(),
        }
        .into(),
        el::SequenceDependency {
            table_id: 104,
            column_id: 1,
            sequence_id: 105,
        }
        .into(),
        el::TypeReference {
            desc_id: 104,
            type_id: 110,
        }
        .into(),
        el::OutboundForeignKey {
            origin_id: 104,
            origin_columns: vec![3],
            reference_id: 106,
            reference_columns: vec![1],
            name: "fk_org".to_string(),
        }
        .into(),
        el::SequenceOwnedBy {
            sequence_id: 105,
            owner_table_id: 104,
        }
        .into(),
        el::Database {
            database_id: 50,
            dependent_objects: vec![51],
        }
        .into(),
    ];

    let mut expected = BTreeSet::new();
    for element in elements {
        let id = db.insert(node(element, Status::Public))?;
        expected.insert(chain(&db, id)?);
    }

    let (element, target, node_var) = (Var::new("element"), Var::new("target"), Var::new("node"));
    let all = triples(&db, vec![join_target_element_node(&element, &target, &node_var)])?;
    assert_eq!(all, expected);

    // DescID 104 is carried by the column, index, type reference and foreign
    // key; the sequence dependency and owner are keyed by the sequence.
    let on_104 = triples(
        &db,
        vec![
            join_target_element_node(&element, &target, &node_var),
            element.attr_eq(Attr::DescId, 104u32),
        ],
    )?;
    assert_eq!(on_104.len(), 4);

    let referencing_104 = triples(
        &db,
        vec![
            join_target_element_node(&element, &target, &node_var),
            element.attr_eq(Attr::ReferencedDescId, 104u32),
        ],
    )?;
    let kinds: BTreeSet<&str> = referencing_104
        .iter()
        .filter_map(|(e, _, _)| db.kind_of(*e))
        .collect();
    assert_eq!(
        kinds,
        BTreeSet::from(["SequenceDependency", "SequenceOwnedBy"])
    );
    Ok(())
}

#[test]
fn test_schema_description_is_stable_json() -> Result<()> {
    let schema = build_schema()?;
    let json = serde_json::to_string(&schema.describe())?;
    let again = serde_json::to_string(&build_schema()?.describe())?;
    assert_eq!(json, again);
    assert!(json.contains("\"TypeRef\""));
    Ok(())
}
