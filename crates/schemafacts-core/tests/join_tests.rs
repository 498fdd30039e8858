use std::collections::BTreeSet;

use anyhow::Result;
use proptest::prelude::*;
use schemafacts_core::{build_schema, join_target_element_node, must_query, query, Attr};
use schemafacts_elements::{self as el, Direction, Status};
use schemafacts_rel::{Bindings, Clause, Database, QueryConstructionError, Schema, Var};

fn vars() -> (Var, Var, Var) {
    (Var::new("element"), Var::new("target"), Var::new("node"))
}

fn node(element: impl Into<el::ElementProto>, direction: Direction, status: Status) -> el::Node {
    el::Node::new(el::Target::new(element, direction), status)
}

fn populated(schema: &Schema<Attr>) -> Result<Database<'_, Attr>> {
    let mut db = Database::new(schema);
    db.insert(node(
        el::Column::new(104, 2, "email"),
        Direction::Add,
        Status::Absent,
    ))?;
    db.insert(node(
        el::PrimaryIndex {
            table_id: 104,
            index_id: 1,
            index_name: "users_pkey".to_string(),
            unique: true,
            key_column_ids: vec![1],
            storing_column_ids: vec![2],
        },
        Direction::Drop,
        Status::Public,
    ))?;
    db.insert(node(el::Table { table_id: 104 }, Direction::Add, Status::Public))?;
    db.insert(node(
        el::Column::new(105, 1, "id"),
        Direction::Add,
        Status::Public,
    ))?;
    // A target with no node must not join.
    db.insert(el::Target::new(el::Column::new(104, 3, "orphan"), Direction::Add))?;
    Ok(db)
}

#[test]
fn join_is_exactly_four_clauses() {
    let (element, target, node) = vars();
    let clause = join_target_element_node(&element, &target, &node);
    let leaves = clause.leaves();
    assert_eq!(leaves.len(), 4);
    assert_eq!(leaves[0].subject(), Some(&target));
    assert_eq!(leaves[1].subject(), Some(&target));
    assert_eq!(leaves[2].subject(), Some(&node));
    assert_eq!(leaves[3].subject(), Some(&node));
    assert_eq!(
        leaves[0],
        &target.type_of::<el::Target>(),
        "first clause constrains the target's kind"
    );
    assert_eq!(leaves[1], &target.attr_eq_var(Attr::Element, &element));
    assert_eq!(leaves[2], &node.type_of::<el::Node>());
    assert_eq!(leaves[3], &node.attr_eq_var(Attr::Target, &target));
}

#[test]
fn join_relates_every_node_to_its_target_and_element() -> Result<()> {
    let schema = build_schema()?;
    let db = populated(&schema)?;
    let (element, target, node) = vars();

    let q = must_query(&schema, [join_target_element_node(&element, &target, &node)]);
    let results = q.evaluate(&db);
    assert_eq!(results.len(), 4);

    for row in &results {
        let node_id = row.entity(&node).ok_or_else(|| anyhow::anyhow!("node unbound"))?;
        let target_id = row.entity(&target).ok_or_else(|| anyhow::anyhow!("target unbound"))?;
        let element_id = row.entity(&element).ok_or_else(|| anyhow::anyhow!("element unbound"))?;

        let n = db
            .entity::<el::Node>(node_id)
            .ok_or_else(|| anyhow::anyhow!("{node_id} is not a node"))?;
        let t = db
            .entity::<el::Target>(target_id)
            .ok_or_else(|| anyhow::anyhow!("{target_id} is not a target"))?;
        assert_eq!(&n.target, t);
        // Column, PrimaryIndex and Table register under their variant names.
        assert_eq!(db.kind_of(element_id), Some(t.element.variant_name()));
    }
    Ok(())
}

#[test]
fn join_narrows_by_element_kind_and_attributes() -> Result<()> {
    let schema = build_schema()?;
    let db = populated(&schema)?;
    let (element, target, node) = vars();

    let columns = query(
        &schema,
        [
            join_target_element_node(&element, &target, &node),
            element.type_of::<el::Column>(),
            element.attr_eq(Attr::DescId, 104u32),
        ],
    )?;
    let results = columns.evaluate(&db);
    assert_eq!(results.len(), 1);
    let column_id = results[0]
        .entity(&element)
        .ok_or_else(|| anyhow::anyhow!("element unbound"))?;
    let column = db
        .entity::<el::Column>(column_id)
        .ok_or_else(|| anyhow::anyhow!("element is not a column"))?;
    assert_eq!(column.column.name, "email");

    let public_in_104 = query(
        &schema,
        [
            join_target_element_node(&element, &target, &node),
            element.attr_eq(Attr::DescId, 104u32),
            node.attr_eq(Attr::Status, Status::Public.number()),
        ],
    )?;
    assert_eq!(public_in_104.evaluate(&db).len(), 2);

    let dropping = query(
        &schema,
        [
            join_target_element_node(&element, &target, &node),
            target.attr_eq(Attr::Direction, Direction::Drop.number()),
        ],
    )?;
    let results = dropping.evaluate(&db);
    assert_eq!(results.len(), 1);
    let index_id = results[0]
        .entity(&element)
        .ok_or_else(|| anyhow::anyhow!("element unbound"))?;
    assert_eq!(db.kind_of(index_id), Some("PrimaryIndex"));
    Ok(())
}

#[test]
fn element_reused_as_target_is_rejected() -> Result<()> {
    let schema = build_schema()?;
    let (element, _, node) = vars();
    let err = query(&schema, [join_target_element_node(&element, &element, &node)]).unwrap_err();
    assert_eq!(
        err,
        QueryConstructionError::SelfReference {
            var: "$element".to_string(),
            attr: "Element".to_string(),
        }
    );
    Ok(())
}

#[test]
fn target_reused_as_node_is_rejected() -> Result<()> {
    let schema = build_schema()?;
    let (element, target, _) = vars();
    let err = query(&schema, [join_target_element_node(&element, &target, &target)]).unwrap_err();
    assert_eq!(
        err,
        QueryConstructionError::ConflictingKinds {
            var: "$target".to_string(),
            first: "Target".to_string(),
            second: "Node".to_string(),
        }
    );
    Ok(())
}

#[test]
fn element_reused_as_node_is_rejected() -> Result<()> {
    let schema = build_schema()?;
    let (_, target, node) = vars();
    let err = query(&schema, [join_target_element_node(&node, &target, &node)]).unwrap_err();
    assert!(matches!(
        err,
        QueryConstructionError::IncompatibleReference { ref kind, .. } if kind == "Node"
    ));
    Ok(())
}

#[test]
#[should_panic(expected = "invalid query")]
fn must_query_panics_on_a_malformed_query() {
    let schema = build_schema().expect("fact schema is well formed");
    let (element, target, _) = vars();
    must_query(&schema, [join_target_element_node(&element, &target, &target)]);
}

#[test]
fn attribute_not_on_the_node_kind_is_rejected() {
    let schema = build_schema().expect("fact schema is well formed");
    let (element, target, node) = vars();
    let err = query(
        &schema,
        [
            join_target_element_node(&element, &target, &node),
            node.attr_eq(Attr::Name, "users"),
        ],
    )
    .unwrap_err();
    assert!(matches!(err, QueryConstructionError::AttrNotOnKind { .. }));
}

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn schema_and_queries_can_be_shared_across_threads() {
    assert_send_sync::<Schema<Attr>>();
    assert_send_sync::<schemafacts_rel::Query<Attr>>();
    assert_send_sync::<Database<'static, Attr>>();
}

#[test]
fn concurrent_rule_threads_build_and_run_joins_against_one_schema() -> Result<()> {
    let schema = build_schema()?;
    let db = populated(&schema)?;

    let counts = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let (schema, db) = (&schema, &db);
                scope.spawn(move || {
                    let element = Var::new(format!("element{i}"));
                    let target = Var::new(format!("target{i}"));
                    let node = Var::new(format!("node{i}"));
                    let q = must_query(schema, [join_target_element_node(&element, &target, &node)]);
                    q.evaluate(db).len()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().map_err(|_| anyhow::anyhow!("join thread panicked")))
            .collect::<Result<Vec<usize>>>()
    })?;
    assert_eq!(counts, vec![4; 4]);
    Ok(())
}

fn shuffled_join(order: &[usize]) -> Vec<Clause> {
    let (element, target, node) = vars();
    let leaves: Vec<Clause> = join_target_element_node(&element, &target, &node)
        .leaves()
        .into_iter()
        .cloned()
        .chain([element.attr_eq(Attr::DescId, 104u32)])
        .collect();
    order.iter().map(|&i| leaves[i].clone()).collect()
}

fn result_set(schema: &Schema<Attr>, db: &Database<'_, Attr>, clauses: Vec<Clause>) -> BTreeSet<Bindings> {
    must_query(schema, clauses).evaluate(db).into_iter().collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 48,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn results_do_not_depend_on_clause_order(
        order in Just((0..5).collect::<Vec<usize>>()).prop_shuffle(),
    ) {
        let schema = build_schema().expect("fact schema is well formed");
        let db = populated(&schema).expect("populate database");

        let baseline = result_set(&schema, &db, shuffled_join(&[0, 1, 2, 3, 4]));
        let reordered = result_set(&schema, &db, shuffled_join(&order));
        prop_assert_eq!(baseline.len(), 3);
        prop_assert_eq!(reordered, baseline);
    }
}
