//! Query construction over the fact schema, plus reusable join clauses.

use schemafacts_elements as el;
use schemafacts_rel::{and, Clause, Query, QueryConstructionError, Schema, Var};

use crate::attr::Attr;

/// Type-check `clauses` against `schema`.
pub fn query(
    schema: &Schema<Attr>,
    clauses: impl IntoIterator<Item = Clause>,
) -> Result<Query<Attr>, QueryConstructionError> {
    Query::new(schema, clauses).inspect_err(|err| {
        tracing::error!(schema = %schema.name(), error = %err, "query rejected");
    })
}

/// Like [`query`], for clauses written next to the code that uses them.
///
/// # Panics
///
/// Panics if the clauses do not fit the schema. A malformed query here is a
/// bug in the rule definitions, not an input error.
pub fn must_query(schema: &Schema<Attr>, clauses: impl IntoIterator<Item = Clause>) -> Query<Attr> {
    match query(schema, clauses) {
        Ok(q) => q,
        Err(err) => panic!("{}: invalid query: {err}", schema.name()),
    }
}

/// Relates a node, its target and the target's element.
///
/// Expands to, in order: `target` is a `Target`; `target.Element = element`;
/// `node` is a `Node`; `node.Target = target`. The three variables must be
/// distinct, which query construction enforces.
pub fn join_target_element_node(element: &Var, target: &Var, node: &Var) -> Clause {
    and([
        target.type_of::<el::Target>(),
        target.attr_eq_var(Attr::Element, element),
        node.type_of::<el::Node>(),
        node.attr_eq_var(Attr::Target, target),
    ])
}
