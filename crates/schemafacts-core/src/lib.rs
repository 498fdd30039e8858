//! schemafacts-core: schema-change elements as queryable facts.
//!
//! Builds on `schemafacts-rel`: this crate owns the attribute vocabulary
//! ([`Attr`]), registers every element kind from `schemafacts-elements` with
//! its identity attributes, and provides the join clauses that rule
//! definitions share.
//!
//! ```no_run
//! use schemafacts_core::{build_schema, join_target_element_node, must_query};
//! use schemafacts_rel::Var;
//!
//! let schema = build_schema().expect("fact schema");
//! let (element, target, node) = (Var::new("element"), Var::new("target"), Var::new("node"));
//! let q = must_query(&schema, [join_target_element_node(&element, &target, &node)]);
//! assert_eq!(q.len(), 4);
//! ```
//!
//! The schema is built once and passed around by reference; there is no
//! process-wide instance.

pub mod attr;
pub mod query;
pub mod schema;

pub use attr::Attr;
pub use query::{join_target_element_node, must_query, query};
pub use schema::{build_schema, schema_builder, ELEMENT_ALTERNATIVES, SCHEMA_NAME};
