//! Query variables and clause constructors.

use std::any::{type_name, Any, TypeId};
use std::borrow::Cow;
use std::fmt;

use crate::attribute::{AttrKey, Attribute, Value};

/// A named logical variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(Cow<'static, str>);

impl Var {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// `self` is an entity of kind `K`.
    pub fn type_of<K: Any>(&self) -> Clause {
        Clause::Type {
            var: self.clone(),
            kind: TypeId::of::<K>(),
            kind_name: type_name::<K>(),
        }
    }

    /// `self.attr == other`.
    pub fn attr_eq_var<A: Attribute>(&self, attr: A, other: &Var) -> Clause {
        Clause::AttrEqVar {
            var: self.clone(),
            attr: attr.key(),
            other: other.clone(),
        }
    }

    /// `self.attr == value`.
    pub fn attr_eq<A: Attribute>(&self, attr: A, value: impl Into<Value>) -> Clause {
        Clause::AttrEq {
            var: self.clone(),
            attr: attr.key(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

impl From<&'static str> for Var {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

/// A single constraint, or a conjunction of constraints.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Type {
        var: Var,
        kind: TypeId,
        kind_name: &'static str,
    },
    AttrEqVar {
        var: Var,
        attr: AttrKey,
        other: Var,
    },
    AttrEq {
        var: Var,
        attr: AttrKey,
        value: Value,
    },
    And(Vec<Clause>),
}

impl Clause {
    /// The non-conjunction clauses, depth first, in order.
    pub fn leaves(&self) -> Vec<&Clause> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Clause>) {
        match self {
            Clause::And(parts) => {
                for part in parts {
                    part.collect_leaves(out);
                }
            }
            leaf => out.push(leaf),
        }
    }

    /// The variable this clause constrains (`None` for conjunctions).
    pub fn subject(&self) -> Option<&Var> {
        match self {
            Clause::Type { var, .. } | Clause::AttrEqVar { var, .. } | Clause::AttrEq { var, .. } => {
                Some(var)
            }
            Clause::And(_) => None,
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Type { var, kind_name, .. } => write!(f, "{var} :: {kind_name}"),
            Clause::AttrEqVar { var, attr, other } => write!(f, "{var}.{attr} = {other}"),
            Clause::AttrEq { var, attr, value } => write!(f, "{var}.{attr} = {value}"),
            Clause::And(parts) => {
                f.write_str("and(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{part}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Conjunction of `clauses`.
pub fn and(clauses: impl IntoIterator<Item = Clause>) -> Clause {
    Clause::And(clauses.into_iter().collect())
}
