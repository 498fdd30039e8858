//! The attribute vocabulary used to identify, order and relate nodes, targets
//! and elements.

use std::fmt;

use schemafacts_rel::Attribute;
use serde::{Deserialize, Serialize};

/// Attributes of the fact schema.
///
/// Ordinals are part of the schema's identity: never renumber or reuse one.
/// Ordinal 0 belongs to the engine's entity-kind attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum Attr {
    /// Descriptor the element belongs to.
    DescId = 1,
    /// Descriptor the element refers to.
    ReferencedDescId = 2,
    /// Column the element corresponds to.
    ColumnId = 3,
    /// Name of the element.
    Name = 4,
    /// Index the element corresponds to.
    IndexId = 5,
    /// Direction of a target.
    Direction = 6,
    /// Status of a node.
    Status = 7,
    /// Element a target refers to.
    Element = 8,
    /// Target a node refers to.
    Target = 9,
}

impl Attribute for Attr {
    const ALL: &'static [Self] = &[
        Attr::DescId,
        Attr::ReferencedDescId,
        Attr::ColumnId,
        Attr::Name,
        Attr::IndexId,
        Attr::Direction,
        Attr::Status,
        Attr::Element,
        Attr::Target,
    ];

    fn ordinal(self) -> u16 {
        self as u16
    }

    fn name(self) -> &'static str {
        match self {
            Attr::DescId => "DescID",
            Attr::ReferencedDescId => "ReferencedDescID",
            Attr::ColumnId => "ColumnID",
            Attr::Name => "Name",
            Attr::IndexId => "IndexID",
            Attr::Direction => "Direction",
            Attr::Status => "Status",
            Attr::Element => "Element",
            Attr::Target => "Target",
        }
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
