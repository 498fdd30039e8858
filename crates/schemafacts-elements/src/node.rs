//! Targets, nodes, and their enumerations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ElementProto;

/// Which way a target moves its element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum Direction {
    #[default]
    Unknown = 0,
    Add = 1,
    Drop = 2,
}

impl Direction {
    /// Wire number of the direction.
    pub fn number(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Unknown => "UNKNOWN",
            Direction::Add => "ADD",
            Direction::Drop => "DROP",
        })
    }
}

/// Lifecycle status of an element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum Status {
    #[default]
    Unknown = 0,
    Absent = 1,
    DeleteOnly = 2,
    DeleteAndWriteOnly = 3,
    Backfilled = 4,
    Validated = 5,
    Public = 6,
}

impl Status {
    /// Wire number of the status.
    pub fn number(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Unknown => "UNKNOWN",
            Status::Absent => "ABSENT",
            Status::DeleteOnly => "DELETE_ONLY",
            Status::DeleteAndWriteOnly => "DELETE_AND_WRITE_ONLY",
            Status::Backfilled => "BACKFILLED",
            Status::Validated => "VALIDATED",
            Status::Public => "PUBLIC",
        })
    }
}

/// An element together with the direction it should move in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub element: ElementProto,
    pub direction: Direction,
}

impl Target {
    pub fn new(element: impl Into<ElementProto>, direction: Direction) -> Self {
        Self {
            element: element.into(),
            direction,
        }
    }
}

/// A target at its current status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    pub target: Target,
    pub status: Status,
}

impl Node {
    pub fn new(target: Target, status: Status) -> Self {
        Self { target, status }
    }
}
