use serde::{Deserialize, Serialize};

use crate::DescId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sequence {
    pub sequence_id: DescId,
}

/// A user-defined type descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Type {
    pub type_id: DescId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Schema {
    pub schema_id: DescId,
    pub dependent_objects: Vec<DescId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Database {
    pub database_id: DescId,
    pub dependent_objects: Vec<DescId>,
}
