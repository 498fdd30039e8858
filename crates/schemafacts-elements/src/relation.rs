//! Elements that link one descriptor to another.

use serde::{Deserialize, Serialize};

use crate::{ColumnId, DescId};

/// A column of `table_id` whose default uses sequence `sequence_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceDependency {
    pub table_id: DescId,
    pub column_id: ColumnId,
    pub sequence_id: DescId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct View {
    pub table_id: DescId,
    pub depends_on: Vec<DescId>,
    pub depended_on_by: Vec<DescId>,
}

/// Use of user-defined type `type_id` by descriptor `desc_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeReference {
    pub desc_id: DescId,
    pub type_id: DescId,
}

/// A foreign key as seen from the referenced table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InboundForeignKey {
    pub origin_id: DescId,
    pub origin_columns: Vec<ColumnId>,
    pub reference_id: DescId,
    pub reference_columns: Vec<ColumnId>,
    pub name: String,
}

/// A foreign key as seen from the referencing table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutboundForeignKey {
    pub origin_id: DescId,
    pub origin_columns: Vec<ColumnId>,
    pub reference_id: DescId,
    pub reference_columns: Vec<ColumnId>,
    pub name: String,
}

/// Relation `table_id` is depended on by `depended_on_by` (e.g. a view).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationDependedOnBy {
    pub table_id: DescId,
    pub depended_on_by: DescId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceOwnedBy {
    pub sequence_id: DescId,
    pub owner_table_id: DescId,
}
