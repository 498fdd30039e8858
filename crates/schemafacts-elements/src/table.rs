//! Elements that live inside a table descriptor.

use serde::{Deserialize, Serialize};

use crate::{ColumnId, DescId, IndexId};

/// A table descriptor as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Table {
    pub table_id: DescId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub id: ColumnId,
    pub name: String,
    pub type_name: String,
    pub nullable: bool,
    pub hidden: bool,
}

/// A column of `table_id`, carrying its full descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub table_id: DescId,
    pub family_id: u32,
    pub family_name: String,
    pub column: ColumnDescriptor,
}

impl Column {
    pub fn new(table_id: DescId, id: ColumnId, name: impl Into<String>) -> Self {
        Self {
            table_id,
            column: ColumnDescriptor {
                id,
                name: name.into(),
                ..ColumnDescriptor::default()
            },
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrimaryIndex {
    pub table_id: DescId,
    pub index_id: IndexId,
    pub index_name: String,
    pub unique: bool,
    pub key_column_ids: Vec<ColumnId>,
    pub storing_column_ids: Vec<ColumnId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecondaryIndex {
    pub table_id: DescId,
    pub index_id: IndexId,
    pub index_name: String,
    pub unique: bool,
    pub key_column_ids: Vec<ColumnId>,
    pub storing_column_ids: Vec<ColumnId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueConstraint {
    pub table_id: DescId,
    pub index_id: IndexId,
    pub column_ids: Vec<ColumnId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckConstraint {
    pub table_id: DescId,
    pub name: String,
    pub expr: String,
    pub column_ids: Vec<ColumnId>,
    pub validated: bool,
}

/// The default expression of one column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefaultExpression {
    pub table_id: DescId,
    pub column_id: ColumnId,
    pub uses_sequence_ids: Vec<DescId>,
    pub default_expr: String,
}

/// Partitioning of one index. Not a target element on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Partitioning {
    pub table_id: DescId,
    pub index_id: IndexId,
    pub num_columns: u32,
}
