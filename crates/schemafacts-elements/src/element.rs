//! `ElementProto`: the closed set of elements a target can refer to.
//!
//! Exactly one element is carried per target. Variant names are the stable
//! names used when the element is referred to generically (they differ from
//! the payload type name in a few places, e.g. `TypeRef` carries a
//! `TypeReference`). Adding an element kind means adding a variant here.

use std::any::{type_name, Any, TypeId};

use serde::{Deserialize, Serialize};

use crate::{
    CheckConstraint, Column, Database, DefaultExpression, InboundForeignKey, OutboundForeignKey,
    PrimaryIndex, RelationDependedOnBy, Schema, SecondaryIndex, Sequence, SequenceDependency,
    SequenceOwnedBy, Table, Type, TypeReference, UniqueConstraint, View,
};

/// Name and payload type of one `ElementProto` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementVariant {
    pub name: &'static str,
    pub type_id: TypeId,
    pub type_name: &'static str,
}

macro_rules! element_proto {
    ($($variant:ident($ty:ty)),+ $(,)?) => {
        /// One schema element.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum ElementProto {
            $($variant($ty)),+
        }

        impl ElementProto {
            /// Variant names, in declaration order.
            pub const VARIANT_NAMES: &'static [&'static str] = &[$(stringify!($variant)),+];

            /// Variant table: name plus payload type.
            pub fn variants() -> Vec<ElementVariant> {
                vec![$(ElementVariant {
                    name: stringify!($variant),
                    type_id: TypeId::of::<$ty>(),
                    type_name: type_name::<$ty>(),
                }),+]
            }

            pub fn variant_name(&self) -> &'static str {
                match self {
                    $(ElementProto::$variant(_) => stringify!($variant)),+
                }
            }

            /// The populated payload, type-erased.
            pub fn payload(&self) -> &dyn Any {
                match self {
                    $(ElementProto::$variant(e) => e as &dyn Any),+
                }
            }

            /// `(variant name, payload)` of the populated variant.
            pub fn variant(&self) -> (&'static str, &dyn Any) {
                (self.variant_name(), self.payload())
            }
        }

        $(
            impl From<$ty> for ElementProto {
                fn from(element: $ty) -> Self {
                    ElementProto::$variant(element)
                }
            }
        )+
    };
}

element_proto! {
    Column(Column),
    PrimaryIndex(PrimaryIndex),
    SecondaryIndex(SecondaryIndex),
    SequenceDependency(SequenceDependency),
    UniqueConstraint(UniqueConstraint),
    CheckConstraint(CheckConstraint),
    Sequence(Sequence),
    DefaultExpression(DefaultExpression),
    View(View),
    TypeRef(TypeReference),
    Table(Table),
    OutForeignKey(OutboundForeignKey),
    InForeignKey(InboundForeignKey),
    RelationDependedOnBy(RelationDependedOnBy),
    SequenceOwner(SequenceOwnedBy),
    Type(Type),
    Schema(Schema),
    Database(Database),
}

impl Default for ElementProto {
    fn default() -> Self {
        ElementProto::Column(Column::default())
    }
}
