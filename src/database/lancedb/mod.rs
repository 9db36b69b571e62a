// LanceDB vector database module
// Handles vector storage and cosine similarity search per collection

pub mod vector_store;

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named, independently searchable partition of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Products,
    SkinConditions,
}

impl Collection {
    /// All known collections, in fan-out order.
    pub const ALL: [Collection; 2] = [Collection::Products, Collection::SkinConditions];

    #[inline]
    pub fn table_name(self) -> &'static str {
        match self {
            Collection::Products => "products",
            Collection::SkinConditions => "skin_conditions",
        }
    }
}

impl fmt::Display for Collection {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Embedding record stored in LanceDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Item id, stringified, unique within its collection
    pub id: String,
    /// The embedding of the item's current embedding text
    pub vector: Vec<f32>,
    /// Metadata stored alongside the vector for result formatting
    pub metadata: ItemMetadata,
}

/// Metadata for an item stored alongside its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemMetadata {
    /// Numeric item id matching the SQLite row
    pub item_id: i64,
    /// Display label
    pub name: String,
    /// Item payload serialized as JSON text
    pub payload: String,
    /// Timestamp when this embedding was created
    pub created_at: String,
}
