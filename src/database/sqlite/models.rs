use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// A product row. `payload` is the upstream catalog object serialized as
/// JSON text; the vector for `embedding_text` lives in the vector store
/// under the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub payload: String,
    pub embedding_text: String,
    pub created_date: NaiveDateTime,
    pub updated_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub id: i64,
    pub name: String,
    pub payload: String,
    pub embedding_text: String,
}

/// A skin condition profile row. The description doubles as the
/// embedding text for the skin-conditions collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SkinCondition {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_date: NaiveDateTime,
    pub updated_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSkinCondition {
    pub name: String,
    pub description: String,
}

impl Product {
    /// Parse the stored payload back into structured form.
    #[inline]
    pub fn payload_value(&self) -> Option<Value> {
        serde_json::from_str(&self.payload).ok()
    }
}
