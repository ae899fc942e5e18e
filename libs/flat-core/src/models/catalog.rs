//! Product categories and products

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Node of the product category tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCategory {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub sort_order: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductCategory {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, parent_id: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            parent_id: parent_id.map(str::to_string),
            sort_order: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

define_patch! {
    /// Partial update for [`ProductCategory`]
    pub struct ProductCategoryPatch for ProductCategory {
        name: String,
        parent_id: Option<String>,
        sort_order: u32,
        is_active: bool,
    }
}

/// Product in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category_id: String,
    pub code: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, category_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            category_id: category_id.into(),
            code: None,
            description: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

define_patch! {
    /// Partial update for [`Product`]
    pub struct ProductPatch for Product {
        name: String,
        category_id: String,
        code: Option<String>,
        description: Option<String>,
        is_active: bool,
    }
}
