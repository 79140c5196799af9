//! Offset pagination and collection envelopes
//!
//! Collection queries answer with `{ data: [...], meta: { pagination } }`
//! under the collection field. [`unwrap_collection`] decodes that shape into a
//! [`ListResult`], treating a null or missing collection as an empty page.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::services::client::ClientError;

/// Page metadata returned by the backend
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationEnvelope {
    pub page: u32,
    pub page_size: u32,
    pub page_count: u32,
    pub total: u64,
}

impl PaginationEnvelope {
    /// Build the metadata of `page` for `total` matching rows
    pub fn compute(page: u32, page_size: u32, total: u64) -> Self {
        let page_size = page_size.max(1);
        let page_count = total.div_ceil(u64::from(page_size));
        Self {
            page: page.max(1),
            page_size,
            page_count: u32::try_from(page_count).unwrap_or(u32::MAX),
            total,
        }
    }

    /// Index of the first row on this page
    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.page_size as usize
    }

    pub fn has_next_page(&self) -> bool {
        self.page < self.page_count
    }
}

/// One page of decoded items
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    /// Absent when the backend returned no collection at all
    pub pagination: Option<PaginationEnvelope>,
}

impl<T> ListResult<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            pagination: None,
        }
    }

    pub fn total(&self) -> u64 {
        self.pagination.map_or(0, |p| p.total)
    }
}

impl<T> Default for ListResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// `meta` object of a collection
#[derive(Deserialize, Debug, Clone, Default)]
pub struct CollectionMeta {
    #[serde(default)]
    pub pagination: Option<PaginationEnvelope>,
}

/// Shape of `data.<plural>` in a collection response
#[derive(Deserialize, Debug, Clone)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct EntityCollection<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: Option<CollectionMeta>,
}

impl<T> From<EntityCollection<T>> for ListResult<T> {
    fn from(collection: EntityCollection<T>) -> Self {
        Self {
            items: collection.data,
            pagination: collection.meta.and_then(|m| m.pagination),
        }
    }
}

/// Decode `body.data.<plural>` into a page of items.
///
/// A null or missing `data` or collection yields an empty page without
/// pagination. A collection of the wrong shape is an envelope error.
pub fn unwrap_collection<T: DeserializeOwned>(
    body: &JsonValue,
    plural: &str,
) -> Result<ListResult<T>, ClientError> {
    let collection = match body.get("data").and_then(|data| data.get(plural)) {
        None | Some(JsonValue::Null) => return Ok(ListResult::empty()),
        Some(collection) => collection,
    };

    serde_json::from_value::<EntityCollection<T>>(collection.clone())
        .map(ListResult::from)
        .map_err(|e| ClientError::Envelope {
            entity: plural.to_string(),
            message: e.to_string(),
        })
}
