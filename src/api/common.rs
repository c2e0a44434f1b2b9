//! Shared request and response types

use serde::{Deserialize, Serialize};

use crate::models::ListParams;

/// `?page=` query. Kept as a string so junk input falls back to page one
/// instead of being rejected.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn params(&self) -> ListParams {
        ListParams::from_query(self.page.as_deref())
    }
}

/// Body of bulk admin actions
#[derive(Debug, Deserialize)]
pub struct IdsRequest {
    pub ids: Vec<i64>,
}

/// Body of single-record publish toggles
#[derive(Debug, Deserialize)]
pub struct PublishedRequest {
    pub is_published: bool,
}

/// Result of a bulk admin action
#[derive(Debug, Serialize, Deserialize)]
pub struct BulkResponse {
    pub count: usize,
    pub message: String,
}
