//! Page clamping for listings

use std::future::Future;

use anyhow::Result;

use crate::models::{ListParams, PagedResult};

/// Run a paged query. A page past the end is re-run as the last page, so
/// `?page=999` shows the final page instead of an empty one.
pub(crate) async fn fetch_clamped<T, F, Fut>(params: ListParams, mut fetch: F) -> Result<PagedResult<T>>
where
    F: FnMut(ListParams) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, i64)>>,
{
    let (items, total) = fetch(params).await?;
    let last = params.last_page(total);
    if params.page <= last {
        return Ok(PagedResult::new(items, total, &params));
    }

    let clamped = params.with_page(last);
    let (items, total) = fetch(clamped).await?;
    Ok(PagedResult::new(items, total, &clamped))
}
