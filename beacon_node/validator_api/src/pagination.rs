//! Numeric-token pagination shared by every list endpoint.

use crate::RpcError;
use serde::{Deserialize, Serialize};
use types::ChainSpec;

/// Pagination parameters as they arrive from the caller.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// `None` or `0` selects the default page size.
    pub page_size: Option<usize>,
    /// A decimal page number; `None` or empty means the first page.
    pub page_token: Option<String>,
}

impl PageRequest {
    pub fn new(page_size: usize, page_token: &str) -> Self {
        Self {
            page_size: Some(page_size),
            page_token: Some(page_token.to_string()),
        }
    }

    pub fn first_page(page_size: usize) -> Self {
        Self {
            page_size: Some(page_size),
            page_token: None,
        }
    }
}

/// One page plus the bookkeeping the caller echoes back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    /// The unpaginated count under the active filter.
    pub total_size: usize,
    /// The token for the page after this one; empty on an empty result set.
    pub next_page_token: String,
}

/// Slices `items` according to `request`.
///
/// The page token is the page *number*: page `t` covers
/// `[t * size, (t + 1) * size)`. A start at or beyond the total is
/// `OUT_OF_RANGE`; an empty result set is served as an empty first page.
pub fn paginate<T: Clone>(
    items: &[T],
    request: &PageRequest,
    spec: &ChainSpec,
) -> Result<Paginated<T>, RpcError> {
    let page_size = match request.page_size {
        None | Some(0) => spec.default_page_size,
        Some(size) if size > spec.max_page_size => {
            return Err(RpcError::invalid_argument(format!(
                "page size {size} exceeds the maximum of {}",
                spec.max_page_size
            )));
        }
        Some(size) => size,
    };

    let token: usize = match request.page_token.as_deref() {
        None | Some("") => 0,
        Some(raw) => raw.parse().map_err(|_| {
            RpcError::invalid_argument(format!("page token {raw:?} is not a number"))
        })?,
    };

    let total_size = items.len();
    if total_size == 0 {
        return Ok(Paginated {
            items: vec![],
            total_size,
            next_page_token: String::new(),
        });
    }

    let start = token
        .checked_mul(page_size)
        .ok_or_else(|| RpcError::invalid_argument("page token overflows"))?;
    if start >= total_size {
        return Err(RpcError::out_of_range(format!(
            "page start {start} is beyond the total of {total_size}"
        )));
    }
    let end = std::cmp::min(start + page_size, total_size);

    Ok(Paginated {
        items: items[start..end].to_vec(),
        total_size,
        next_page_token: (token + 1).to_string(),
    })
}
