//! Cursor pagination over search endpoints.
//!
//! Search responses use the connection envelope:
//!
//! ```json
//! {
//!   "searchStacks": {
//!     "edges": [{"cursor": "c0", "node": {"id": "a"}}],
//!     "pageInfo": {"hasNextPage": true, "endCursor": "c1"}
//!   }
//! }
//! ```
//!
//! Cursors are opaque: they are passed back exactly as received.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::predicate::Predicate;
use crate::transport::{execute, Transport};
use crate::types::{Request, Variables};

/// Default number of nodes requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Result nodes in server order.
    pub nodes: Vec<T>,
    /// Cursor to resume after this page.
    pub end_cursor: Option<String>,
    /// Whether another page follows.
    pub has_next_page: bool,
}

/// `pageInfo` of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Whether another page follows.
    pub has_next_page: bool,
    /// Cursor of the last edge.
    #[serde(default)]
    pub end_cursor: Option<String>,
}

/// One edge of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge<T> {
    /// Per-edge cursor, if the remote provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    /// The result node.
    pub node: T,
}

/// A connection as returned by a search field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    /// The edges of this page.
    pub edges: Vec<Edge<T>>,
    /// Pagination info.
    pub page_info: PageInfo,
}

impl<T> From<Connection<T>> for Page<T> {
    fn from(connection: Connection<T>) -> Self {
        Self {
            nodes: connection.edges.into_iter().map(|e| e.node).collect(),
            end_cursor: connection.page_info.end_cursor,
            has_next_page: connection.page_info.has_next_page,
        }
    }
}

/// The `input` variable of a search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchInput {
    /// Page size hint.
    pub first: u32,
    /// Forward cursor; omitted on the first page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    /// Filter predicates.
    pub predicates: Vec<Predicate>,
}

/// A search query and the response field holding its connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    operation_name: String,
    document: String,
    field: String,
}

impl SearchQuery {
    /// Describe a search query.
    ///
    /// `document` must accept an `$input` variable shaped like
    /// [`SearchInput`]; `field` is the top-level response field.
    pub fn new(
        operation_name: impl Into<String>,
        document: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            operation_name: operation_name.into(),
            document: document.into(),
            field: field.into(),
        }
    }

    /// Build the request for one page.
    pub fn request(&self, input: &SearchInput) -> Result<Request, ProviderError> {
        let variables = Variables::new().try_with("input", input)?;
        Ok(Request::query(&self.operation_name, &self.document).with_variables(variables))
    }

    /// The response field holding the connection.
    pub fn field(&self) -> &str {
        &self.field
    }
}

/// Drive a cursor-paginated fetch to completion.
///
/// `fetch_page` receives `None` for the first page and the previous page's
/// end cursor afterwards. Pages are fetched strictly one after another until
/// a page reports `has_next_page == false`. Any failure aborts the walk and
/// drops everything collected so far.
pub async fn paginate<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>, ProviderError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, ProviderError>>,
{
    let mut out = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = fetch_page(cursor.take()).await.map_err(|e| {
            warn!(pages, error = %e, "page fetch failed, discarding partial results");
            e
        })?;
        pages += 1;
        debug!(page = pages, nodes = page.nodes.len(), has_next = page.has_next_page, "fetched page");
        out.extend(page.nodes);

        if !page.has_next_page {
            break;
        }
        match page.end_cursor {
            Some(end) => cursor = Some(end),
            None => {
                return Err(ProviderError::Protocol(format!(
                    "page {} reports more results but no end cursor",
                    pages
                )))
            }
        }
    }

    debug!(pages, total = out.len(), "pagination complete");
    Ok(out)
}

/// Fetch every node matching `predicates` from a search endpoint.
pub async fn search_all<T, C>(
    transport: &C,
    search: &SearchQuery,
    predicates: &[Predicate],
    page_size: u32,
) -> Result<Vec<T>, ProviderError>
where
    T: DeserializeOwned,
    C: Transport + ?Sized,
{
    paginate(move |after| async move {
        let input = SearchInput {
            first: page_size,
            after,
            predicates: predicates.to_vec(),
        };
        let request = search.request(&input)?;
        let mut data: serde_json::Value = execute(transport, &request).await?;
        let connection = data.get_mut(search.field()).map(serde_json::Value::take);

        match connection {
            Some(value) if !value.is_null() => {
                let connection: Connection<T> = serde_json::from_value(value).map_err(|e| {
                    ProviderError::Protocol(format!(
                        "{} is not a connection: {}",
                        search.field(),
                        e
                    ))
                })?;
                Ok(Page::from(connection))
            }
            _ => Err(ProviderError::Protocol(format!(
                "response has no {} field",
                search.field()
            ))),
        }
    })
    .await
}
