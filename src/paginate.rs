//! Lazy page-by-page iteration over list endpoints.
//!
//! A [`PaginatedQuery`] issues one request per page, only when asked for the
//! next page. Each request goes to the same route with an incremented `page`
//! parameter; the server's `next` link is only used to detect the last page.

use std::marker::PhantomData;

use futures_util::Stream;
use futures_util::stream;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::dispatch::{RequestDispatcher, RequestSpec};
use crate::error::ClientError;

/// One page of a list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T = Value> {
    /// Total number of items across every page, when the server reports it.
    #[serde(default)]
    pub count: Option<u64>,
    /// Link to the following page; `None` on the last page.
    #[serde(default)]
    pub next: Option<String>,
    /// Link to the preceding page.
    #[serde(default)]
    pub previous: Option<String>,
    /// Items on this page.
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// True when the server reported no following page.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

/// Starting page and page size for a [`PaginatedQuery`].
///
/// Unset fields are omitted from requests and the server defaults apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page to start from.
    pub page: Option<u32>,
    /// Items per page.
    pub page_size: Option<u32>,
}

impl PageRequest {
    /// Starts at the first page with `page_size` items per page.
    #[must_use]
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            page: None,
            page_size: Some(page_size),
        }
    }
}

/// A finite, lazily fetched sequence of pages.
///
/// The sequence ends after the page whose `next` is absent, or right after
/// yielding the first error. Creating a new query re-issues it from the start.
#[derive(Debug)]
pub struct PaginatedQuery<T = Value> {
    dispatcher: RequestDispatcher,
    spec: RequestSpec,
    page: Option<u32>,
    page_size: Option<u32>,
    finished: bool,
    item: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> PaginatedQuery<T> {
    /// Prepares a query; no request is sent until the first page is read.
    #[must_use]
    pub fn new(dispatcher: RequestDispatcher, spec: RequestSpec, request: PageRequest) -> Self {
        Self {
            dispatcher,
            spec,
            page: request.page,
            page_size: request.page_size,
            finished: false,
            item: PhantomData,
        }
    }

    /// Reinterprets the items of every page as `U`.
    #[must_use]
    pub fn typed<U: DeserializeOwned>(self) -> PaginatedQuery<U> {
        PaginatedQuery {
            dispatcher: self.dispatcher,
            spec: self.spec,
            page: self.page,
            page_size: self.page_size,
            finished: self.finished,
            item: PhantomData,
        }
    }

    /// True once the last page or an error has been yielded.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fetches the next page, or returns `None` when the sequence has ended.
    pub async fn next_page(&mut self) -> Option<Result<Page<T>, ClientError>> {
        if self.finished {
            return None;
        }
        let spec = self
            .spec
            .clone()
            .optional_param("page", self.page)
            .optional_param("page_size", self.page_size);
        debug!(route = %spec.route(), page = ?self.page, "fetching page");

        let fetched = match self.dispatcher.dispatch(&spec).await {
            Ok(value) => serde_json::from_value::<Page<T>>(value).map_err(|e| {
                ClientError::invalid_response(spec.route().to_string(), e.to_string())
            }),
            Err(error) => Err(error),
        };

        match &fetched {
            Ok(page) if !page.is_last() => {
                self.page = Some(self.page.unwrap_or(1).saturating_add(1));
            }
            _ => self.finished = true,
        }
        Some(fetched)
    }

    /// Converts the query into a stream of pages.
    pub fn into_stream(self) -> impl Stream<Item = Result<Page<T>, ClientError>> {
        stream::unfold(self, |mut query| async move {
            query.next_page().await.map(|page| (page, query))
        })
    }

    /// Reads every remaining page and concatenates their items.
    ///
    /// # Errors
    ///
    /// Returns the first page error; items read before it are discarded.
    pub async fn collect_results(mut self) -> Result<Vec<T>, ClientError> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await {
            items.extend(page?.results);
        }
        Ok(items)
    }
}
