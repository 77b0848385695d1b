//! Pagination Cursor
//!
//! Walks a multi-page listing strictly forward. A cursor owns its page
//! source, remembers the last-seen continuation token and stops for good on
//! the terminal page or on the first error. A token that was already sent
//! once is an error: following it would re-issue a page already consumed.

use crate::error::{DiscoveryError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;

/// One page of raw remote objects
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    /// Token for the following page, `None` when the API reports the end
    pub next_token: Option<String>,
}

impl Page {
    /// A page that ends the listing
    pub fn last(items: Vec<Value>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }

    /// A page followed by another one
    pub fn with_next(items: Vec<Value>, token: impl Into<String>) -> Self {
        Self {
            items,
            next_token: Some(token.into()),
        }
    }
}

/// Something that can fetch one page given the previous continuation token
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, token: Option<String>) -> Result<Page>;

    /// Name used when reporting a bad listing
    fn operation(&self) -> &str {
        "listing"
    }
}

/// Where the cursor is in its listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// No page fetched yet
    Fresh,
    /// At least one page fetched and the API announced another
    HasMore,
    /// The terminal page has been fetched
    Exhausted,
    /// A fetch failed; see [`Cursor::failure`]
    Failed,
}

/// Forward-only cursor over a [`PageSource`]
pub struct Cursor<S> {
    source: S,
    state: CursorState,
    next_token: Option<String>,
    sent_tokens: HashSet<String>,
    current: Vec<Value>,
    failure: Option<DiscoveryError>,
    pages_fetched: usize,
}

impl<S: PageSource> Cursor<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: CursorState::Fresh,
            next_token: None,
            sent_tokens: HashSet::new(),
            current: Vec::new(),
            failure: None,
            pages_fetched: 0,
        }
    }

    /// Fetch the next page.
    ///
    /// Returns `true` when a page was fetched and is available through
    /// [`current_page`](Self::current_page). Returns `false` without any
    /// remote call once the listing is exhausted or has failed.
    pub async fn advance(&mut self) -> bool {
        match self.state {
            CursorState::Exhausted => return false,
            CursorState::Failed => {
                tracing::warn!("advance() called on a failed cursor, ignoring");
                return false;
            }
            CursorState::Fresh | CursorState::HasMore => {}
        }

        let token = self.next_token.take();
        if let Some(sent) = &token {
            self.sent_tokens.insert(sent.clone());
        }

        match self.source.fetch_page(token).await {
            Ok(page) => {
                self.pages_fetched += 1;
                // An empty token is as good as none
                let next_token = page.next_token.filter(|t| !t.is_empty());
                if let Some(repeated) = next_token
                    .as_ref()
                    .filter(|t| self.sent_tokens.contains(*t))
                {
                    let err = DiscoveryError::malformed(
                        self.source.operation(),
                        format!("continuation token {:?} did not advance", repeated),
                    );
                    tracing::warn!("page {}: {}", self.pages_fetched, err);
                    self.current.clear();
                    self.failure = Some(err);
                    self.state = CursorState::Failed;
                    return false;
                }
                self.next_token = next_token;
                self.state = if self.next_token.is_some() {
                    CursorState::HasMore
                } else {
                    CursorState::Exhausted
                };
                tracing::debug!(
                    "page {} fetched: {} items, more={}",
                    self.pages_fetched,
                    page.items.len(),
                    self.next_token.is_some()
                );
                self.current = page.items;
                true
            }
            Err(err) => {
                tracing::debug!("page {} failed: {}", self.pages_fetched + 1, err);
                self.current.clear();
                self.failure = Some(err);
                self.state = CursorState::Failed;
                false
            }
        }
    }

    /// Items of the most recently fetched page
    pub fn current_page(&self) -> &[Value] {
        &self.current
    }

    /// Whether another page can still be fetched
    pub fn has_next(&self) -> bool {
        matches!(self.state, CursorState::Fresh | CursorState::HasMore)
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// First error encountered, if any
    pub fn failure(&self) -> Option<&DiscoveryError> {
        self.failure.as_ref()
    }

    /// Move the first error out of the cursor
    pub fn take_failure(&mut self) -> Option<DiscoveryError> {
        self.failure.take()
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Walk every page and return all items, or the first error
    pub async fn collect_all(mut self) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        while self.advance().await {
            items.append(&mut self.current);
        }
        match self.take_failure() {
            Some(err) => Err(err),
            None => Ok(items),
        }
    }
}
