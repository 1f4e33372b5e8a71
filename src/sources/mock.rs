//! Mock transport for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::sources::{PageSource, SourceError};

/// A transport that serves predefined pages and records every request.
///
/// URLs without a registered page are answered with the fallback page if one
/// is set, otherwise with a network error.
#[derive(Debug, Default)]
pub struct MockTransport {
    pages: Mutex<HashMap<String, String>>,
    fallback: Mutex<Option<String>>,
    requests: Mutex<Vec<String>>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for exactly `url`.
    pub fn set_page(&self, url: impl Into<String>, html: impl Into<String>) {
        let mut guard = self.pages.lock().unwrap();
        guard.insert(url.into(), html.into());
    }

    /// Serve `html` for every URL without a page of its own.
    pub fn set_fallback(&self, html: impl Into<String>) {
        let mut guard = self.fallback.lock().unwrap();
        *guard = Some(html.into());
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests served so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PageSource for MockTransport {
    async fn fetch(&self, url: &str) -> Result<String, SourceError> {
        self.requests.lock().unwrap().push(url.to_string());

        if let Some(page) = self.pages.lock().unwrap().get(url) {
            return Ok(page.clone());
        }
        match &*self.fallback.lock().unwrap() {
            Some(page) => Ok(page.clone()),
            None => Err(SourceError::Network(format!(
                "Connection can't be established: {}",
                url
            ))),
        }
    }
}
