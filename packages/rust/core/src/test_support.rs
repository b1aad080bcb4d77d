//! In-memory scoreboard for resolver, retriever and pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;

use gridsync_shared::{RawDocument, TransportError};
use gridsync_transport::{ScoreboardQuery, ScoreboardSource};

/// Answers queries from a fixed table; anything unlisted is a 404.
#[derive(Default)]
pub(crate) struct StubSource {
    responses: HashMap<String, RawDocument>,
    calls: Mutex<Vec<String>>,
}

impl StubSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, query: ScoreboardQuery, doc: RawDocument) -> Self {
        self.responses.insert(query.to_string(), doc);
        self
    }

    /// Queries seen so far, in order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ScoreboardSource for StubSource {
    async fn fetch(&self, query: &ScoreboardQuery) -> Result<RawDocument, TransportError> {
        let key = query.to_string();
        self.calls.lock().unwrap().push(key.clone());
        self.responses
            .get(&key)
            .cloned()
            .ok_or(TransportError::Status {
                url: key,
                status: 404,
            })
    }
}
