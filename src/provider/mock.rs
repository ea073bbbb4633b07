//! Recording status provider for tests

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::registry::ChannelId;

use super::{ProviderError, StatusProvider, StatusRecord};

/// Provider that replays queued responses and records every batch it sees
///
/// Once the queue is drained, `fallback` is returned for every call.
pub(crate) struct MockProvider {
    responses: Mutex<VecDeque<Result<Vec<StatusRecord>, ProviderError>>>,
    fallback: Result<Vec<StatusRecord>, ProviderError>,
    calls: Mutex<Vec<Vec<String>>>,
    delay: Option<Duration>,
}

impl MockProvider {
    /// Provider that always reports `records` as live
    pub(crate) fn live(records: Vec<StatusRecord>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: Ok(records),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Provider that always fails
    pub(crate) fn failing() -> Self {
        Self {
            fallback: Err(ProviderError::Transport("unreachable".to_string())),
            ..Self::live(Vec::new())
        }
    }

    /// Queue a one-shot response ahead of the fallback
    pub(crate) fn then(self, response: Result<Vec<StatusRecord>, ProviderError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    /// Sleep before answering each call
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Channel batches received so far, in call order
    pub(crate) fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl StatusProvider for MockProvider {
    async fn fetch_statuses(
        &self,
        channels: &[ChannelId],
    ) -> Result<Vec<StatusRecord>, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push(channels.iter().map(|c| c.to_string()).collect());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self.responses.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| self.fallback.clone())
    }
}
