//! Mock transport for testing
//!
//! Replies are queued up front and handed out in order; every request and
//! every session release is recorded for assertions.

use crate::error::ExchangeError;
use crate::transport::{ChatReply, ChatTransport};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A request as the transport saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub message: String,
    pub session_id: Option<String>,
}

#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Result<ChatReply, ExchangeError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    released: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, reply: ChatReply) {
        self.replies.lock().unwrap().push_back(Ok(reply));
    }

    /// Queue a failed exchange
    pub fn queue_error(&self, error: ExchangeError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn released_sessions(&self) -> Vec<String> {
        self.released.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send(&self, message: &str, session_id: Option<&str>) -> Result<ChatReply, ExchangeError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            message: message.to_string(),
            session_id: session_id.map(str::to_string),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ExchangeError::with_detail("No mock reply queued")))
    }

    fn release_session(&self, session_id: &str) {
        self.released.lock().unwrap().push(session_id.to_string());
    }
}
