//! In-memory transport used by the crate's tests.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use super::transport::{ApiRequest, Transport};
use crate::error::{FetchError, FetchResult};

enum Reply {
    Ready(FetchResult<Value>),
    Deferred(oneshot::Receiver<FetchResult<Value>>),
}

/// Answers requests with scripted replies in issue order and records every request.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(&self, result: FetchResult<Value>) -> &Self {
        self.replies.lock().push_back(Reply::Ready(result));
        self
    }

    pub(crate) fn reply_ok(&self, body: Value) -> &Self {
        self.reply(Ok(body))
    }

    /// Queue a reply that resolves only when the returned sender fires.
    pub(crate) fn reply_later(&self) -> oneshot::Sender<FetchResult<Value>> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().push_back(Reply::Deferred(rx));
        tx
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> FetchResult<Value> {
        let reply = {
            self.requests.lock().push(request.clone());
            self.replies.lock().pop_front()
        };
        match reply {
            Some(Reply::Ready(result)) => result,
            Some(Reply::Deferred(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(FetchError::Network("reply dropped".into()))),
            None => panic!("unexpected request {} {}", request.path, request.query.len()),
        }
    }
}
