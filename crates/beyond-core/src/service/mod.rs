pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::conversation::{ExchangeOutcome, ExchangeRequest};

pub use http::HttpChatClient;

/// Ways an exchange with the chat service can fail
#[derive(Error, Debug)]
pub enum ChatError {
    /// The service did not answer within the configured timeout
    #[error("chat service timed out")]
    Timeout,

    /// The request never completed (connection refused, DNS, TLS, ...)
    #[error("could not reach chat service: {0}")]
    Transport(#[source] reqwest::Error),

    /// The service answered with a non-success status
    #[error("chat service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The body was not `{"response": string}`
    #[error("malformed chat response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChatError::Timeout
        } else {
            ChatError::Transport(e)
        }
    }
}

/// The external request/response chat backend.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn send(&self, message: &str) -> Result<String, ChatError>;
}

/// Runs exchanges against a [`ChatService`] without blocking the caller.
///
/// Exchanges are independent: nothing is queued behind an earlier request, so
/// outcomes come back in completion order.
#[derive(Clone)]
pub struct NetworkBridge {
    service: Arc<dyn ChatService>,
}

impl NetworkBridge {
    pub fn new(service: Arc<dyn ChatService>) -> Self {
        Self { service }
    }

    pub async fn exchange(&self, request: ExchangeRequest) -> ExchangeOutcome {
        tracing::debug!(id = request.id, "sending chat request");
        let result = self.service.send(&request.message).await;
        ExchangeOutcome {
            id: request.id,
            result,
        }
    }

    /// Spawns the exchange and passes its outcome to `on_done`.
    pub fn dispatch<F>(&self, request: ExchangeRequest, on_done: F) -> JoinHandle<()>
    where
        F: FnOnce(ExchangeOutcome) + Send + 'static,
    {
        let bridge = self.clone();
        tokio::spawn(async move {
            let outcome = bridge.exchange(request).await;
            on_done(outcome);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ConversationStore, FAILURE_BANNER};
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::sync::{mpsc, Mutex};

    /// Answers each message with a canned result, after a per-message delay.
    struct ScriptedService {
        script: Mutex<HashMap<String, (Duration, Result<String, ChatError>)>>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedService {
        fn new(script: Vec<(&str, Duration, Result<String, ChatError>)>) -> Arc<Self> {
            let script = script
                .into_iter()
                .map(|(message, delay, result)| (message.to_string(), (delay, result)))
                .collect();
            Arc::new(Self {
                script: Mutex::new(script),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatService for ScriptedService {
        async fn send(&self, message: &str) -> Result<String, ChatError> {
            self.seen.lock().await.push(message.to_string());
            let entry = self.script.lock().await.remove(message);
            match entry {
                Some((delay, result)) => {
                    tokio::time::sleep(delay).await;
                    result
                }
                None => Err(ChatError::Malformed(format!("no script for {:?}", message))),
            }
        }
    }

    #[tokio::test]
    async fn test_failure_then_success_clears_banner() {
        let service = ScriptedService::new(vec![
            ("hello", Duration::ZERO, Err(ChatError::Status { status: 500, body: "boom".into() })),
            ("hello?", Duration::ZERO, Ok("hello back".to_string())),
        ]);
        let bridge = NetworkBridge::new(service.clone());
        let mut store = ConversationStore::new();

        let request = store.submit("hello");
        store.complete(bridge.exchange(request).await);
        assert_eq!(store.len(), 1);
        assert_eq!(store.error(), Some(FAILURE_BANNER));

        let request = store.submit("hello?");
        store.complete(bridge.exchange(request).await);
        assert_eq!(store.len(), 3);
        assert_eq!(store.error(), None);
        assert_eq!(*service.seen.lock().await, vec!["hello", "hello?"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_delivers_in_completion_order() {
        let service = ScriptedService::new(vec![
            ("first", Duration::from_secs(5), Ok("slow".to_string())),
            ("second", Duration::from_secs(1), Ok("fast".to_string())),
        ]);
        let bridge = NetworkBridge::new(service);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut store = ConversationStore::new();

        for text in ["first", "second"] {
            let request = store.submit(text);
            let tx = tx.clone();
            bridge.dispatch(request, move |outcome| {
                let _ = tx.send(outcome);
            });
        }

        for _ in 0..2 {
            let outcome = rx.recv().await.unwrap();
            store.complete(outcome);
        }

        let texts: Vec<&str> = store.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "fast", "slow"]);
    }
}
