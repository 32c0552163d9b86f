use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatError, ChatService};

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

/// JSON-over-HTTP client for the chat endpoint.
#[derive(Clone)]
pub struct HttpChatClient {
    client: Client,
    endpoint: String,
}

impl HttpChatClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ChatError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatService for HttpChatClient {
    async fn send(&self, message: &str) -> Result<String, ChatError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest { message })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let chat_response: ChatResponse =
            serde_json::from_str(&body).map_err(|e| ChatError::Malformed(e.to_string()))?;
        Ok(chat_response.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accepts one connection, answers it with `status_line` and `body`, and
    /// returns the raw request it received.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "{}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });

        (format!("http://{}/chat", addr), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn test_send_posts_message_and_reads_response() {
        let (endpoint, server) = serve_once("HTTP/1.1 200 OK", r#"{"response":"hi from the model"}"#).await;
        let client = HttpChatClient::new(&endpoint, Duration::from_secs(5)).unwrap();

        let reply = client.send("hello").await.unwrap();
        assert_eq!(reply, "hi from the model");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /chat "), "unexpected request: {}", request);
        assert!(request.ends_with(r#"{"message":"hello"}"#), "unexpected body: {}", request);
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let (endpoint, server) = serve_once(
            "HTTP/1.1 500 Internal Server Error",
            r#"{"error":"Internal server error"}"#,
        )
        .await;
        let client = HttpChatClient::new(&endpoint, Duration::from_secs(5)).unwrap();

        match client.send("hello").await {
            Err(ChatError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert!(body.contains("Internal server error"));
            }
            other => panic!("expected status error, got {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_response_field_is_malformed() {
        let (endpoint, server) = serve_once("HTTP/1.1 200 OK", r#"{"reply":"wrong key"}"#).await;
        let client = HttpChatClient::new(&endpoint, Duration::from_secs(5)).unwrap();

        assert!(matches!(client.send("hello").await, Err(ChatError::Malformed(_))));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unresponsive_service_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let client =
            HttpChatClient::new(&format!("http://{}/chat", addr), Duration::from_millis(200)).unwrap();
        assert!(matches!(client.send("hello").await, Err(ChatError::Timeout)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let client = HttpChatClient::new(&format!("http://{}/chat", addr), Duration::from_secs(5)).unwrap();
        assert!(matches!(client.send("hello").await, Err(ChatError::Transport(_))));
    }
}
