use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One prior exchange half in a conversation, as the chat contract expects it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatTurnRequest<'a> {
    message: &'a str,
    history: &'a [HistoryEntry],
    session_id: &'a str,
}

/// A successful reply from the chat contract, with classification metadata.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub message: String,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub routed_action: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Any non-success response or network fault is a transport failure; the
/// simulator fails the owning scenario outright without retrying.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat endpoint returned status {status}")]
    Status { status: u16 },
    #[error("request to chat endpoint failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// The "send one turn, get one reply" contract the harness consumes.
///
/// The service under test owns the full contract; the harness only needs the
/// turn exchange and a health probe.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn send_turn(
        &self,
        session_id: &str,
        message: &str,
        history: &[HistoryEntry],
    ) -> Result<ChatReply, ChatError>;

    async fn health_check(&self) -> Result<(), ChatError>;
}

/// HTTP client for a live chat service.
///
/// The request timeout bounds how long a hung call can hold a concurrency
/// slot; a timed-out request surfaces as [ChatError::Transport].
#[derive(Debug, Clone)]
pub struct HttpChatService {
    client: reqwest::Client,
    chat_url: Url,
    health_url: Url,
}

impl HttpChatService {
    pub fn new(base: &Url, request_timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            chat_url: join_endpoint(base, "chat")?,
            health_url: join_endpoint(base, "health")?,
        })
    }
}

#[async_trait]
impl ChatService for HttpChatService {
    async fn send_turn(
        &self,
        session_id: &str,
        message: &str,
        history: &[HistoryEntry],
    ) -> Result<ChatReply, ChatError> {
        let response = self
            .client
            .post(self.chat_url.clone())
            .json(&ChatTurnRequest {
                message,
                history,
                session_id,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChatError::Status {
                status: response.status().as_u16(),
            });
        }

        Ok(response.json().await?)
    }

    async fn health_check(&self) -> Result<(), ChatError> {
        let response = self.client.get(self.health_url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(ChatError::Status {
                status: response.status().as_u16(),
            });
        }

        Ok(())
    }
}

fn join_endpoint(base: &Url, leaf: &str) -> anyhow::Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        base.set_path(&format!("{}/", base.path()));
    }
    Ok(base.join(leaf)?)
}

const INITIAL_PROBE_DELAY: Duration = Duration::from_millis(500);
const MAX_PROBE_DELAY: Duration = Duration::from_secs(5);

/// Poll the health probe until it succeeds or the wait window closes.
///
/// Backs off from 500ms, doubling up to 5s between probes. Returns the last
/// probe error if the service never became healthy.
pub async fn wait_until_ready(chat: &dyn ChatService, window: Duration) -> Result<(), ChatError> {
    let deadline = tokio::time::Instant::now() + window;
    let mut delay = INITIAL_PROBE_DELAY;

    loop {
        match chat.health_check().await {
            Ok(()) => return Ok(()),
            Err(e) => {
                if tokio::time::Instant::now() + delay >= deadline {
                    return Err(e);
                }
                log::info!("Chat service not ready yet, retrying in {delay:?}: {e}");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_PROBE_DELAY);
            }
        }
    }
}
