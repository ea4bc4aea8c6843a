//! The protocol client for the share registry.
//!
//! Four kinds of call, all JSON over HTTP: publish a snapshot, fetch by
//! code, chat writes (send/delete), and the lock toggle.  No call retries
//! automatically — a failed attempt is surfaced as a [`SyncError`] and the
//! caller decides whether to fire again.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use rollbook_shared::chat::{ChatMessage, SenderId};
use rollbook_shared::code::ShareCode;
use rollbook_shared::snapshot::ClassSnapshot;

use crate::error::SyncError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct SyncClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ShareResponse {
    code: ShareCode,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

impl SyncClient {
    /// Build a client against a registry base URL (e.g.
    /// `https://registry.example.com` or `http://127.0.0.1:8080`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self { http, base_url })
    }

    /// Publish a full snapshot; the registry assigns and returns a fresh
    /// code.  Re-publishing the same class yields a new code every time —
    /// previously issued codes keep resolving to their frozen snapshots.
    pub async fn publish(&self, snapshot: &ClassSnapshot) -> Result<ShareCode, SyncError> {
        let response = self
            .http
            .post(self.url("/api/share"))
            .json(snapshot)
            .send()
            .await?;
        let response = Self::check(response).await?;
        let share: ShareResponse = response.json().await?;

        debug!(code = %share.code, class = %snapshot.class.id, "snapshot published");
        Ok(share.code)
    }

    /// Fetch the snapshot stored under a code (viewer join and every poll
    /// tick).  The lookup is case-insensitive; the response is validated
    /// before being handed back.
    pub async fn fetch(&self, code: &ShareCode) -> Result<ClassSnapshot, SyncError> {
        let response = self
            .http
            .get(self.url("/api/view"))
            .query(&[("code", code.as_str())])
            .send()
            .await?;
        let response = Self::check(response).await?;
        let body = response.text().await?;

        Ok(ClassSnapshot::from_json(&body)?)
    }

    /// Append one message to the entry's list.  Rejected with
    /// [`SyncError::Forbidden`] when the chat is locked and the message is
    /// not from the teacher.
    pub async fn send_message(
        &self,
        code: &ShareCode,
        message: &ChatMessage,
    ) -> Result<(), SyncError> {
        let body = serde_json::json!({
            "code": code.as_str(),
            "message": message,
        });
        let response = self
            .http
            .post(self.url("/api/messages/send"))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;

        debug!(code = %code, id = %message.id, "message sent");
        Ok(())
    }

    /// Delete one message by id.  The requester must be the teacher or the
    /// message's original sender.
    pub async fn delete_message(
        &self,
        code: &ShareCode,
        message_id: &str,
        requester: &SenderId,
    ) -> Result<(), SyncError> {
        let body = serde_json::json!({
            "code": code.as_str(),
            "messageId": message_id,
            "senderId": requester,
        });
        let response = self
            .http
            .post(self.url("/api/messages/delete"))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;

        debug!(code = %code, id = %message_id, "message deleted");
        Ok(())
    }

    /// Flip the entry's chat lock.  Teacher only.
    pub async fn set_chat_lock(
        &self,
        code: &ShareCode,
        locked: bool,
        requester: &SenderId,
    ) -> Result<(), SyncError> {
        let body = serde_json::json!({
            "code": code.as_str(),
            "isLocked": locked,
            "senderId": requester,
        });
        let response = self
            .http
            .post(self.url("/api/lock"))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;

        debug!(code = %code, locked, "chat lock set");
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map non-success statuses onto the error taxonomy.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SyncError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorResponse>()
            .await
            .map(|e| e.error)
            .unwrap_or_else(|_| status.to_string());

        Err(match status {
            StatusCode::NOT_FOUND => SyncError::NotFound,
            StatusCode::GONE => SyncError::Expired,
            StatusCode::FORBIDDEN => SyncError::Forbidden(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                SyncError::Rejected(message)
            }
            other => SyncError::Server {
                status: other.as_u16(),
                message,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_normalized() {
        let client = SyncClient::new("http://localhost:8080///").unwrap();
        assert_eq!(client.url("/api/view"), "http://localhost:8080/api/view");
    }
}
