use reqwest::header::AUTHORIZATION;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";
const GET_UPLOAD_URL: &str = "https://slack.com/api/files.getUploadURLExternal";
const COMPLETE_UPLOAD_URL: &str = "https://slack.com/api/files.completeUploadExternal";

/// Upper bound on any single Web API or `response_url` call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum SlackError {
    #[error("slack request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("slack api error: {0}")]
    Api(String),
    #[error("could not read upload: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Deserialize, Debug)]
struct UploadTicket {
    upload_url: String,
    file_id: String,
}

/// Thin client over the handful of Web API methods the bot needs.
#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    token: String,
}

impl SlackClient {
    pub fn new(token: impl Into<String>) -> Result<SlackClient, SlackError> {
        SlackClient::with_timeout(token, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<SlackClient, SlackError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(SlackClient {
            http,
            token: token.into(),
        })
    }

    pub async fn post_message(
        &self,
        channel: &str,
        text: &str,
        blocks: Value,
    ) -> Result<(), SlackError> {
        let payload = json!({
            "channel": channel,
            "text": text,
            "blocks": blocks,
        });

        let body: Value = self
            .http
            .post(POST_MESSAGE_URL)
            .header(AUTHORIZATION, self.bearer())
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        check_ok(body).map(|_| ())
    }

    /// Ephemeral reply through a command's `response_url`.
    pub async fn respond(&self, response_url: &str, text: &str) -> Result<(), SlackError> {
        let payload = json!({
            "response_type": "ephemeral",
            "replace_original": false,
            "text": text,
        });

        self.http
            .post(response_url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    /// Uploads a file and shares it in `channel`.
    pub async fn upload_file(
        &self,
        channel: &str,
        path: &Path,
        file_name: &str,
        title: &str,
    ) -> Result<(), SlackError> {
        let contents = rocket::tokio::fs::read(path).await?;

        let length = contents.len().to_string();
        let body: Value = self
            .http
            .post(GET_UPLOAD_URL)
            .header(AUTHORIZATION, self.bearer())
            .form(&[("filename", file_name), ("length", length.as_str())])
            .send()
            .await?
            .json()
            .await?;
        let ticket: UploadTicket = serde_json::from_value(check_ok(body)?)
            .map_err(|e| SlackError::Api(format!("unexpected upload ticket: {}", e)))?;
        debug!(file_id = %ticket.file_id, "got upload url");

        self.http
            .post(&ticket.upload_url)
            .body(contents)
            .send()
            .await?
            .error_for_status()?;

        let payload = json!({
            "files": [{ "id": ticket.file_id, "title": title }],
            "channel_id": channel,
        });
        let body: Value = self
            .http
            .post(COMPLETE_UPLOAD_URL)
            .header(AUTHORIZATION, self.bearer())
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        check_ok(body).map(|_| ())
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Web API calls answer 200 even on failure; the real status is `ok`.
fn check_ok(body: Value) -> Result<Value, SlackError> {
    if body.get("ok").and_then(Value::as_bool) == Some(true) {
        Ok(body)
    } else {
        let error = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error");
        Err(SlackError::Api(error.to_string()))
    }
}
