#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate diesel;

pub mod config;
pub mod error;
pub mod handle;
pub mod models;
pub mod report;
pub mod schema;
pub mod signature;
pub mod slack;
pub mod store;

use rocket::FromForm;

pub use error::{ConfigError, ReportError, StoreError};
pub use models::{StandupField, StandupRecord, StandupUpdate};
pub use store::StatusStore;

/// Form body Slack posts for a slash command.
#[derive(Debug, FromForm)]
pub struct SlackSlashEvent {
    pub command: String,
    pub text: Option<String>,
    pub user_id: String,
    pub channel_id: String,
    pub response_url: String,
}

/// Interactive components arrive as a single form field holding JSON.
#[derive(Debug, FromForm)]
pub struct SlackActionResponse {
    pub payload: String,
}

#[derive(Deserialize, Debug)]
pub struct SlackActionPayload {
    pub r#type: String,
    pub user: SlackUser,
    pub channel: Option<SlackChannel>,
    pub response_url: Option<String>,
    #[serde(default)]
    pub actions: Vec<BlockAction>,
}

#[derive(Deserialize, Debug)]
pub struct SlackUser {
    pub id: String,
}

#[derive(Deserialize, Debug)]
pub struct SlackChannel {
    pub id: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BlockAction {
    pub action_id: String,
    pub value: Option<String>,
    pub selected_channel: Option<String>,
    pub selected_conversation: Option<String>,
}
