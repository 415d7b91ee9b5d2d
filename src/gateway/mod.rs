//! Typed access to the conversation server.
//!
//! The server owns every group, player and message. Each call here
//! is an independent round trip: there are no retries, no
//! client-side timeouts and no ordering between calls beyond what
//! the responses themselves imply.
pub mod client;
pub mod models;
pub use client::*;
pub use models::*;

use async_trait::async_trait;
use thiserror::Error;

/// A failed round trip, distinct from any successful (possibly
/// empty) response.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

/// The operations the client needs from the conversation server.
///
/// Implemented by [`Gateway`] over HTTP. Kept as a trait so the
/// session can be driven by anything that answers these calls.
#[async_trait]
pub trait ConversationApi: Send + Sync {
    async fn list_groups(&self) -> Result<Vec<Group>, GatewayError>;
    async fn create_group(&self, group: &NewGroup) -> Result<GroupId, GatewayError>;
    async fn delete_group(&self, group_id: GroupId) -> Result<(), GatewayError>;
    async fn group_info(&self, group_id: GroupId) -> Result<GroupInfo, GatewayError>;
    async fn update_rules(&self, group_id: GroupId, rules: &str) -> Result<(), GatewayError>;

    async fn list_players(&self, group_id: GroupId) -> Result<Vec<Player>, GatewayError>;
    async fn add_player(
        &self,
        group_id: GroupId,
        player: &PlayerPayload,
    ) -> Result<PlayerId, GatewayError>;
    async fn update_player(
        &self,
        player_id: PlayerId,
        player: &PlayerPayload,
    ) -> Result<(), GatewayError>;
    async fn delete_player(&self, player_id: PlayerId) -> Result<(), GatewayError>;

    async fn list_messages(
        &self,
        group_id: GroupId,
        limit: Option<u32>,
    ) -> Result<Vec<Message>, GatewayError>;
    async fn post_message(
        &self,
        group_id: GroupId,
        message: &NewMessage,
    ) -> Result<MessageId, GatewayError>;
    async fn ai_speak(
        &self,
        group_id: GroupId,
        request: &AiSpeakRequest,
    ) -> Result<AiSpeakReply, GatewayError>;

    async fn status(&self) -> Result<ServerStatus, GatewayError>;
}
