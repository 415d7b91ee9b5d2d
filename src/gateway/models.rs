//! Wire representations of the conversation server's resources.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

pub type GroupId = i64;
pub type PlayerId = i64;
pub type MessageId = i64;

// The server stores optional text columns as NULL, which serde would
// otherwise reject for a plain `String`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rules: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message_count: i64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_activity: Option<String>,
}

impl Group {
    pub fn new(id: GroupId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: String::new(),
            rules: String::new(),
            message_count: 0,
            created_at: None,
            last_activity: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastMessage {
    pub content: String,
    pub timestamp: String,
    pub speaker_name: String,
}

/// Detail view of a group, the only place the server returns `rules`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub id: GroupId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rules: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub player_count: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message_count: i64,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewGroup {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerKind {
    Human,
    Ai,
}

impl fmt::Display for PlayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerKind::Human => write!(f, "human"),
            PlayerKind::Ai => write!(f, "ai"),
        }
    }
}

impl FromStr for PlayerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "human" => Ok(PlayerKind::Human),
            "ai" => Ok(PlayerKind::Ai),
            other => Err(format!("Unknown player kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PlayerKind,
    #[serde(default)]
    pub ai_provider: Option<String>,
    #[serde(default)]
    pub ai_model: Option<String>,
    #[serde(default)]
    pub persona: Option<String>,
    #[serde(default)]
    pub display_order: Option<i64>,
}

impl Player {
    pub fn human(id: PlayerId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            kind: PlayerKind::Human,
            ai_provider: None,
            ai_model: None,
            persona: None,
            display_order: None,
        }
    }

    pub fn ai(id: PlayerId, name: &str, provider: &str, model: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            kind: PlayerKind::Ai,
            ai_provider: Some(provider.to_string()),
            ai_model: Some(model.to_string()),
            persona: None,
            display_order: None,
        }
    }
}

/// Body for both creating and updating a player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerPayload {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PlayerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_model: Option<String>,
    // Always sent, the server strips it unconditionally
    pub persona: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(default)]
    pub speaker_id: Option<PlayerId>,
    pub speaker_name: String,
    #[serde(rename = "speaker_type")]
    pub speaker_kind: PlayerKind,
    pub content: String,
    pub timestamp: String,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub ai_provider: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub player_id: PlayerId,
    pub content: String,
}

#[derive(Clone, Serialize)]
pub struct AiSpeakRequest {
    pub player_id: PlayerId,
    pub api_key: String,
}

// Hand written so the key never ends up in a log line
impl fmt::Debug for AiSpeakRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiSpeakRequest")
            .field("player_id", &self.player_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AiSpeakReply {
    pub message_id: MessageId,
    pub content: String,
    #[serde(default)]
    pub response_time_ms: Option<i64>,
    pub speaker_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatabaseInfo {
    pub exists: bool,
    #[serde(default)]
    pub groups_count: Option<i64>,
    #[serde(default)]
    pub players_count: Option<i64>,
    #[serde(default)]
    pub messages_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerStatus {
    pub database: DatabaseInfo,
}

// Envelope payloads, the `success` flag is checked before these are
// decoded.
#[derive(Deserialize)]
pub(crate) struct GroupsBody {
    pub groups: Vec<Group>,
}

#[derive(Deserialize)]
pub(crate) struct GroupInfoBody {
    pub group: GroupInfo,
}

#[derive(Deserialize)]
pub(crate) struct CreatedGroupBody {
    pub group_id: GroupId,
}

#[derive(Deserialize)]
pub(crate) struct PlayersBody {
    pub players: Vec<Player>,
}

#[derive(Deserialize)]
pub(crate) struct CreatedPlayerBody {
    pub player_id: PlayerId,
}

#[derive(Deserialize)]
pub(crate) struct MessagesBody {
    pub messages: Vec<Message>,
}

#[derive(Deserialize)]
pub(crate) struct CreatedMessageBody {
    pub message_id: MessageId,
}

#[derive(Deserialize)]
pub(crate) struct Acknowledged {}
