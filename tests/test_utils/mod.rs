//! Test utilities for integration tests
#![allow(dead_code)]
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use nexus::credentials::Credentials;
use nexus::gateway::{
    AiSpeakReply, AiSpeakRequest, ConversationApi, DatabaseInfo, GatewayError, Group, GroupId,
    GroupInfo, Message, MessageId, NewGroup, NewMessage, Player, PlayerId, PlayerKind,
    PlayerPayload, ServerStatus,
};
use nexus::session::SessionStore;
use nexus::turn::TurnController;

pub const DEBATE_CLUB: GroupId = 1;
pub const STORY_CIRCLE: GroupId = 2;
pub const ALICE: PlayerId = 1;
pub const GEMINI_BOT: PlayerId = 2;
pub const CLAUDE_BOT: PlayerId = 3;
pub const BOB: PlayerId = 10;

pub fn message(id: MessageId, speaker: &Player, content: &str) -> Message {
    Message {
        id,
        speaker_id: Some(speaker.id),
        speaker_name: speaker.name.clone(),
        speaker_kind: speaker.kind,
        content: content.to_string(),
        timestamp: "2026-10-19 09:30:00".to_string(),
        message_type: Some("normal".to_string()),
        ai_provider: speaker.ai_provider.clone(),
    }
}

#[derive(Default)]
struct FakeState {
    groups: Vec<Group>,
    players: HashMap<GroupId, Vec<Player>>,
    messages: HashMap<GroupId, Vec<Message>>,
    rules: HashMap<GroupId, String>,
    calls: Vec<String>,
    failing: HashSet<&'static str>,
    speak_requests: Vec<(GroupId, PlayerId, String)>,
    next_id: i64,
}

impl FakeState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn group_of_player(&self, player_id: PlayerId) -> Option<GroupId> {
        self.players
            .iter()
            .find(|(_, players)| players.iter().any(|p| p.id == player_id))
            .map(|(group_id, _)| *group_id)
    }
}

/// An in-memory conversation server.
///
/// Every call is recorded by name. Calls scoped to a group wait while
/// that group is held with [`FakeApi::hold`], which lets a test park
/// a request mid-flight and decide when its response arrives.
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
    gates: Mutex<HashMap<GroupId, Arc<RwLock<()>>>>,
    held: Mutex<HashMap<GroupId, OwnedRwLockWriteGuard<()>>>,
}

impl FakeApi {
    pub fn new() -> Self {
        let api = Self::default();
        api.state.lock().unwrap().next_id = 100;
        api
    }

    /// Two groups. "Debate Club" has a human, Alice, and two AI
    /// players. "Story Circle" has only Bob and one message.
    pub fn debate_club() -> Self {
        let api = Self::new();
        let alice = Player::human(ALICE, "Alice");
        let gemini = Player::ai(GEMINI_BOT, "Gemini Bot", "gemini", "gemini-pro");
        let claude = Player::ai(CLAUDE_BOT, "Claude Bot", "claude", "claude-3-haiku");
        let bob = Player::human(BOB, "Bob");
        {
            let mut state = api.state.lock().unwrap();
            state.groups = vec![
                Group::new(DEBATE_CLUB, "Debate Club"),
                Group::new(STORY_CIRCLE, "Story Circle"),
            ];
            state.rules.insert(DEBATE_CLUB, "Take turns arguing".to_string());
            state.rules.insert(STORY_CIRCLE, "One sentence each".to_string());
            state.messages.insert(DEBATE_CLUB, vec![]);
            state
                .messages
                .insert(STORY_CIRCLE, vec![message(50, &bob, "Once upon a time")]);
            state.players.insert(DEBATE_CLUB, vec![alice, gemini, claude]);
            state.players.insert(STORY_CIRCLE, vec![bob]);
        }
        api
    }

    pub fn group(&self, group_id: GroupId) -> Group {
        self.state
            .lock()
            .unwrap()
            .groups
            .iter()
            .find(|g| g.id == group_id)
            .cloned()
            .expect("Unknown group in fixture")
    }

    pub fn remove_players(&self, group_id: GroupId, kind: PlayerKind) {
        let mut state = self.state.lock().unwrap();
        if let Some(players) = state.players.get_mut(&group_id) {
            players.retain(|p| p.kind != kind);
        }
    }

    /// Make every call named `op` fail with a server error.
    pub fn fail(&self, op: &'static str) {
        self.state.lock().unwrap().failing.insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.state.lock().unwrap().failing.remove(op);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == op).count()
    }

    pub fn speak_requests(&self) -> Vec<(GroupId, PlayerId, String)> {
        self.state.lock().unwrap().speak_requests.clone()
    }

    pub fn server_messages(&self, group_id: GroupId) -> Vec<Message> {
        self.state
            .lock()
            .unwrap()
            .messages
            .get(&group_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn server_rules(&self, group_id: GroupId) -> String {
        self.state
            .lock()
            .unwrap()
            .rules
            .get(&group_id)
            .cloned()
            .unwrap_or_default()
    }

    fn gate(&self, group_id: GroupId) -> Arc<RwLock<()>> {
        self.gates
            .lock()
            .unwrap()
            .entry(group_id)
            .or_default()
            .clone()
    }

    /// Park every call for `group_id` until [`FakeApi::release`].
    pub async fn hold(&self, group_id: GroupId) {
        let guard = self.gate(group_id).write_owned().await;
        self.held.lock().unwrap().insert(group_id, guard);
    }

    pub fn release(&self, group_id: GroupId) {
        self.held.lock().unwrap().remove(&group_id);
    }

    async fn enter(&self, op: &'static str, group_id: Option<GroupId>) -> Result<(), GatewayError> {
        self.state.lock().unwrap().calls.push(op.to_string());
        if let Some(group_id) = group_id {
            let gate = self.gate(group_id);
            drop(gate.read().await);
        }
        if self.state.lock().unwrap().failing.contains(op) {
            return Err(GatewayError::Server {
                status: 500,
                message: format!("{} failed", op),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationApi for FakeApi {
    async fn list_groups(&self) -> Result<Vec<Group>, GatewayError> {
        self.enter("list_groups", None).await?;
        Ok(self.state.lock().unwrap().groups.clone())
    }

    async fn create_group(&self, group: &NewGroup) -> Result<GroupId, GatewayError> {
        self.enter("create_group", None).await?;
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let mut created = Group::new(id, &group.name);
        created.description = group.description.clone();
        state.groups.push(created);
        Ok(id)
    }

    async fn delete_group(&self, group_id: GroupId) -> Result<(), GatewayError> {
        self.enter("delete_group", Some(group_id)).await?;
        let mut state = self.state.lock().unwrap();
        state.groups.retain(|g| g.id != group_id);
        state.players.remove(&group_id);
        state.messages.remove(&group_id);
        Ok(())
    }

    async fn group_info(&self, group_id: GroupId) -> Result<GroupInfo, GatewayError> {
        self.enter("group_info", Some(group_id)).await?;
        let state = self.state.lock().unwrap();
        let group = state
            .groups
            .iter()
            .find(|g| g.id == group_id)
            .ok_or(GatewayError::Server {
                status: 404,
                message: "Group not found".to_string(),
            })?;
        Ok(GroupInfo {
            id: group.id,
            name: group.name.clone(),
            description: group.description.clone(),
            rules: state.rules.get(&group_id).cloned().unwrap_or_default(),
            created_at: None,
            player_count: state.players.get(&group_id).map_or(0, |p| p.len() as i64),
            message_count: state.messages.get(&group_id).map_or(0, |m| m.len() as i64),
            last_message: None,
        })
    }

    async fn update_rules(&self, group_id: GroupId, rules: &str) -> Result<(), GatewayError> {
        self.enter("update_rules", Some(group_id)).await?;
        self.state
            .lock()
            .unwrap()
            .rules
            .insert(group_id, rules.to_string());
        Ok(())
    }

    async fn list_players(&self, group_id: GroupId) -> Result<Vec<Player>, GatewayError> {
        self.enter("list_players", Some(group_id)).await?;
        let state = self.state.lock().unwrap();
        Ok(state.players.get(&group_id).cloned().unwrap_or_default())
    }

    async fn add_player(
        &self,
        group_id: GroupId,
        player: &PlayerPayload,
    ) -> Result<PlayerId, GatewayError> {
        self.enter("add_player", Some(group_id)).await?;
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let added = Player {
            id,
            name: player.name.clone(),
            kind: player.kind,
            ai_provider: player.ai_provider.clone(),
            ai_model: player.ai_model.clone(),
            persona: None,
            display_order: None,
        };
        state.players.entry(group_id).or_default().push(added);
        Ok(id)
    }

    async fn update_player(
        &self,
        player_id: PlayerId,
        player: &PlayerPayload,
    ) -> Result<(), GatewayError> {
        self.enter("update_player", None).await?;
        let mut state = self.state.lock().unwrap();
        let found = state
            .players
            .values_mut()
            .flat_map(|players| players.iter_mut())
            .find(|p| p.id == player_id);
        match found {
            Some(existing) => {
                existing.name = player.name.clone();
                existing.kind = player.kind;
                existing.ai_provider = player.ai_provider.clone();
                existing.ai_model = player.ai_model.clone();
                Ok(())
            }
            None => Err(GatewayError::Server {
                status: 404,
                message: "Player not found".to_string(),
            }),
        }
    }

    async fn delete_player(&self, player_id: PlayerId) -> Result<(), GatewayError> {
        self.enter("delete_player", None).await?;
        let mut state = self.state.lock().unwrap();
        if let Some(group_id) = state.group_of_player(player_id)
            && let Some(players) = state.players.get_mut(&group_id)
        {
            players.retain(|p| p.id != player_id);
        }
        Ok(())
    }

    async fn list_messages(
        &self,
        group_id: GroupId,
        limit: Option<u32>,
    ) -> Result<Vec<Message>, GatewayError> {
        self.enter("list_messages", Some(group_id)).await?;
        let state = self.state.lock().unwrap();
        let messages = state.messages.get(&group_id).cloned().unwrap_or_default();
        let skip = limit.map_or(0, |l| messages.len().saturating_sub(l as usize));
        Ok(messages.into_iter().skip(skip).collect())
    }

    async fn post_message(
        &self,
        group_id: GroupId,
        message: &NewMessage,
    ) -> Result<MessageId, GatewayError> {
        self.enter("post_message", Some(group_id)).await?;
        let mut state = self.state.lock().unwrap();
        let speaker = state
            .players
            .get(&group_id)
            .and_then(|players| players.iter().find(|p| p.id == message.player_id))
            .cloned()
            .ok_or(GatewayError::Server {
                status: 404,
                message: "Player not found".to_string(),
            })?;
        let id = state.next_id();
        state
            .messages
            .entry(group_id)
            .or_default()
            .push(self::message(id, &speaker, &message.content));
        Ok(id)
    }

    async fn ai_speak(
        &self,
        group_id: GroupId,
        request: &AiSpeakRequest,
    ) -> Result<AiSpeakReply, GatewayError> {
        self.state.lock().unwrap().speak_requests.push((
            group_id,
            request.player_id,
            request.api_key.clone(),
        ));
        self.enter("ai_speak", Some(group_id)).await?;
        let mut state = self.state.lock().unwrap();
        let speaker = state
            .players
            .get(&group_id)
            .and_then(|players| players.iter().find(|p| p.id == request.player_id))
            .cloned()
            .ok_or(GatewayError::Server {
                status: 404,
                message: "Player not found".to_string(),
            })?;
        let id = state.next_id();
        let content = format!("{} makes a **strong** point", speaker.name);
        state
            .messages
            .entry(group_id)
            .or_default()
            .push(message(id, &speaker, &content));
        Ok(AiSpeakReply {
            message_id: id,
            content,
            response_time_ms: Some(1200),
            speaker_name: speaker.name,
        })
    }

    async fn status(&self) -> Result<ServerStatus, GatewayError> {
        self.enter("status", None).await?;
        let state = self.state.lock().unwrap();
        Ok(ServerStatus {
            database: DatabaseInfo {
                exists: true,
                groups_count: Some(state.groups.len() as i64),
                players_count: Some(state.players.values().map(Vec::len).sum::<usize>() as i64),
                messages_count: Some(state.messages.values().map(Vec::len).sum::<usize>() as i64),
            },
        })
    }
}

pub fn test_store(api: &Arc<FakeApi>) -> SessionStore {
    SessionStore::new(api.clone())
}

/// A controller with keys for every provider, Debate Club selected.
pub async fn debate_club_turn(api: &Arc<FakeApi>) -> TurnController {
    let credentials = Credentials::from_pairs([
        ("gemini", "gemini-key"),
        ("chatGPT", "openai-key"),
        ("claude", "claude-key"),
    ]);
    let turn = TurnController::new(test_store(api), credentials);
    turn.session().refresh_groups().await;
    turn.session().select_group(api.group(DEBATE_CLUB)).await;
    turn
}
