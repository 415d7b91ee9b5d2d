use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::join3;
use thiserror::Error;

use super::templates::find_template;
use crate::gateway::{
    ConversationApi, GatewayError, Group, GroupId, Message, MessageId, NewGroup, NewMessage,
    Player, PlayerId, PlayerKind, PlayerPayload,
};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No group is selected")]
    NoGroupSelected,

    #[error("Group name is required")]
    BlankGroupName,

    #[error("There is no human player in this group")]
    MissingHumanPlayer,

    #[error("Unknown rule template: {0}")]
    UnknownTemplate(String),

    #[error("The rules editor is not open")]
    RulesEditorClosed,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RulesEditor {
    #[default]
    Closed,
    Open {
        buffer: String,
    },
}

/// Identifies one selection of a group. Selecting again, even the
/// same group, produces a new one and makes the old one stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    epoch: u64,
    pub group_id: GroupId,
}

/// Everything the presentation needs to render, cloned out of the
/// store by [`SessionStore::snapshot`].
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub groups: Vec<Group>,
    pub selected: Option<Group>,
    pub players: Vec<Player>,
    pub messages: Vec<Message>,
    pub rules: String,
    pub rules_editor: RulesEditor,
    pub composer: String,
    epoch: u64,
}

impl SessionState {
    pub fn selection(&self) -> Option<Selection> {
        self.selected.as_ref().map(|g| Selection {
            epoch: self.epoch,
            group_id: g.id,
        })
    }

    /// The player user-typed messages are posted as.
    pub fn human_player(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.kind == PlayerKind::Human)
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn player_by_name(&self, name: &str) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
    }

    fn clear_group_data(&mut self) {
        self.players.clear();
        self.messages.clear();
        self.rules.clear();
        self.rules_editor = RulesEditor::Closed;
    }
}

/// Outcome of a read that replaces part of the local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    Applied,
    /// The selection changed while the request was in flight.
    Discarded,
    /// Logged, the previous state was kept.
    Failed,
    NoSelection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank content, nothing was sent.
    Skipped,
    Sent(MessageId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerMutation {
    Create(PlayerPayload),
    Update(PlayerId, PlayerPayload),
    Delete(PlayerId),
}

/// Local view of the selected group.
///
/// State only changes after the server confirmed a request; nothing
/// is applied optimistically. Responses that belong to an earlier
/// selection are dropped instead of applied. No lock is held while
/// a request is in flight.
pub struct SessionStore {
    api: Arc<dyn ConversationApi>,
    message_limit: Option<u32>,
    state: RwLock<SessionState>,
}

impl SessionStore {
    pub fn new(api: Arc<dyn ConversationApi>) -> Self {
        Self {
            api,
            message_limit: None,
            state: RwLock::new(SessionState::default()),
        }
    }

    pub fn with_message_limit(mut self, limit: u32) -> Self {
        self.message_limit = Some(limit);
        self
    }

    pub fn api(&self) -> Arc<dyn ConversationApi> {
        self.api.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SessionState {
        self.read().clone()
    }

    pub fn selection(&self) -> Option<Selection> {
        self.read().selection()
    }

    pub fn group(&self, group_id: GroupId) -> Option<Group> {
        self.read().groups.iter().find(|g| g.id == group_id).cloned()
    }

    pub fn player(&self, player_id: PlayerId) -> Option<Player> {
        self.read().player(player_id).cloned()
    }

    fn apply_if_current(&self, selection: Selection, f: impl FnOnce(&mut SessionState)) -> Refresh {
        let mut state = self.write();
        if state.selection() != Some(selection) {
            tracing::debug!(
                "Discarding response for group {} from a previous selection",
                selection.group_id
            );
            return Refresh::Discarded;
        }
        f(&mut state);
        Refresh::Applied
    }

    pub async fn refresh_groups(&self) -> Refresh {
        match self.api.list_groups().await {
            Ok(groups) => {
                self.write().groups = groups;
                Refresh::Applied
            }
            Err(e) => {
                tracing::warn!("Failed to fetch groups: {}", e);
                Refresh::Failed
            }
        }
    }

    pub async fn create_group(
        &self,
        name: &str,
        description: &str,
    ) -> Result<GroupId, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::BlankGroupName);
        }
        let new_group = NewGroup {
            name: name.to_string(),
            description: description.trim().to_string(),
        };
        let group_id = self.api.create_group(&new_group).await.map_err(|e| {
            tracing::error!("Failed to create group {}: {}", name, e);
            e
        })?;
        tracing::info!("Created group {} ({})", name, group_id);
        self.refresh_groups().await;
        Ok(group_id)
    }

    pub async fn delete_group(&self, group_id: GroupId) -> Result<(), SessionError> {
        self.api.delete_group(group_id).await.map_err(|e| {
            tracing::error!("Failed to delete group {}: {}", group_id, e);
            e
        })?;
        {
            let mut state = self.write();
            if state.selected.as_ref().is_some_and(|g| g.id == group_id) {
                state.epoch += 1;
                state.selected = None;
                state.clear_group_data();
            }
        }
        self.refresh_groups().await;
        Ok(())
    }

    /// Make `group` the selected group and load its players, messages
    /// and rules. The previous group's data is cleared before any
    /// request goes out.
    pub async fn select_group(&self, group: Group) -> Selection {
        let group_id = group.id;
        let selection = {
            let mut state = self.write();
            state.epoch += 1;
            state.selected = Some(group);
            state.clear_group_data();
            Selection {
                epoch: state.epoch,
                group_id,
            }
        };
        tracing::info!("Selected group {}", selection.group_id);

        join3(
            self.refresh_players_for(selection),
            self.refresh_messages_for(selection),
            self.refresh_rules_for(selection),
        )
        .await;
        selection
    }

    pub async fn refresh_players(&self) -> Refresh {
        match self.selection() {
            Some(selection) => self.refresh_players_for(selection).await,
            None => Refresh::NoSelection,
        }
    }

    pub async fn refresh_messages(&self) -> Refresh {
        match self.selection() {
            Some(selection) => self.refresh_messages_for(selection).await,
            None => Refresh::NoSelection,
        }
    }

    pub async fn refresh_rules(&self) -> Refresh {
        match self.selection() {
            Some(selection) => self.refresh_rules_for(selection).await,
            None => Refresh::NoSelection,
        }
    }

    pub async fn refresh_players_for(&self, selection: Selection) -> Refresh {
        match self.api.list_players(selection.group_id).await {
            Ok(players) => self.apply_if_current(selection, |s| s.players = players),
            Err(e) => {
                tracing::warn!(
                    "Failed to fetch players for group {}: {}",
                    selection.group_id,
                    e
                );
                Refresh::Failed
            }
        }
    }

    pub async fn refresh_messages_for(&self, selection: Selection) -> Refresh {
        match self
            .api
            .list_messages(selection.group_id, self.message_limit)
            .await
        {
            Ok(messages) => self.apply_if_current(selection, |s| s.messages = messages),
            Err(e) => {
                tracing::warn!(
                    "Failed to fetch messages for group {}: {}",
                    selection.group_id,
                    e
                );
                Refresh::Failed
            }
        }
    }

    pub async fn refresh_rules_for(&self, selection: Selection) -> Refresh {
        match self.api.group_info(selection.group_id).await {
            Ok(info) => self.apply_if_current(selection, |s| {
                s.rules = info.rules.clone();
                if let Some(group) = s.selected.as_mut() {
                    group.rules = info.rules;
                    group.description = info.description;
                    group.message_count = info.message_count;
                }
            }),
            Err(e) => {
                tracing::warn!(
                    "Failed to fetch rules for group {}: {}",
                    selection.group_id,
                    e
                );
                Refresh::Failed
            }
        }
    }

    /// Create, update or delete a player, then reload the player list.
    pub async fn apply_player_mutation(&self, mutation: PlayerMutation) -> Result<(), SessionError> {
        let selection = self.selection().ok_or(SessionError::NoGroupSelected)?;

        let result = match &mutation {
            PlayerMutation::Create(payload) => self
                .api
                .add_player(selection.group_id, payload)
                .await
                .map(|_| ()),
            PlayerMutation::Update(player_id, payload) => {
                self.api.update_player(*player_id, payload).await
            }
            PlayerMutation::Delete(player_id) => self.api.delete_player(*player_id).await,
        };
        if let Err(e) = result {
            tracing::error!("Player change {:?} failed: {}", mutation, e);
            return Err(e.into());
        }

        self.refresh_players_for(selection).await;
        Ok(())
    }

    pub fn composer(&self) -> String {
        self.read().composer.clone()
    }

    pub fn set_composer(&self, text: &str) {
        self.write().composer = text.to_string();
    }

    pub async fn send_composer(&self) -> Result<SendOutcome, SessionError> {
        let content = self.composer();
        self.apply_message_send(&content).await
    }

    /// Post `content` as the group's human player. Blank content is a
    /// no-op. Whenever the send fails the content is left in the
    /// composer so it can be retried.
    pub async fn apply_message_send(&self, content: &str) -> Result<SendOutcome, SessionError> {
        if content.trim().is_empty() {
            return Ok(SendOutcome::Skipped);
        }

        let (selection, human) = {
            let state = self.read();
            (state.selection(), state.human_player().map(|p| p.id))
        };
        let selection = selection.ok_or(SessionError::NoGroupSelected)?;
        let Some(player_id) = human else {
            self.set_composer(content);
            return Err(SessionError::MissingHumanPlayer);
        };

        let message = NewMessage {
            player_id,
            content: content.to_string(),
        };
        let message_id = match self.api.post_message(selection.group_id, &message).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(
                    "Failed to send message to group {}: {}",
                    selection.group_id,
                    e
                );
                self.set_composer(content);
                return Err(e.into());
            }
        };

        {
            let mut state = self.write();
            if state.composer == content {
                state.composer.clear();
            }
        }
        self.refresh_messages_for(selection).await;
        Ok(SendOutcome::Sent(message_id))
    }

    pub fn open_rules_editor(&self) -> Result<(), SessionError> {
        let mut state = self.write();
        if state.selected.is_none() {
            return Err(SessionError::NoGroupSelected);
        }
        state.rules_editor = RulesEditor::Open {
            buffer: state.rules.clone(),
        };
        Ok(())
    }

    pub fn edit_rules(&self, text: &str) -> Result<(), SessionError> {
        match &mut self.write().rules_editor {
            RulesEditor::Open { buffer } => {
                *buffer = text.to_string();
                Ok(())
            }
            RulesEditor::Closed => Err(SessionError::RulesEditorClosed),
        }
    }

    /// Overwrite the edit buffer with a template. Nothing is sent.
    pub fn apply_rule_template(&self, key: &str) -> Result<(), SessionError> {
        let template =
            find_template(key).ok_or_else(|| SessionError::UnknownTemplate(key.to_string()))?;
        let mut state = self.write();
        if state.selected.is_none() {
            return Err(SessionError::NoGroupSelected);
        }
        state.rules_editor = RulesEditor::Open {
            buffer: template.rules.to_string(),
        };
        Ok(())
    }

    pub fn close_rules_editor(&self) {
        self.write().rules_editor = RulesEditor::Closed;
    }

    /// Submit the open editor's buffer.
    pub async fn save_rules(&self) -> Result<(), SessionError> {
        let buffer = match &self.read().rules_editor {
            RulesEditor::Open { buffer } => buffer.clone(),
            RulesEditor::Closed => return Err(SessionError::RulesEditorClosed),
        };
        self.apply_rules_update(&buffer).await
    }

    /// Replace the group's rules. On success the submitted text
    /// becomes the local rules and the editor closes, on failure the
    /// editor stays open holding the text.
    pub async fn apply_rules_update(&self, text: &str) -> Result<(), SessionError> {
        let selection = self.selection().ok_or(SessionError::NoGroupSelected)?;

        match self.api.update_rules(selection.group_id, text).await {
            Ok(()) => {
                self.apply_if_current(selection, |s| {
                    s.rules = text.to_string();
                    if let Some(group) = s.selected.as_mut() {
                        group.rules = text.to_string();
                    }
                    s.rules_editor = RulesEditor::Closed;
                });
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    "Failed to update rules for group {}: {}",
                    selection.group_id,
                    e
                );
                self.apply_if_current(selection, |s| {
                    s.rules_editor = RulesEditor::Open {
                        buffer: text.to_string(),
                    }
                });
                Err(e.into())
            }
        }
    }
}
