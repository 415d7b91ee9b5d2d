//! Gatekeeping for user actions.
//!
//! Nothing here decides whose turn it is. Every utterance, human or
//! AI, is the result of one explicit user action; the controller
//! only rejects actions that are invalid right now or that would
//! overlap an identical action still in flight.
pub mod form;
pub use form::*;

use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use thiserror::Error;

use crate::credentials::{CredentialError, CredentialStore, Credentials};
use crate::gateway::{AiSpeakReply, AiSpeakRequest, GatewayError, GroupId, PlayerId, PlayerKind};
use crate::session::{PlayerMutation, Selection, SendOutcome, SessionError, SessionStore};

/// A logical action that may only run once at a time per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKey {
    PlayerForm(GroupId),
    SendMessage(GroupId),
    UpdateRules(GroupId),
    AiSpeak(GroupId),
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKey::PlayerForm(id) => write!(f, "Player change in group {}", id),
            ActionKey::SendMessage(id) => write!(f, "Sending a message to group {}", id),
            ActionKey::UpdateRules(id) => write!(f, "Rules update for group {}", id),
            ActionKey::AiSpeak(id) => write!(f, "An AI reply in group {}", id),
        }
    }
}

#[derive(Error, Debug)]
pub enum TurnError {
    #[error("The player form is incomplete")]
    InvalidPlayerForm,

    #[error("The player form is not open")]
    NoPlayerForm,

    #[error("The player form was opened for a group that is no longer selected")]
    StaleForm,

    #[error("Missing credential for provider {0}")]
    MissingCredential(String),

    #[error("{0} is already in progress")]
    InFlight(ActionKey),

    #[error("{0} is not an AI player")]
    NotAnAiPlayer(String),

    #[error("No player with id {0} in this group")]
    UnknownPlayer(PlayerId),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks an action as running until dropped, whether the action
/// succeeded or failed.
struct InFlight<'a> {
    running: &'a Mutex<HashSet<ActionKey>>,
    key: ActionKey,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.running).remove(&self.key);
    }
}

/// The player form together with the selection it was opened under.
#[derive(Default)]
struct OpenForm {
    state: FormState,
    selection: Option<Selection>,
}

/// Owns the session and validates and serializes every user action
/// against it.
pub struct TurnController {
    session: SessionStore,
    credentials: RwLock<Credentials>,
    form: RwLock<OpenForm>,
    running: Mutex<HashSet<ActionKey>>,
}

impl TurnController {
    pub fn new(session: SessionStore, credentials: Credentials) -> Self {
        Self {
            session,
            credentials: RwLock::new(credentials),
            form: RwLock::new(OpenForm::default()),
            running: Mutex::new(HashSet::new()),
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn credentials(&self) -> Credentials {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Persist new keys and, only once they are saved, start using
    /// them. On failure the old keys stay active.
    pub fn save_credentials(
        &self,
        store: &CredentialStore,
        credentials: Credentials,
    ) -> Result<(), CredentialError> {
        store.save(&credentials)?;
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = credentials;
        Ok(())
    }

    pub fn is_in_flight(&self, key: ActionKey) -> bool {
        lock(&self.running).contains(&key)
    }

    fn begin(&self, key: ActionKey) -> Result<InFlight<'_>, TurnError> {
        if !lock(&self.running).insert(key) {
            tracing::debug!("Rejected {}: already running", key);
            return Err(TurnError::InFlight(key));
        }
        Ok(InFlight {
            running: &self.running,
            key,
        })
    }

    fn selected_group(&self) -> Result<GroupId, TurnError> {
        self.session
            .selection()
            .map(|s| s.group_id)
            .ok_or(TurnError::Session(SessionError::NoGroupSelected))
    }

    fn speak_credential(&self, player_id: PlayerId) -> Result<String, TurnError> {
        let player = self
            .session
            .player(player_id)
            .ok_or(TurnError::UnknownPlayer(player_id))?;
        if player.kind != PlayerKind::Ai {
            return Err(TurnError::NotAnAiPlayer(player.name));
        }
        let provider = player.ai_provider.unwrap_or_default();
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&provider)
            .map(str::to_string)
            .ok_or(TurnError::MissingCredential(provider))
    }

    /// Whether [`Self::ai_speak`] would be dispatched for `player_id`
    /// right now.
    pub fn check_ai_speak(&self, player_id: PlayerId) -> Result<(), TurnError> {
        let group_id = self.selected_group()?;
        self.speak_credential(player_id)?;
        let key = ActionKey::AiSpeak(group_id);
        if self.is_in_flight(key) {
            return Err(TurnError::InFlight(key));
        }
        Ok(())
    }

    /// Ask the server to generate one utterance for an AI player.
    ///
    /// Only one request per group runs at a time; a second trigger
    /// while one is outstanding is rejected, not queued.
    pub async fn ai_speak(&self, player_id: PlayerId) -> Result<AiSpeakReply, TurnError> {
        let selection = self
            .session
            .selection()
            .ok_or(SessionError::NoGroupSelected)?;
        let api_key = match self.speak_credential(player_id) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("Not asking player {} to speak: {}", player_id, e);
                return Err(e);
            }
        };
        let _running = self.begin(ActionKey::AiSpeak(selection.group_id))?;

        let request = AiSpeakRequest { player_id, api_key };
        let reply = self
            .session
            .api()
            .ai_speak(selection.group_id, &request)
            .await
            .map_err(|e| {
                tracing::error!("AI reply in group {} failed: {}", selection.group_id, e);
                e
            })?;
        tracing::info!(
            "{} replied in group {} after {:?}ms",
            reply.speaker_name,
            selection.group_id,
            reply.response_time_ms
        );

        // Dropped by the store if the user moved to another group meanwhile
        self.session.refresh_messages_for(selection).await;
        Ok(reply)
    }

    pub async fn send_message(&self, content: &str) -> Result<SendOutcome, TurnError> {
        if content.trim().is_empty() {
            return Ok(SendOutcome::Skipped);
        }
        let _running = self.begin(ActionKey::SendMessage(self.selected_group()?))?;
        Ok(self.session.apply_message_send(content).await?)
    }

    pub async fn send_composer(&self) -> Result<SendOutcome, TurnError> {
        let content = self.session.composer();
        self.send_message(&content).await
    }

    pub async fn update_rules(&self, text: &str) -> Result<(), TurnError> {
        let _running = self.begin(ActionKey::UpdateRules(self.selected_group()?))?;
        Ok(self.session.apply_rules_update(text).await?)
    }

    pub async fn save_rules(&self) -> Result<(), TurnError> {
        let _running = self.begin(ActionKey::UpdateRules(self.selected_group()?))?;
        Ok(self.session.save_rules().await?)
    }

    /// The open form, or `Closed` once the group it was opened for is
    /// no longer selected.
    pub fn player_form(&self) -> FormState {
        let form = self.form.read().unwrap_or_else(PoisonError::into_inner);
        if form.selection != self.session.selection() {
            return FormState::Closed;
        }
        form.state.clone()
    }

    fn set_form(&self, state: FormState) {
        *self.form.write().unwrap_or_else(PoisonError::into_inner) = OpenForm {
            state,
            selection: self.session.selection(),
        };
    }

    pub fn start_add_player(&self) {
        self.set_form(FormState::Adding(PlayerDraft::new()));
    }

    pub fn start_edit_player(&self, player_id: PlayerId) -> Result<(), TurnError> {
        let player = self
            .session
            .player(player_id)
            .ok_or(TurnError::UnknownPlayer(player_id))?;
        self.set_form(FormState::Editing(
            player_id,
            PlayerDraft::from_player(&player),
        ));
        Ok(())
    }

    /// Apply one field change and report whether the form can be
    /// submitted now.
    pub fn edit_player_form(&self, edit: FormEdit) -> Result<bool, TurnError> {
        let mut form = self.form.write().unwrap_or_else(PoisonError::into_inner);
        if form.selection != self.session.selection() {
            return Err(TurnError::StaleForm);
        }
        let draft = form.state.draft_mut().ok_or(TurnError::NoPlayerForm)?;
        draft.apply(edit);
        Ok(draft.is_submittable())
    }

    /// Send the open form. It closes on success and stays as it was
    /// on failure. A form opened under another selection is closed
    /// without sending anything.
    pub async fn submit_player_form(&self) -> Result<(), TurnError> {
        let (state, selection) = {
            let form = self.form.read().unwrap_or_else(PoisonError::into_inner);
            (form.state.clone(), form.selection)
        };
        if selection != self.session.selection() {
            tracing::warn!("Discarding player form opened for another group");
            self.set_form(FormState::Closed);
            return Err(TurnError::StaleForm);
        }
        let mutation = match state {
            FormState::Closed => return Err(TurnError::NoPlayerForm),
            FormState::Adding(draft) => {
                PlayerMutation::Create(draft.to_payload().ok_or(TurnError::InvalidPlayerForm)?)
            }
            FormState::Editing(player_id, draft) => PlayerMutation::Update(
                player_id,
                draft.to_payload().ok_or(TurnError::InvalidPlayerForm)?,
            ),
        };
        let _running = self.begin(ActionKey::PlayerForm(self.selected_group()?))?;
        self.session.apply_player_mutation(mutation).await?;
        self.set_form(FormState::Closed);
        Ok(())
    }

    pub async fn delete_player(&self, player_id: PlayerId) -> Result<(), TurnError> {
        let _running = self.begin(ActionKey::PlayerForm(self.selected_group()?))?;
        self.session
            .apply_player_mutation(PlayerMutation::Delete(player_id))
            .await?;
        Ok(())
    }
}
