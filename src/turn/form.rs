//! The add/edit player form.
use crate::gateway::{Player, PlayerId, PlayerKind, PlayerPayload};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerDraft {
    pub name: String,
    pub kind: Option<PlayerKind>,
    pub ai_provider: Option<String>,
    pub ai_model: Option<String>,
    pub persona: String,
}

/// A single field change on the form.
#[derive(Debug, Clone, PartialEq)]
pub enum FormEdit {
    Name(String),
    Kind(PlayerKind),
    Provider(String),
    Model(String),
    Persona(String),
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl PlayerDraft {
    /// A fresh draft for adding a player, defaulting to a human.
    pub fn new() -> Self {
        Self {
            kind: Some(PlayerKind::Human),
            ..Default::default()
        }
    }

    pub fn from_player(player: &Player) -> Self {
        Self {
            name: player.name.clone(),
            kind: Some(player.kind),
            ai_provider: player.ai_provider.as_deref().and_then(non_blank),
            ai_model: player.ai_model.as_deref().and_then(non_blank),
            persona: player.persona.clone().unwrap_or_default(),
        }
    }

    pub fn apply(&mut self, edit: FormEdit) {
        match edit {
            FormEdit::Name(name) => self.name = name,
            FormEdit::Kind(kind) => {
                self.kind = Some(kind);
                if kind == PlayerKind::Human {
                    self.ai_provider = None;
                    self.ai_model = None;
                }
            }
            FormEdit::Provider(provider) => {
                let provider = non_blank(&provider);
                // Models are per provider
                if provider != self.ai_provider {
                    self.ai_model = None;
                }
                self.ai_provider = provider;
            }
            FormEdit::Model(model) => self.ai_model = non_blank(&model),
            FormEdit::Persona(persona) => self.persona = persona,
        }
    }

    pub fn is_submittable(&self) -> bool {
        if self.name.trim().is_empty() {
            return false;
        }
        match self.kind {
            None => false,
            Some(PlayerKind::Human) => true,
            Some(PlayerKind::Ai) => self.ai_provider.is_some() && self.ai_model.is_some(),
        }
    }

    /// The request body, only for a submittable draft.
    pub fn to_payload(&self) -> Option<PlayerPayload> {
        if !self.is_submittable() {
            return None;
        }
        let kind = self.kind?;
        let (ai_provider, ai_model) = match kind {
            PlayerKind::Human => (None, None),
            PlayerKind::Ai => (self.ai_provider.clone(), self.ai_model.clone()),
        };
        Some(PlayerPayload {
            name: self.name.trim().to_string(),
            kind,
            ai_provider,
            ai_model,
            persona: self.persona.trim().to_string(),
        })
    }
}

/// Whether the player form is open, and for which purpose. An edit
/// draft can't carry over into a later add because each variant
/// owns its own draft.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FormState {
    #[default]
    Closed,
    Adding(PlayerDraft),
    Editing(PlayerId, PlayerDraft),
}

impl FormState {
    pub fn draft(&self) -> Option<&PlayerDraft> {
        match self {
            FormState::Closed => None,
            FormState::Adding(draft) | FormState::Editing(_, draft) => Some(draft),
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut PlayerDraft> {
        match self {
            FormState::Closed => None,
            FormState::Adding(draft) | FormState::Editing(_, draft) => Some(draft),
        }
    }

    pub fn is_submittable(&self) -> bool {
        self.draft().is_some_and(PlayerDraft::is_submittable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, kind: Option<PlayerKind>, provider: &str, model: &str) -> PlayerDraft {
        let mut draft = PlayerDraft {
            name: name.to_string(),
            kind,
            ..Default::default()
        };
        draft.ai_provider = non_blank(provider);
        draft.ai_model = non_blank(model);
        draft
    }

    #[test]
    fn it_validates_the_form() {
        use PlayerKind::*;
        let cases = [
            (draft("Alice", Some(Human), "", ""), true),
            (draft("  ", Some(Human), "", ""), false),
            (draft("Alice", None, "", ""), false),
            (draft("Gem", Some(Ai), "gemini", "gemini-2.0-flash"), true),
            (draft("Gem", Some(Ai), "gemini", ""), false),
            (draft("Gem", Some(Ai), "", "gemini-2.0-flash"), false),
            (draft("", Some(Ai), "gemini", "gemini-2.0-flash"), false),
        ];
        for (draft, expected) in cases {
            assert_eq!(draft.is_submittable(), expected, "{:?}", draft);
            assert_eq!(draft.to_payload().is_some(), expected);
        }
    }

    #[test]
    fn it_revalidates_on_every_edit() {
        let mut draft = PlayerDraft::new();
        assert!(!draft.is_submittable());

        draft.apply(FormEdit::Name(String::from("Gem")));
        assert!(draft.is_submittable());

        draft.apply(FormEdit::Kind(PlayerKind::Ai));
        assert!(!draft.is_submittable());
        draft.apply(FormEdit::Provider(String::from("gemini")));
        assert!(!draft.is_submittable());
        draft.apply(FormEdit::Model(String::from("gemini-2.0-flash")));
        assert!(draft.is_submittable());

        draft.apply(FormEdit::Provider(String::from("claude")));
        assert_eq!(draft.ai_model, None);
        assert!(!draft.is_submittable());
    }

    #[test]
    fn it_drops_ai_fields_for_humans() {
        let mut draft = draft("Gem", Some(PlayerKind::Ai), "gemini", "gemini-2.0-flash");
        draft.apply(FormEdit::Kind(PlayerKind::Human));
        assert_eq!(draft.ai_provider, None);
        assert_eq!(draft.ai_model, None);

        let payload = draft.to_payload().unwrap();
        assert_eq!(payload.kind, PlayerKind::Human);
        assert_eq!(payload.ai_provider, None);
    }

    #[test]
    fn it_seeds_edits_from_the_player() {
        let mut player = Player::ai(2, "Gem", "gemini", "gemini-2.0-flash");
        player.persona = Some(String::from("A cheerful skeptic"));

        let draft = PlayerDraft::from_player(&player);
        assert!(draft.is_submittable());
        assert_eq!(draft.persona, "A cheerful skeptic");
    }

    #[test]
    fn test_closed_form_is_never_submittable() {
        assert!(!FormState::Closed.is_submittable());
        assert!(FormState::Closed.draft().is_none());
    }
}
