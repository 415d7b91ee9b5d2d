use anyhow::{Result, bail};

use super::open_group;
use crate::core::AppConfig;
use crate::gateway::{GroupId, PlayerId, PlayerKind};
use crate::turn::{FormEdit, TurnController};

/// Player fields given on the command line.
pub struct PlayerFields {
    pub name: Option<String>,
    pub kind: Option<PlayerKind>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub persona: Option<String>,
}

impl PlayerFields {
    // Kind and provider go first since changing them resets the
    // fields that depend on them.
    fn edits(self) -> Vec<FormEdit> {
        let mut edits = vec![];
        if let Some(kind) = self.kind {
            edits.push(FormEdit::Kind(kind));
        }
        if let Some(provider) = self.provider {
            edits.push(FormEdit::Provider(provider));
        }
        if let Some(model) = self.model {
            edits.push(FormEdit::Model(model));
        }
        if let Some(name) = self.name {
            edits.push(FormEdit::Name(name));
        }
        if let Some(persona) = self.persona {
            edits.push(FormEdit::Persona(persona));
        }
        edits
    }
}

async fn submit(turn: &TurnController, fields: PlayerFields) -> Result<()> {
    for edit in fields.edits() {
        turn.edit_player_form(edit)?;
    }
    if !turn.player_form().is_submittable() {
        bail!("A player needs a name, and AI players also need --provider and --model");
    }
    turn.submit_player_form().await?;
    Ok(())
}

pub async fn list(config: &AppConfig, group_id: GroupId) -> Result<()> {
    let turn = open_group(config, group_id).await?;
    let state = turn.session().snapshot();
    if state.players.is_empty() {
        println!("No players in this group yet");
    }
    for player in state.players {
        match player.kind {
            PlayerKind::Human => println!("{:>4}  {} (human)", player.id, player.name),
            PlayerKind::Ai => println!(
                "{:>4}  {} (ai: {} / {})",
                player.id,
                player.name,
                player.ai_provider.as_deref().unwrap_or("?"),
                player.ai_model.as_deref().unwrap_or("?")
            ),
        }
        if let Some(persona) = player.persona.filter(|p| !p.is_empty()) {
            println!("      {}", persona);
        }
    }
    Ok(())
}

pub async fn add(config: &AppConfig, group_id: GroupId, fields: PlayerFields) -> Result<()> {
    let turn = open_group(config, group_id).await?;
    turn.start_add_player();
    submit(&turn, fields).await?;
    println!("Player added");
    Ok(())
}

pub async fn edit(
    config: &AppConfig,
    group_id: GroupId,
    player_id: PlayerId,
    fields: PlayerFields,
) -> Result<()> {
    let turn = open_group(config, group_id).await?;
    turn.start_edit_player(player_id)?;
    submit(&turn, fields).await?;
    println!("Player {} updated", player_id);
    Ok(())
}

pub async fn remove(config: &AppConfig, group_id: GroupId, player_id: PlayerId) -> Result<()> {
    let turn = open_group(config, group_id).await?;
    if turn.session().player(player_id).is_none() {
        bail!("No player with id {} in group {}", player_id, group_id);
    }
    turn.delete_player(player_id).await?;
    println!("Player {} removed", player_id);
    Ok(())
}
