use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use super::open_group;
use crate::core::AppConfig;
use crate::credentials::CredentialStore;
use crate::gateway::{GroupId, Message, MessageId, PlayerKind};
use crate::render::message_lines;
use crate::scroll::{AttentionState, ListenerBinding, ScrollEffect, ScrollTracker};
use crate::session::{RulesEditor, SendOutcome};
use crate::turn::TurnController;

const HELP: &str = "Type a message to send it as the human player.
  /speak NAME        ask an AI player to reply
  /players           list players
  /rules             show the group's rules and any draft
  /rules set TEXT    replace the rules
  /template KEY      start a rules draft from a template
  /rules edit TEXT   replace the draft text
  /rules save        store the draft as the group's rules
  /rules cancel      throw the draft away
  /key PROVIDER KEY  store an API key
  /retry             resend the last message that failed
  /refresh           reload players, messages and rules
  /up N, /down N     scroll the transcript
  /latest            jump back to the newest messages
  /rows N            change the transcript height
  /quit";

/// The transcript as a window of terminal rows over every rendered
/// message line. Methods return the lines to print.
struct TranscriptView {
    tracker: ScrollTracker,
    listener: ListenerBinding,
    lines: Vec<String>,
    last_seen: Option<MessageId>,
    last_shown: Option<MessageId>,
}

impl TranscriptView {
    fn new(rows: usize, group_id: GroupId) -> Self {
        let mut tracker = ScrollTracker::new(rows as f32);
        let listener = tracker.bind(group_id);
        Self {
            tracker,
            listener,
            lines: vec![],
            last_seen: None,
            last_shown: None,
        }
    }

    fn update(&mut self, messages: &[Message], force_follow: bool) -> Vec<String> {
        let arrived = messages
            .iter()
            .filter(|m| self.last_seen.is_none_or(|id| m.id > id))
            .count();
        self.last_seen = messages.last().map(|m| m.id).or(self.last_seen);
        self.lines = messages.iter().flat_map(message_lines).collect();

        match self
            .tracker
            .on_messages_changed(self.lines.len() as f32, arrived, force_follow)
        {
            ScrollEffect::ScrollToEnd { .. } => self.show_new(messages),
            ScrollEffect::Hold if arrived > 0 => vec![format!(
                "-- {} new message(s) below, /latest to catch up --",
                self.tracker.unseen()
            )],
            ScrollEffect::Hold => vec![],
        }
    }

    fn show_new(&mut self, messages: &[Message]) -> Vec<String> {
        let out = messages
            .iter()
            .filter(|m| self.last_shown.is_none_or(|id| m.id > id))
            .flat_map(message_lines)
            .collect();
        self.mark_shown(messages);
        out
    }

    fn mark_shown(&mut self, messages: &[Message]) {
        self.last_shown = messages.last().map(|m| m.id).or(self.last_shown);
    }

    /// Print the window after a move. Landing on the tail counts as
    /// having shown everything up to the newest message.
    fn after_move(&mut self, messages: &[Message]) -> Vec<String> {
        let mut out = self.window();
        match self.tracker.state() {
            AttentionState::Following => self.mark_shown(messages),
            AttentionState::Reading => {
                out.push("-- reading history, /latest to follow new messages --".to_string())
            }
        }
        out
    }

    fn scroll_by(&mut self, rows: f32, messages: &[Message]) -> Vec<String> {
        let viewport = self.tracker.viewport();
        let viewport = viewport.scrolled_to(viewport.scroll_top + rows);
        self.tracker.on_scroll(self.listener, viewport);
        self.after_move(messages)
    }

    fn jump_to_latest(&mut self, messages: &[Message]) -> Vec<String> {
        self.tracker.jump_to_latest();
        self.after_move(messages)
    }

    fn resize(&mut self, rows: usize, messages: &[Message]) -> Vec<String> {
        self.tracker.set_client_height(rows as f32);
        self.after_move(messages)
    }

    fn window(&self) -> Vec<String> {
        let viewport = self.tracker.viewport();
        let top = viewport.scroll_top as usize;
        let bottom = (top + viewport.client_height as usize).min(self.lines.len());
        self.lines[top.min(bottom)..bottom].to_vec()
    }

    fn close(&mut self) {
        self.tracker.unbind();
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

fn print_players(turn: &TurnController) {
    for player in turn.session().snapshot().players {
        match player.kind {
            PlayerKind::Human => println!("  {} (human)", player.name),
            PlayerKind::Ai => {
                let ready = match turn.check_ai_speak(player.id) {
                    Ok(()) => String::from("ready"),
                    Err(e) => e.to_string(),
                };
                println!(
                    "  {} ({}/{}): {}",
                    player.name,
                    player.ai_provider.as_deref().unwrap_or("?"),
                    player.ai_model.as_deref().unwrap_or("?"),
                    ready
                );
            }
        }
    }
}

fn print_rules(turn: &TurnController) {
    let state = turn.session().snapshot();
    if state.rules.trim().is_empty() {
        println!("This group has no rules");
    } else {
        println!("{}", state.rules.trim());
    }
    if let RulesEditor::Open { buffer } = state.rules_editor {
        println!("\nDraft (/rules save to apply, /rules cancel to drop):\n{}", buffer.trim());
    }
}

/// `/rules` and its subcommands. Only `set` and `save` write to the
/// server, drafts stay local.
async fn handle_rules(turn: &TurnController, rest: &str) {
    let session = turn.session();
    let (sub, text) = rest
        .split_once(' ')
        .map(|(s, t)| (s, t.trim()))
        .unwrap_or((rest, ""));

    match sub {
        "" => print_rules(turn),
        "set" => match turn.update_rules(text).await {
            Ok(()) => println!("Rules updated"),
            Err(e) => println!("Rules not updated: {}", e),
        },
        "edit" => {
            let draft_open = matches!(session.snapshot().rules_editor, RulesEditor::Open { .. });
            let result = if draft_open {
                session.edit_rules(text)
            } else {
                session.open_rules_editor().and_then(|_| session.edit_rules(text))
            };
            match result {
                Ok(()) => println!("Draft updated, /rules save to apply"),
                Err(e) => println!("Draft not changed: {}", e),
            }
        }
        "save" => match turn.save_rules().await {
            Ok(()) => println!("Rules updated"),
            Err(e) => println!("Rules not updated: {}", e),
        },
        "cancel" => {
            session.close_rules_editor();
            println!("Draft discarded");
        }
        _ => println!("Usage: /rules [set TEXT | edit TEXT | save | cancel]"),
    }
}

/// Handle one input line, returns false to end the session.
async fn handle_line(
    turn: &TurnController,
    view: &mut TranscriptView,
    credential_store: &CredentialStore,
    line: &str,
) -> bool {
    let session = turn.session();
    let (command, rest) = line
        .split_once(' ')
        .map(|(c, r)| (c, r.trim()))
        .unwrap_or((line, ""));

    match command {
        "/quit" | "/exit" => return false,
        "/help" => println!("{}", HELP),
        "/players" => print_players(turn),
        "/speak" => {
            let Some(player) = session.snapshot().player_by_name(rest).cloned() else {
                println!("No player named {}", rest);
                return true;
            };
            println!("({} is thinking...)", player.name);
            match turn.ai_speak(player.id).await {
                Ok(_) => print_lines(view.update(&session.snapshot().messages, false)),
                Err(e) => println!("{} could not speak: {}", player.name, e),
            }
        }
        "/rules" => handle_rules(turn, rest).await,
        "/template" => match session.apply_rule_template(rest) {
            Ok(()) => {
                print_rules(turn);
                println!("Change it with /rules edit TEXT");
            }
            Err(e) => println!("{}, see `nexus templates`", e),
        },
        "/key" => {
            let Some((provider, key)) = rest.split_once(' ') else {
                println!("Usage: /key PROVIDER KEY");
                return true;
            };
            let mut creds = turn.credentials();
            if !creds.set(provider, key) {
                println!("Unknown provider {}", provider);
                return true;
            }
            match turn.save_credentials(credential_store, creds) {
                Ok(()) => println!("Saved key for {}", provider),
                Err(e) => println!("Key not saved: {}", e),
            }
        }
        "/retry" => match turn.send_composer().await {
            Ok(SendOutcome::Sent(_)) => {
                print_lines(view.update(&session.snapshot().messages, true))
            }
            Ok(SendOutcome::Skipped) => println!("Nothing to resend"),
            Err(e) => println!("Not sent: {}", e),
        },
        "/refresh" => {
            session.refresh_players().await;
            session.refresh_rules().await;
            session.refresh_messages().await;
            print_lines(view.update(&session.snapshot().messages, false));
        }
        "/up" | "/down" => {
            let rows: f32 = rest.parse().unwrap_or(5.0);
            let rows = if command == "/up" { -rows } else { rows };
            print_lines(view.scroll_by(rows, &session.snapshot().messages));
        }
        "/latest" => print_lines(view.jump_to_latest(&session.snapshot().messages)),
        "/rows" => match rest.parse::<usize>() {
            Ok(rows) if rows > 0 => {
                print_lines(view.resize(rows, &session.snapshot().messages))
            }
            _ => println!("Usage: /rows N"),
        },
        _ if command.starts_with('/') => println!("Unknown command {}, try /help", command),
        _ => match turn.send_message(line).await {
            Ok(SendOutcome::Sent(_)) => {
                print_lines(view.update(&session.snapshot().messages, true))
            }
            Ok(SendOutcome::Skipped) => {}
            Err(e) => println!("Not sent: {} (use /retry to resend)", e),
        },
    }
    true
}

pub async fn run(config: &AppConfig, group_id: GroupId) -> Result<()> {
    let turn = open_group(config, group_id).await?;
    let credential_store = CredentialStore::new(&config.credentials_path);

    let state = turn.session().snapshot();
    if let Some(group) = &state.selected {
        println!("== {} ==", group.name);
    }
    let mut view = TranscriptView::new(config.viewport_rows, group_id);
    print_lines(view.update(&state.messages, false));
    println!("(/help for commands)");

    let mut rl = DefaultEditor::new()?;
    loop {
        let prompt = match view.tracker.state() {
            AttentionState::Following => ">>> ",
            AttentionState::Reading => "(reading) >>> ",
        };
        match rl.readline(prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                if !handle_line(&turn, &mut view, &credential_store, line.trim()).await {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    view.close();
    Ok(())
}
