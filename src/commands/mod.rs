/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three top-level command modules:

- `chat`     — Interactive document Q&A session
- `analyze`  — One-shot analysis of a document set
- `compare`  — One-shot comparison of two document sets

The handlers are thin: they wire the library components (gateway,
session store, controller, notifier) to the terminal.
*/

use crate::config::Config;
use crate::conversation::Confirmer;
use crate::error::Result;
use crate::gateway::HttpGateway;
use crate::notify::{Notification, RenderSink, Severity};
use crate::types::{AnswerState, SessionId, TranscriptEntry};
use colored::Colorize;
use std::sync::{Arc, Mutex};

// Special commands parser for session management
pub mod special_commands;

/// Render sink writing to the terminal.
///
/// A terminal cannot take back what it printed, so the sink remembers the
/// last transcript it rendered and prints only what changed since then.
#[derive(Debug, Default)]
pub struct TerminalSink {
    printed: Mutex<Vec<TranscriptEntry>>,
    session: Mutex<Option<SessionId>>,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transcript entries currently on screen
    pub fn printed_len(&self) -> usize {
        lock(&self.printed).len()
    }
}

impl RenderSink for TerminalSink {
    fn show_notification(&self, notification: &Notification) {
        let line = match notification.severity {
            Severity::Success => notification.message.green(),
            Severity::Error => notification.message.red(),
            Severity::Warning => notification.message.yellow(),
            Severity::Info => notification.message.cyan(),
        };
        eprintln!("{}", line);
    }

    fn hide_notification(&self) {}

    fn render_session(&self, session: Option<SessionId>) {
        let mut shown = lock(&self.session);
        if *shown == session {
            return;
        }
        match &session {
            Some(id) => println!("{}", format!("Session {}", id).bright_black()),
            None => println!("{}", "No active session".bright_black()),
        }
        *shown = session;
    }

    fn render_transcript(&self, transcript: &[TranscriptEntry]) {
        let mut printed = lock(&self.printed);
        let start = transcript_changes(&printed, transcript);
        if start < printed.len() && transcript.is_empty() {
            println!("{}", "(conversation cleared)".bright_black());
        }
        for (index, entry) in transcript.iter().enumerate().skip(start) {
            let question_shown = matches!(
                (printed.get(index), entry),
                (
                    Some(TranscriptEntry::Turn { question: shown, answer: AnswerState::Pending }),
                    TranscriptEntry::Turn { question, .. },
                ) if shown == question
            );
            print_entry(entry, question_shown);
        }
        *printed = transcript.to_vec();
    }
}

/// Index of the first entry of `next` that is not already on screen
fn transcript_changes(printed: &[TranscriptEntry], next: &[TranscriptEntry]) -> usize {
    printed
        .iter()
        .zip(next)
        .take_while(|(a, b)| a == b)
        .count()
}

/// Print one transcript entry; `question_shown` skips a question already
/// echoed while its answer was pending.
fn print_entry(entry: &TranscriptEntry, question_shown: bool) {
    match entry {
        TranscriptEntry::Upload { filenames } => {
            println!("{}", format!("Uploaded: {}", filenames.join(", ")).cyan());
        }
        TranscriptEntry::Turn { question, answer } => {
            if !question_shown {
                println!("{} {}", "You:".bold(), question);
            }
            match answer {
                AnswerState::Pending => println!("{}", "Thinking...".bright_black()),
                AnswerState::Answered(text) => println!("\n{}\n", text),
                AnswerState::Failed(apology) => println!("\n{}\n", apology.red()),
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Confirmer reading a y/N answer from standard input
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirmer;

#[async_trait::async_trait]
impl Confirmer for StdinConfirmer {
    async fn confirm(&self, prompt: &str) -> bool {
        let prompt = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            use std::io::Write;
            print!("{} [y/N] ", prompt);
            let _ = std::io::stdout().flush();
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => is_yes(&line),
            _ => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn build_gateway(config: &Config) -> Result<Arc<HttpGateway>> {
    Ok(Arc::new(HttpGateway::from_config(&config.server)?))
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Recovers the server-side session, optionally uploads documents, and
    //! runs a readline loop that sends each line as a question. Special
    //! commands manage the session. Leaving the loop fires the unload hook.

    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::*;
    use crate::conversation::ConversationController;
    use crate::notify::Notifier;
    use crate::session::SessionStore;
    use crate::upload::FileSelection;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use std::path::PathBuf;
    use std::time::Duration;

    /// How long shutdown waits for the best-effort end-of-session call
    const UNLOAD_GRACE: Duration = Duration::from_secs(2);

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `upload` - Files to upload before the first question
    pub async fn run_chat(config: Config, upload: Vec<PathBuf>) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let gateway = build_gateway(&config)?;
        let sink = Arc::new(TerminalSink::new());
        let notifier = Notifier::new(sink, config.notifications.dismiss_after());
        let mut controller = ConversationController::new(
            gateway,
            SessionStore::new(),
            notifier,
            config.upload.clone(),
        );
        let unload = controller.unload_hook();

        print_welcome_banner(&config.server.base_url);
        controller.recover_session().await;

        if !upload.is_empty() {
            upload_files(&mut controller, &upload).await;
        }

        let mut rl = DefaultEditor::new()?;

        loop {
            match rl.readline("docportal> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(trimmed);

                    let command = match parse_special_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{}", e.to_string().yellow());
                            continue;
                        }
                    };

                    match command {
                        SpecialCommand::Upload(paths) => {
                            upload_files(&mut controller, &paths).await;
                        }
                        SpecialCommand::History => print_history(&controller),
                        SpecialCommand::ShowSession => match controller.session() {
                            Some(id) => println!("Session: {}", id),
                            None => println!("No active session. Use /upload to start one."),
                        },
                        SpecialCommand::EndSession => {
                            let _ = controller.end_session().await;
                        }
                        SpecialCommand::ClearSession => {
                            let _ = controller.clear_session(&StdinConfirmer).await;
                        }
                        SpecialCommand::Help => print_help(),
                        SpecialCommand::Exit => break,
                        SpecialCommand::None => {
                            // Failures are already shown through the notifier
                            if let Err(e) = controller.submit_turn(trimmed).await {
                                tracing::debug!(error = %e, "Turn failed");
                            }
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        if let Some(handle) = unload.fire() {
            if tokio::time::timeout(UNLOAD_GRACE, handle).await.is_err() {
                tracing::debug!("End-of-session call still pending at exit");
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    async fn upload_files(controller: &mut ConversationController, paths: &[PathBuf]) {
        let selection = match FileSelection::from_paths(paths) {
            Ok(selection) => selection,
            Err(e) => {
                controller
                    .notifier()
                    .notify(format!("Could not read file: {}", e), Severity::Error);
                return;
            }
        };
        if let Err(e) = controller.upload(&selection).await {
            tracing::debug!(error = %e, "Upload failed");
        }
    }

    fn print_history(controller: &ConversationController) {
        let transcript = controller.transcript();
        if transcript.is_empty() {
            println!("{}", "No conversation yet.".bright_black());
            return;
        }
        for entry in &transcript {
            print_entry(entry, false);
        }
    }

    /// Display welcome banner at the start of interactive chat mode
    fn print_welcome_banner(base_url: &str) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║            Docportal Document Q&A - Welcome!                 ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Server: {}", base_url.cyan());
        println!("Type '/upload <file>' to add documents, '/help' for commands, 'exit' to quit\n");
    }
}

// Analyze command handler
pub mod analyze {
    //! One-shot document analysis.

    use super::*;
    use crate::documents::DocumentService;
    use crate::upload::FileSelection;
    use std::path::PathBuf;

    /// Analyze `files` and print the result
    pub async fn run_analyze(config: Config, files: Vec<PathBuf>, json: bool) -> Result<()> {
        let selection = FileSelection::from_paths(&files)?;
        let service = DocumentService::new(build_gateway(&config)?, config.upload.clone());

        let analysis = service.analyze(&selection).await?;
        print_result(&analysis, json)
    }
}

// Compare command handler
pub mod compare {
    //! One-shot comparison of two document sets.

    use super::*;
    use crate::documents::DocumentService;
    use crate::upload::FileSelection;
    use std::path::PathBuf;

    /// Compare document sets `a` and `b` and print the result
    pub async fn run_compare(
        config: Config,
        a: Vec<PathBuf>,
        b: Vec<PathBuf>,
        json: bool,
    ) -> Result<()> {
        let side_a = FileSelection::from_paths(&a)?;
        let side_b = FileSelection::from_paths(&b)?;
        let service = DocumentService::new(build_gateway(&config)?, config.upload.clone());

        let comparison = service.compare(&side_a, &side_b).await?;
        print_result(&comparison, json)
    }
}

fn print_result(value: &serde_json::Value, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", render_value(value, 0));
    }
    Ok(())
}

/// Plain-text rendering of a JSON result: objects as headed sections,
/// arrays as bullet lists.
fn render_value(value: &serde_json::Value, indent: usize) -> String {
    use serde_json::Value;

    let pad = "  ".repeat(indent);
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| match value {
                Value::Object(_) | Value::Array(_) => {
                    format!("{}{}:\n{}", pad, key.bold(), render_value(value, indent + 1))
                }
                scalar => format!("{}{}: {}\n", pad, key.bold(), scalar_text(scalar)),
            })
            .collect(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(_) | Value::Array(_) => {
                    format!("{}-\n{}", pad, render_value(item, indent + 1))
                }
                scalar => format!("{}- {}\n", pad, scalar_text(scalar)),
            })
            .collect(),
        scalar => format!("{}{}\n", pad, scalar_text(scalar)),
    }
}

fn scalar_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
