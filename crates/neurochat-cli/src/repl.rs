use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::Term;
use neurochat_core::{
    handle_upload, ConversationManager, MriClassifier, SessionState, UploadedImage,
};

use crate::ui;

/// One line of REPL input.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplCommand {
    Quit,
    Empty,
    History,
    Reset,
    Upload(PathBuf),
    Say(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        match line {
            "" => return Ok(ReplCommand::Empty),
            "quit" | "exit" => return Ok(ReplCommand::Quit),
            "/history" => return Ok(ReplCommand::History),
            "/reset" => return Ok(ReplCommand::Reset),
            _ => {}
        }

        if let Some(rest) = line
            .strip_prefix("/upload")
            .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
        {
            let path = rest.trim();
            if path.is_empty() {
                return Err("usage: /upload <path>".to_string());
            }
            return Ok(ReplCommand::Upload(PathBuf::from(path)));
        }

        Ok(ReplCommand::Say(line.to_string()))
    }
}

pub fn read_image(path: &Path) -> Result<UploadedImage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read image: {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(UploadedImage::new(file_name, bytes))
}

pub async fn run_repl(
    app_name: &str,
    manager: &ConversationManager,
    classifier: &dyn MriClassifier,
) -> Result<()> {
    let term = Term::stdout();
    ui::print_banner(&term, app_name);

    let mut session = SessionState::new();
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            break;
        }

        let command = match ReplCommand::parse(&input) {
            Ok(cmd) => cmd,
            Err(msg) => {
                ui::print_error(&term, &msg);
                continue;
            }
        };

        match command {
            ReplCommand::Quit => break,
            ReplCommand::Empty => continue,
            ReplCommand::History => {
                if session.transcript().is_empty() {
                    ui::print_done(&term, "No messages yet.");
                } else {
                    ui::print_history(&term, session.transcript());
                }
            }
            ReplCommand::Reset => {
                session.end();
                session = SessionState::new();
                ui::print_done(&term, "Started a new session.");
            }
            ReplCommand::Upload(path) => {
                let image = match read_image(&path) {
                    Ok(image) => image,
                    Err(err) => {
                        ui::print_error(&term, &format!("{err:#}"));
                        continue;
                    }
                };
                let before = session.transcript().len();
                match handle_upload(&mut session, classifier, &image) {
                    Ok(_) => {
                        for turn in &session.transcript().turns()[before..] {
                            ui::print_turn(&term, turn);
                        }
                    }
                    Err(err) => ui::print_error(&term, &err.to_string()),
                }
            }
            ReplCommand::Say(text) => {
                manager.handle_user_turn(&text, &mut session).await;
                if let Some(reply) = session.transcript().last() {
                    ui::print_turn(&term, reply);
                }
            }
        }
    }

    session.end();
    Ok(())
}
