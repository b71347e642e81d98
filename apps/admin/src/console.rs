//! Terminal implementations of the controller's notifier and confirmation seams.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use client_core::{ConfirmRequest, ConfirmationPrompt, Notice, NoticeLevel, Notifier};
use tracing::warn;

pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => println!("✔ {}: {}", notice.title, notice.text),
            NoticeLevel::Warning => eprintln!("! {}: {}", notice.title, notice.text),
            NoticeLevel::Error => eprintln!("✖ {}: {}", notice.title, notice.text),
        }
    }
}

/// Asks on stdin; anything but an explicit yes declines.
pub struct StdinPrompt;

#[async_trait]
impl ConfirmationPrompt for StdinPrompt {
    async fn confirm(&self, request: &ConfirmRequest) -> bool {
        let question = format!(
            "{}\n{}\n{} [y/N] ",
            request.title, request.text, request.confirm_label
        );
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stdout = io::stdout().lock();
            stdout.write_all(question.as_bytes())?;
            stdout.flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => is_affirmative(&line),
            Ok(Err(err)) => {
                warn!(error = %err, "could not read confirmation");
                false
            }
            Err(err) => {
                warn!(error = %err, "confirmation task failed");
                false
            }
        }
    }
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
