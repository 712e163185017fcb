//! Wallet approval prompts.
//!
//! A browser wallet asks the user before connecting and before signing. The
//! local wallet does the same on the terminal unless prompts are
//! auto-approved.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;

/// Asks the user to approve a wallet action.
#[async_trait]
pub trait Approver: Send + Sync {
    async fn approve(&self, request: &str) -> bool;
}

/// Approves everything (`--yes`, scripted use).
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl Approver for AutoApprove {
    async fn approve(&self, request: &str) -> bool {
        tracing::debug!(request, "Auto-approved wallet request");
        true
    }
}

/// Asks on stderr and reads a y/N answer from stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

#[async_trait]
impl Approver for TerminalPrompt {
    async fn approve(&self, request: &str) -> bool {
        let request = request.to_string();
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stderr = io::stderr();
            write!(stderr, "{} [y/N] ", request)?;
            stderr.flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => is_yes(&line),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Could not read prompt answer");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Prompt task failed");
                false
            }
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
    }

    #[tokio::test]
    async fn test_auto_approve() {
        assert!(AutoApprove.approve("Connect?").await);
    }
}
