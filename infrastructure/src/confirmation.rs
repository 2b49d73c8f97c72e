//! Terminal confirmation resolver.
//!
//! [`StdinConfirmation`] prints `Allow <tool>? [y/N]` with a short preview
//! of the arguments to stderr and reads one line from stdin. Anything other
//! than `y`/`yes` declines, as does EOF or a read error.

use async_trait::async_trait;
use std::io::{self, BufRead, Write};
use tokio::sync::Mutex;
use toolpod_application::{ConfirmationResolver, tool_args_preview};
use toolpod_domain::ToolCallRequest;
use tracing::warn;

/// Prompts on the terminal. Concurrent requests are asked one at a time.
pub struct StdinConfirmation {
    prompt_lock: Mutex<()>,
}

impl StdinConfirmation {
    pub fn new() -> Self {
        Self {
            prompt_lock: Mutex::new(()),
        }
    }
}

impl Default for StdinConfirmation {
    fn default() -> Self {
        Self::new()
    }
}

fn prompt_text(request: &ToolCallRequest) -> String {
    let preview = tool_args_preview(request);
    if preview.is_empty() {
        format!("Allow {}? [y/N] ", request.tool_name)
    } else {
        format!("Allow {} ({})? [y/N] ", request.tool_name, preview)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn ask(prompt: &str, input: &mut impl BufRead, output: &mut impl Write) -> io::Result<bool> {
    write!(output, "{}", prompt)?;
    output.flush()?;
    let mut line = String::new();
    let read = input.read_line(&mut line)?;
    Ok(read > 0 && is_yes(&line))
}

#[async_trait]
impl ConfirmationResolver for StdinConfirmation {
    async fn confirm(&self, request: &ToolCallRequest) -> bool {
        let _guard = self.prompt_lock.lock().await;
        let prompt = prompt_text(request);
        let answer = tokio::task::spawn_blocking(move || {
            ask(&prompt, &mut io::stdin().lock(), &mut io::stderr())
        })
        .await;
        match answer {
            Ok(Ok(yes)) => yes,
            Ok(Err(e)) => {
                warn!(error = %e, tool = %request.tool_name, "Confirmation prompt failed; declining");
                false
            }
            Err(e) => {
                warn!(error = %e, "Confirmation task failed; declining");
                false
            }
        }
    }
}
