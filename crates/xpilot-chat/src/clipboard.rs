//! System clipboard access for sharing chats.

use std::process::Stdio;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::ChatError;

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), ChatError>;
}

/// Pipes text into a platform clipboard tool.
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    candidates: Vec<(String, Vec<String>)>,
}

impl CommandClipboard {
    /// Tools for the current platform, tried in order.
    pub fn system() -> Self {
        let candidates: Vec<(&str, Vec<&str>)> = if cfg!(target_os = "macos") {
            vec![("pbcopy", vec![])]
        } else if cfg!(windows) {
            vec![("clip", vec![])]
        } else {
            vec![
                ("wl-copy", vec![]),
                ("xclip", vec!["-selection", "clipboard"]),
                ("xsel", vec!["--clipboard", "--input"]),
            ]
        };
        Self {
            candidates: candidates
                .into_iter()
                .map(|(program, args)| {
                    (
                        program.to_string(),
                        args.into_iter().map(str::to_string).collect(),
                    )
                })
                .collect(),
        }
    }

    /// A single explicit command.
    pub fn with_command(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            candidates: vec![(program.into(), args)],
        }
    }

    async fn pipe(program: &str, args: &[String], text: &str) -> Result<(), ChatError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ChatError::Clipboard(format!("{}: {}", program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| ChatError::Clipboard(format!("{}: {}", program, e)))?;
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ChatError::Clipboard(format!("{}: {}", program, e)))?;
        if status.success() {
            Ok(())
        } else {
            Err(ChatError::Clipboard(format!("{} exited with {}", program, status)))
        }
    }
}

#[async_trait]
impl Clipboard for CommandClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ChatError> {
        let mut last_error = ChatError::Clipboard("no clipboard tool available".to_string());
        for (program, args) in &self.candidates {
            match Self::pipe(program, args, text).await {
                Ok(()) => {
                    debug!(program = %program, "Copied to clipboard");
                    return Ok(());
                }
                Err(e) => {
                    debug!(program = %program, error = %e, "Clipboard tool failed");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}

/// Keeps the last copied text in memory.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|c| c.clone())
    }
}

#[async_trait]
impl Clipboard for MemoryClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ChatError> {
        let mut contents = self
            .contents
            .lock()
            .map_err(|e| ChatError::Clipboard(format!("clipboard lock poisoned: {}", e)))?;
        *contents = Some(text.to_string());
        Ok(())
    }
}
