use super::MediaError;
use serde_json::Value;
use std::{path::Path, process::Stdio};
use tokio::{io::AsyncWriteExt, process::Command};

/// Renders a video clip from structured deal data.
#[async_trait::async_trait]
pub trait MediaSynthesizer: Send + Sync {
    async fn synthesize(&self, deal: &Value, output: &Path) -> Result<(), MediaError>;
}

/// Pipes the deal as JSON to an external renderer's stdin and appends the
/// output path as the final argument. The configured command line is split on
/// whitespace, so "python3 render.py" works as expected. The contract with
/// the renderer is: exit zero and leave a playable file at the given path.
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
}

impl CommandSynthesizer {
    pub fn new(command_line: &str) -> Self {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_default();
        Self {
            program,
            args: parts.collect(),
        }
    }
}

#[async_trait::async_trait]
impl MediaSynthesizer for CommandSynthesizer {
    async fn synthesize(&self, deal: &Value, output: &Path) -> Result<(), MediaError> {
        let payload = serde_json::to_vec(deal)
            .map_err(|e| MediaError::Spawn(format!("deal serialization: {}", e)))?;

        tracing::info!(output = %output.display(), "synthesizing deal video");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MediaError::Spawn(format!("{}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A renderer that exits without reading stdin closes the pipe; a
            // write error here is not fatal as long as the renderer succeeds.
            let _ = stdin.write_all(&payload).await;
            let _ = stdin.shutdown().await;
        }

        let result = child
            .wait_with_output()
            .await
            .map_err(|e| MediaError::Spawn(format!("{}: {}", self.program, e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            return Err(MediaError::Failed {
                program: self.program.clone(),
                stderr,
            });
        }

        let present = tokio::fs::metadata(output)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if !present {
            return Err(MediaError::Output(output.display().to_string()));
        }
        Ok(())
    }
}
