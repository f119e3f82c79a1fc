use super::MediaError;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use uuid::Uuid;

/// A downloaded file: the identifier callers later pass to publish, and the
/// local path it resolves to.
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub file_id: String,
    pub path: PathBuf,
}

/// Downloads a remote video into the local files directory.
#[async_trait::async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia, MediaError>;
}

/// Shells out to yt-dlp (or a compatible program) and asks for best video
/// plus best audio merged into an mp4 container.
pub struct YtDlpFetcher {
    files_dir: PathBuf,
    program: String,
}

impl YtDlpFetcher {
    pub fn new(files_dir: impl Into<PathBuf>, program: impl Into<String>) -> Self {
        Self {
            files_dir: files_dir.into(),
            program: program.into(),
        }
    }
}

#[async_trait::async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia, MediaError> {
        let file_id = Uuid::new_v4().to_string();
        // The extension placeholder lets the downloader pick its own working
        // extension; the merge format pins the final container to mp4.
        let template = self.files_dir.join(format!("{}.%(ext)s", file_id));

        tracing::info!(url, file_id, "downloading video");
        let output = Command::new(&self.program)
            .arg("-f")
            .arg("bv*+ba/best")
            .arg("--merge-output-format")
            .arg("mp4")
            .arg("-o")
            .arg(&template)
            .arg(url)
            .output()
            .await
            .map_err(|e| MediaError::Spawn(format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(MediaError::Failed {
                program: self.program.clone(),
                stderr,
            });
        }

        let path = self.files_dir.join(format!("{}.mp4", file_id));
        if !file_exists(&path).await {
            return Err(MediaError::Output(path.display().to_string()));
        }

        Ok(FetchedMedia { file_id, path })
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_surfaces_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = YtDlpFetcher::new(dir.path(), "definitely-not-a-real-program");

        match fetcher.fetch("https://example.com/v").await {
            Err(MediaError::Spawn(msg)) => assert!(msg.contains("definitely-not-a-real-program")),
            other => panic!("expected spawn error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_reports_missing_output() {
        let dir = tempfile::tempdir().unwrap();
        // `true` exits zero without writing anything.
        let fetcher = YtDlpFetcher::new(dir.path(), "true");

        match fetcher.fetch("https://example.com/v").await {
            Err(MediaError::Output(path)) => assert!(path.ends_with(".mp4")),
            other => panic!("expected output error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_reports_nonzero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = YtDlpFetcher::new(dir.path(), "false");

        match fetcher.fetch("https://example.com/v").await {
            Err(MediaError::Failed { program, .. }) => assert_eq!(program, "false"),
            other => panic!("expected failure error, got {:?}", other),
        }
    }
}
