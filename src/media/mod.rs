//! Local media acquisition: downloading remote video through an external
//! downloader and synthesizing clips from structured deal data.

pub mod fetcher;
pub mod synthesizer;

pub use fetcher::{FetchedMedia, MediaFetcher, YtDlpFetcher};
pub use synthesizer::{CommandSynthesizer, MediaSynthesizer};

use std::fmt;

#[derive(Debug)]
pub enum MediaError {
    /// The external program could not be started at all.
    Spawn(String),
    /// The program ran but exited non-zero.
    Failed { program: String, stderr: String },
    /// The program exited zero but the expected output file is missing.
    Output(String),
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::Spawn(msg) => write!(f, "Failed to start media program: {}", msg),
            MediaError::Failed { program, stderr } => {
                write!(f, "{} failed: {}", program, stderr)
            }
            MediaError::Output(path) => {
                write!(f, "Media program produced no output at {}", path)
            }
        }
    }
}

impl std::error::Error for MediaError {}
