//! Session State
//!
//! One conversation instance: the topic bound by the first accepted turn, the
//! fingerprint of the last processed audio clip, and the transcript.

use crate::transcript::{Transcript, TranscriptLog};
use chrono::Local;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{info, warn};

/// Content digest of a captured clip, used only to suppress duplicate submissions.
pub fn audio_fingerprint(audio: &[u8]) -> String {
    format!("{:x}", Sha256::digest(audio))
}

/// Derives a session id from the current local time, e.g. `20250101_120000`.
pub fn new_session_id() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

#[derive(Debug)]
pub struct Session {
    session_id: String,
    topic: Option<String>,
    last_input_fingerprint: Option<String>,
    pub(crate) transcript: Transcript,
}

impl Session {
    pub fn new(session_id: impl Into<String>, transcript: Transcript) -> Self {
        Self {
            session_id: session_id.into(),
            topic: None,
            last_input_fingerprint: None,
            transcript,
        }
    }

    /// Starts a session whose turns are mirrored into `run_dir`.
    ///
    /// If the log artifacts cannot be prepared the session still starts, in memory only.
    pub fn start(run_dir: &Path) -> Self {
        let session_id = new_session_id();
        let transcript = match TranscriptLog::create(run_dir, &session_id) {
            Ok(log) => {
                info!(
                    %session_id,
                    markdown = %log.markdown_path().display(),
                    jsonl = %log.jsonl_path().display(),
                    "Session started"
                );
                Transcript::with_log(log)
            }
            Err(e) => {
                warn!(
                    %session_id,
                    error = %e,
                    "Could not prepare transcript log; continuing in memory"
                );
                Transcript::in_memory()
            }
        };
        Self::new(session_id, transcript)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Binds the topic on the first call. Returns `true` only when it was set.
    pub fn set_topic_if_absent(&mut self, text: &str) -> bool {
        if self.topic.is_some() {
            return false;
        }
        self.topic = Some(text.to_string());
        true
    }

    /// Returns `false` for a clip identical to the last one processed; otherwise
    /// records the fingerprint and returns `true`.
    pub fn should_process_audio(&mut self, fingerprint: &str) -> bool {
        if self.last_input_fingerprint.as_deref() == Some(fingerprint) {
            return false;
        }
        self.last_input_fingerprint = Some(fingerprint.to_string());
        true
    }
}
