//! Transcript Store
//!
//! An ordered, append-only sequence of turns for one session. Every appended
//! turn is also mirrored, best-effort, to two durable artifacts: a readable
//! Markdown log and a newline-delimited JSON log.

use bytes::Bytes;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Notices produced by the pipeline itself (rejections, errors, the chosen topic).
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

/// One immutable message in the transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    /// Raw waveform bytes, either the user's captured clip or the synthesized reply.
    pub audio: Option<Bytes>,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>, audio: Option<Bytes>) -> Self {
        Self {
            role,
            text: text.into(),
            audio,
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>, audio: Option<Bytes>) -> Self {
        Self::new(Role::User, text, audio)
    }

    pub fn assistant(text: impl Into<String>, audio: Option<Bytes>) -> Self {
        Self::new(Role::Assistant, text, audio)
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Self::new(Role::System, text, None)
    }
}

/// A single line of the JSONL mirror.
#[derive(Serialize)]
struct LogRecord<'a> {
    role: Role,
    text: &'a str,
    time: f64,
}

/// The pair of durable artifacts a session's turns are mirrored into.
#[derive(Debug, Clone)]
pub struct TranscriptLog {
    markdown_path: PathBuf,
    jsonl_path: PathBuf,
}

impl TranscriptLog {
    /// Names both artifacts after the session id inside `run_dir`, creating the
    /// directory if needed.
    pub fn create(run_dir: &Path, session_id: &str) -> std::io::Result<Self> {
        fs::create_dir_all(run_dir)?;
        Ok(Self {
            markdown_path: run_dir.join(format!("havruta_{session_id}.md")),
            jsonl_path: run_dir.join(format!("havruta_{session_id}.jsonl")),
        })
    }

    pub fn markdown_path(&self) -> &Path {
        &self.markdown_path
    }

    pub fn jsonl_path(&self) -> &Path {
        &self.jsonl_path
    }

    /// Mirrors one turn into both artifacts; each is written independently.
    fn write(&self, turn: &Turn) {
        if let Err(e) = self.write_markdown(turn) {
            warn!(
                error = %e,
                path = %self.markdown_path.display(),
                "Failed to mirror turn to Markdown log"
            );
        }
        if let Err(e) = self.write_jsonl(turn) {
            warn!(
                error = %e,
                path = %self.jsonl_path.display(),
                "Failed to mirror turn to JSONL log"
            );
        }
    }

    fn write_markdown(&self, turn: &Turn) -> anyhow::Result<()> {
        let local = turn.timestamp.with_timezone(&Local);
        let mut md = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.markdown_path)?;
        write!(
            md,
            "\n**{} [{}]**\n\n{}\n",
            turn.role,
            local.format("%Y-%m-%d %H:%M:%S"),
            turn.text
        )?;
        Ok(())
    }

    fn write_jsonl(&self, turn: &Turn) -> anyhow::Result<()> {
        let record = LogRecord {
            role: turn.role,
            text: &turn.text,
            time: turn.timestamp.timestamp_micros() as f64 / 1_000_000.0,
        };
        let mut jsonl = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.jsonl_path)?;
        writeln!(jsonl, "{}", serde_json::to_string(&record)?)?;
        Ok(())
    }
}

/// The in-memory transcript, the source of truth for the live session.
#[derive(Debug, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
    log: Option<TranscriptLog>,
}

impl Transcript {
    /// A transcript that is never mirrored to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_log(log: TranscriptLog) -> Self {
        Self {
            turns: Vec::new(),
            log: Some(log),
        }
    }

    /// Appends a turn. The durable mirror is best-effort and never blocks the append.
    pub fn append(&mut self, turn: Turn) {
        if let Some(log) = &self.log {
            log.write(&turn);
        }
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn log(&self) -> Option<&TranscriptLog> {
        self.log.as_ref()
    }
}
