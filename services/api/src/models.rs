//! API Models
//!
//! This module defines the JSON shapes exchanged over HTTP and their OpenAPI
//! schemas. Core types stay free of transport concerns; they are converted here.

use crate::audio_utils;
use chrono::{DateTime, Utc};
use havruta_core::{
    TurnOutcome,
    session::Session,
    transcript::{Role, Turn},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
    System,
}

impl From<Role> for TurnRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => TurnRole::User,
            Role::Assistant => TurnRole::Assistant,
            Role::System => TurnRole::System,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Duplicate,
    Rejected,
    Replied,
    Ended,
    Failed,
}

impl From<TurnOutcome> for Outcome {
    fn from(outcome: TurnOutcome) -> Self {
        match outcome {
            TurnOutcome::Duplicate => Outcome::Duplicate,
            TurnOutcome::Rejected => Outcome::Rejected,
            TurnOutcome::Replied => Outcome::Replied,
            TurnOutcome::Ended => Outcome::Ended,
            TurnOutcome::Failed => Outcome::Failed,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct TurnView {
    #[schema(example = "assistant")]
    pub role: TurnRole,
    pub text: String,
    /// WAV bytes, base64 encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<&Turn> for TurnView {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role.into(),
            text: turn.text.clone(),
            audio_base64: turn.audio.as_deref().map(audio_utils::encode_base64),
            timestamp: turn.timestamp,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct SessionSummary {
    #[schema(example = "20250101_120000")]
    pub session_id: String,
    pub topic: Option<String>,
    pub turn_count: usize,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.session_id().to_string(),
            topic: session.topic().map(str::to_string),
            turn_count: session.transcript().len(),
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct TextTurnPayload {
    #[schema(example = "고양이는 포유류야")]
    pub text: String,
}

/// The result of one interaction: its outcome and the turns it appended, in order.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct TurnResponse {
    pub outcome: Outcome,
    pub turns: Vec<TurnView>,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}
