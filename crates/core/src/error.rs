use std::fmt;

/// The external capabilities a turn may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Recognition,
    Generation,
    Synthesis,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Recognition => write!(f, "speech recognition"),
            Capability::Generation => write!(f, "generation"),
            Capability::Synthesis => write!(f, "speech synthesis"),
        }
    }
}

/// Failures that abort a turn. They are rendered into a system notice and
/// never escape the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("{0} is not configured: OPENAI_API_KEY is not set")]
    NotConfigured(Capability),
    #[error("speech recognition failed: {0}")]
    Recognition(anyhow::Error),
    #[error("generation failed: {0}")]
    Generation(anyhow::Error),
    #[error("synthesis failed: {0}")]
    Synthesis(anyhow::Error),
    #[error("synthesis failed: no audio bytes")]
    EmptySynthesis,
}
