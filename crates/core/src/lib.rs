pub mod capability;
pub mod error;
pub mod llm_client;
pub mod normalizer;
pub mod orchestrator;
pub mod prompt;
pub mod session;
pub mod speech;
pub mod transcript;

/// What a single interaction did to the session.
///
/// The transcript already carries every visible effect; this is the summary
/// the runtime can branch on (e.g., to stop offering input after `Ended`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The clip matched the previously processed one; nothing was appended.
    Duplicate,
    /// The input was refused by the normalizer and a notice was appended.
    Rejected,
    /// An assistant reply with synthesized audio was appended.
    Replied,
    /// A stop-phrase was answered with the farewell.
    Ended,
    /// A capability failed or was not configured; a notice was appended.
    Failed,
}
