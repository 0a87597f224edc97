//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the single live
//! session and the orchestrator that drives it.

use havruta_core::{orchestrator::TurnOrchestrator, session::Session};
use std::sync::Arc;
use tokio::sync::Mutex;

/// The shared application state, created once at startup and passed to all handlers.
///
/// The session sits behind an async mutex so that interactions never overlap:
/// each request holds the lock for one full turn.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<Session>>,
    pub orchestrator: Arc<TurnOrchestrator>,
}

impl AppState {
    pub fn new(session: Session, orchestrator: TurnOrchestrator) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            orchestrator: Arc::new(orchestrator),
        }
    }
}
