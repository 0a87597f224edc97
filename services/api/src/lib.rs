//! Havruta API Library Crate
//!
//! This library contains the HTTP surface for the havruta dialogue partner:
//! configuration, the shared session state, handlers, and routing. The `api`
//! binary is a thin wrapper around this library.

pub mod audio_utils;
pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
