//! # Core Application Logic
//!
//! State, actions and configuration. Knows nothing about HTTP or terminals.
//!
//! ```text
//!   CLI ──Action──► update() ──► App
//!                      │
//!                      └──Effect──► caller does the I/O
//! ```
//!
//! ## Modules
//!
//! - [`state`]: The `App` struct, all application state in one place
//! - [`action`]: The `Action` enum and the `update()` reducer
//! - [`config`]: Layered configuration (defaults → file → env → CLI)

pub mod action;
pub mod config;
pub mod state;

pub use action::{Action, Effect, update};
pub use state::App;
