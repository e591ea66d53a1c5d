#![warn(clippy::all, missing_docs)]

//! Core client logic for GameFinder.
//!
//! This crate hosts the backend models, response reconciliation, caching,
//! authentication and detail resolution used by the terminal UI and any
//! future frontends.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod detail;
pub mod error;
pub mod finder;
pub mod models;
pub mod reconcile;
pub mod scope;
pub mod selection;
pub mod validation;

pub use config::AppConfig;
pub use detail::{DetailState, DetailTarget, DetailView};
pub use error::{FetchError, FetchResult};
pub use finder::GameFinder;
pub use models::{CanonicalResult, GameDetails, HistoryEntry, Tag, User};
pub use scope::{ViewScope, ViewTicket};
pub use selection::TagSelection;
