pub mod api;
pub mod chat;
pub mod config;
pub mod controller;
pub mod error;
pub mod filters;

// Re-export main types for convenience
pub use api::{AskRequest, FilterOptions, FilterSelection, HeritageClient, QaBackend, DEFAULT_SERVER_URL};
pub use chat::{ChatLog, ChatMessage, ChatRole, MessageId, MessageTag};
pub use config::Config;
pub use controller::{ChatController, ChatEvent, FILTERS_UNAVAILABLE, PLACEHOLDER_TEXT};
pub use error::{ApiError, ResolveError};
pub use filters::{FilterControl, FilterPanel};
