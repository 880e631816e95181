//! Client-side chat logic: configuration, validation, error normalization,
//! the state reducer, and the controller that ties them to a backend.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod backend_client;
pub mod config;
mod controller;
pub mod error;
pub mod state;
pub mod validate;

pub use config::{ChatConfig, ChatConfigBuilder, ChatOptions};
pub use controller::{ChatController, ChatControllerBuilder, SendOutcome};
pub use error::{ChatError, ChatErrorKind};
pub use state::{Action, ChatState, ConversationStats};

/// Re-exports of [`elevatr_api`] crate.
pub mod api {
    pub use elevatr_api::*;
}
