//! Protocol types shared by the Elevatr chat client.
//!
//! This crate defines the data exchanged with the chat backend (messages,
//! request and response envelopes) and the [`ChatBackend`] trait that every
//! backend implementation adheres to. The controller in `elevatr-core` only
//! talks to the backend through this trait, so the HTTP transport can be
//! swapped for a scripted one in tests.
//!
//! Types in this crate don't define any client behavior. State handling,
//! validation and error normalization live in `elevatr-core`.

#![deny(missing_docs)]

mod backend;
mod error;
mod message;
mod wire;

pub use backend::*;
pub use error::*;
pub use message::*;
pub use wire::*;
