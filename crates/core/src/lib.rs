//! Deploy Bot Core - Shared types library.
//!
//! This crate provides types used across the deploy bot components:
//! - `bot` - Slack command and interaction server
//! - `cli` - Operator tools for inspecting CI state and prompt tokens
//!
//! # Architecture
//!
//! The core crate contains only types and pure codecs - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs for CircleCI entities and action/state enums
//! - [`token`] - The deploy prompt token carried on interactive buttons

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod token;
pub mod types;

pub use token::{DeployPromptToken, TokenError};
pub use types::*;
