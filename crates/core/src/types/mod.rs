//! Core types for the deploy bot.
//!
//! This module provides type-safe wrappers for CircleCI identifiers and the
//! enums that drive the prompt and reminder flows.

pub mod id;
pub mod status;

pub use id::*;
pub use status::*;
