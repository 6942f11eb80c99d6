//! Deploy Bot library.
//!
//! Slack slash commands and interactive prompts for releasing CircleCI
//! approval-gated deploys, plus release notes sourced from GitHub and Heroku.
//!
//! # Modules
//!
//! - [`deploy`] - The deploy-by-branch prompt and its approve/cancel resolution
//! - [`commands`] - Slash command handlers and their user-facing replies
//! - [`circleci`], [`github`], [`heroku`], [`slack`] - API clients and their traits
//! - [`routes`] - Axum webhook handlers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod circleci;
pub mod commands;
pub mod config;
pub mod deploy;
pub mod error;
pub mod github;
pub mod heroku;
pub mod routes;
pub mod slack;
pub mod state;
