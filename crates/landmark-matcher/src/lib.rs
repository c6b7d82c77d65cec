//! # landmark-matcher
//!
//! Client for the external feature matcher.
//!
//! The matcher owns feature extraction and indexing. It reads images from the
//! upload directory it shares with this service and is addressed by stored
//! filename. This crate provides:
//! - [`HttpMatchClient`], the JSON-over-HTTP implementation of
//!   [`landmark_core::MatchClient`]
//! - [`MatcherConfig`], loaded from the environment
//! - [`mock::MockMatchClient`], a scripted fake for tests (feature `mock`)

pub mod client;
pub mod config;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod wire;

pub use client::HttpMatchClient;
pub use config::MatcherConfig;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockMatchClient;
