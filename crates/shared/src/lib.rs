//! Shared types and configuration for Throttle.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe references to users, plans, features and subscriptions
//! - Configuration management, including overridable table names

pub mod config;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, TableNames};
