//! # class-pages
//!
//! The host around `class-pages-core`: catalog and renderer adapters, the
//! async aggregation service, the HTTP API and the CLI.
//!
//! Modules are public so integration tests can drive the service and the
//! router directly (via `class_pages::*`).

pub mod api;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod enrich;
pub mod loader;
pub mod render;
pub mod service;
