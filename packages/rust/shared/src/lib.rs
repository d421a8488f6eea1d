//! Shared types, error model, and configuration for mermagen.
//!
//! This crate is the foundation depended on by all other mermagen crates.
//! It provides:
//! - [`MermagenError`] — the unified error type
//! - Domain types ([`Language`], [`DiagramType`], [`RunRecord`])
//! - The structured error taxonomy ([`ErrorCode`], [`ErrorCategory`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod taxonomy;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DatabaseConfig, ExecutionMode, OpenAiConfig, PipelineConfig, ServerConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{MermagenError, Result};
pub use taxonomy::{ErrorCategory, ErrorCode, StructuredError};
pub use types::{DiagramStatus, DiagramType, Language, RunRecord};
