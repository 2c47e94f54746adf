// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! * `config` - model loading and template indexing
//! * `etl` - datasources, queries and template interpretation
//! * `topology` - relation resolution and pass summaries

pub mod config;
pub mod etl;
pub mod topology;

use tracing::Span;

/// A log message that knows its own level and structured fields.
pub trait StructuredLog: std::fmt::Display {
    /// Emit the message as a tracing event.
    fn log(&self);

    /// Open a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
