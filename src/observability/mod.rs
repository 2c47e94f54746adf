// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging.
//!
//! Operational messages are struct types with a `Display` implementation and a
//! [`messages::StructuredLog`] implementation that emits the message at its
//! own level with structured fields. Keeping messages as types avoids magic
//! strings scattered through the pipeline and keeps log output consistent.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::config` - ETL model loading and template indexing
//! * `messages::etl` - datasource, query and template processing
//! * `messages::topology` - relation resolution and pass summaries
//!
//! # Usage
//!
//! ```rust
//! use topology_etl::observability::messages::etl::QueryReturnedNoResults;
//! use topology_etl::observability::messages::StructuredLog;
//!
//! let msg = QueryReturnedNoResults { query: "hosts" };
//! msg.log();
//! ```

pub mod messages;
