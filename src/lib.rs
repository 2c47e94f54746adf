// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;        // instance config, ETL models, refs
pub mod errors;        // error handling
pub mod etl;           // template, query and datasource interpreters
pub mod expression;    // restricted expression language
pub mod observability;
pub mod path;          // JSON path queries
pub mod sync;          // synchronization pass
pub mod topology;      // entity graph and factory
pub mod traits;        // unified abstractions
