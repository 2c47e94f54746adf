// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod expression_engine;
pub mod host_object;

pub use expression_engine::ExpressionEngine;
pub use host_object::HostObject;
