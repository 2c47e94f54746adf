// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The entity graph built during one synchronization pass.

pub mod factory;
pub mod handles;
pub mod model;

pub use factory::{TopologyFactory, TopologySnapshot};
pub use handles::{
    shared_factory, EventDraft, FactoryHandle, HealthDraft, MetricDraft, RegisteredComponent,
    SharedFactory,
};
pub use model::{
    Component, ComponentProperties, Event, EventCategory, HealthCheckState, HealthState, Metric,
    MetricType, Relation, RelationIntent,
};
