// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod loader;
mod refs;
mod template_lookup;
mod validation;

pub mod consts;

pub use loader::{
    load_instances, load_model, ComponentSpec, ComponentTemplate, DataSourceSpec, DictSpec, Etl,
    EtlDocument, EventSpec, EventTemplate, HealthSpec, HealthTemplate, InstanceConfig,
    InstanceInfo, ListSpec, MetricSpec, MetricTemplate, ProcessorSpec, QuerySpec, SourceLinkSpec,
    Template, TemplateBody, TemplateSet,
};
pub use refs::ModelLoader;
pub use template_lookup::{TemplateLookup, TemplateRef};
pub use validation::validate_models;
