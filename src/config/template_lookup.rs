// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use crate::config::loader::{ComponentTemplate, Etl, EventTemplate, HealthTemplate, MetricTemplate};
use crate::observability::messages::config::{DuplicateTemplateIgnored, TemplatesIndexed};
use crate::observability::messages::StructuredLog;

/// Templates of every merged model, indexed by kind and name.
///
/// The first definition of a name within a kind wins; later ones are
/// logged and dropped.
#[derive(Debug, Default)]
pub struct TemplateLookup {
    pub component: HashMap<String, ComponentTemplate>,
    pub event: HashMap<String, EventTemplate>,
    pub metric: HashMap<String, MetricTemplate>,
    pub health: HashMap<String, HealthTemplate>,
}

/// A template found by name, tagged with its kind.
#[derive(Debug, Clone, Copy)]
pub enum TemplateRef<'a> {
    Component(&'a ComponentTemplate),
    Event(&'a EventTemplate),
    Metric(&'a MetricTemplate),
    Health(&'a HealthTemplate),
}

fn add_all<S: Clone>(
    kind: &'static str,
    index: &mut HashMap<String, crate::config::loader::Template<S>>,
    templates: &[crate::config::loader::Template<S>],
    source: &str,
) {
    for template in templates {
        if index.contains_key(&template.name) {
            DuplicateTemplateIgnored {
                kind,
                name: &template.name,
                source,
            }
            .log();
        } else {
            index.insert(template.name.clone(), template.clone());
        }
    }
}

impl TemplateLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_models(models: &[Etl]) -> Self {
        let mut lookup = Self::new();
        for model in models {
            lookup.index(model);
        }
        lookup
    }

    pub fn index(&mut self, etl: &Etl) {
        let templates = &etl.template;
        TemplatesIndexed {
            source: &etl.source,
            components: templates.components.len(),
            events: templates.events.len(),
            metrics: templates.metrics.len(),
            health: templates.health.len(),
        }
        .log();
        add_all("component", &mut self.component, &templates.components, &etl.source);
        add_all("event", &mut self.event, &templates.events, &etl.source);
        add_all("metric", &mut self.metric, &templates.metrics, &etl.source);
        add_all("health", &mut self.health, &templates.health, &etl.source);
    }

    /// Look a name up by kind priority: component, event, metric, health.
    pub fn find(&self, name: &str) -> Option<TemplateRef<'_>> {
        if let Some(template) = self.component.get(name) {
            return Some(TemplateRef::Component(template));
        }
        if let Some(template) = self.event.get(name) {
            return Some(TemplateRef::Event(template));
        }
        if let Some(template) = self.metric.get(name) {
            return Some(TemplateRef::Metric(template));
        }
        self.health.get(name).map(TemplateRef::Health)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::{EtlDocument, TemplateBody};

    fn model(source: &str, yaml: &str) -> Etl {
        let document: EtlDocument = serde_yaml::from_str(yaml).unwrap();
        let mut etl = document.etl.unwrap();
        etl.source = source.to_string();
        etl
    }

    #[test]
    fn test_first_definition_wins() {
        let first = model(
            "first.yaml",
            "etl:\n  template:\n    components:\n      - name: vm\n        code: \"first\"\n",
        );
        let second = model(
            "second.yaml",
            "etl:\n  template:\n    components:\n      - name: vm\n        code: \"second\"\n",
        );

        let lookup = TemplateLookup::from_models(&[first, second]);
        assert_eq!(lookup.component.len(), 1);
        match &lookup.component["vm"].body {
            TemplateBody::Code(code) => assert_eq!(code, "first"),
            TemplateBody::Spec(_) => panic!("expected code body"),
        }
    }

    #[test]
    fn test_find_uses_kind_priority() {
        let etl = model(
            "conf.yaml",
            r#"
etl:
  template:
    components:
      - name: shared
        code: "c"
    events:
      - name: shared
        code: "e"
      - name: restarts
        code: "e"
    health:
      - name: power
        code: "h"
"#,
        );
        let lookup = TemplateLookup::from_models(&[etl]);

        assert!(matches!(lookup.find("shared"), Some(TemplateRef::Component(_))));
        assert!(matches!(lookup.find("restarts"), Some(TemplateRef::Event(_))));
        assert!(matches!(lookup.find("power"), Some(TemplateRef::Health(_))));
        assert!(lookup.find("missing").is_none());
    }
}
