// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::TopologyError;
use crate::observability::messages::topology::{HealthSummary, RelationAlreadyMaterialized, RelationsResolved};
use crate::observability::messages::StructuredLog;
use crate::path;
use crate::topology::model::{
    Component, Event, HealthCheckState, HealthState, Metric, Relation, RelationIntent,
};

/// Owner of the entity graph for one synchronization pass.
///
/// Components are keyed by uid, relations by `"{source} --> {target}"` and
/// health states by check id; each key is unique and a second insert is an
/// error. Events and metrics are append-only.
#[derive(Debug, Clone, Default)]
pub struct TopologyFactory {
    components: BTreeMap<String, Component>,
    relations: BTreeMap<String, Relation>,
    health: BTreeMap<String, HealthCheckState>,
    events: Vec<Event>,
    metrics: Vec<Metric>,
    lookups: Map<String, Value>,
}

/// Serializable view of the graph handed to the publisher.
#[derive(Debug, Clone, Serialize)]
pub struct TopologySnapshot {
    pub components: Vec<Component>,
    pub relations: Vec<Relation>,
    pub health: Vec<HealthCheckState>,
    pub events: Vec<Event>,
    pub metrics: Vec<Metric>,
}

impl TopologyFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path lookup with the scalar-unwrap convention of [`path::resolve`].
    pub fn jpath(path: &str, target: &Value, default: Value) -> Result<Value, crate::errors::PathError> {
        path::resolve(path, target, default)
    }

    /// `urn:{integration}:{kind}/{sanitize(name)}`.
    pub fn get_uid(integration: &str, kind: &str, name: &str) -> String {
        format!("urn:{}:{}/{}", integration, kind, Self::sanitize(name))
    }

    /// Lowercase and replace spaces with underscores.
    pub fn sanitize(value: &str) -> String {
        value.replace(' ', "_").to_lowercase()
    }

    pub fn components(&self) -> &BTreeMap<String, Component> {
        &self.components
    }

    pub fn relations(&self) -> &BTreeMap<String, Relation> {
        &self.relations
    }

    pub fn health(&self) -> &BTreeMap<String, HealthCheckState> {
        &self.health
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn lookups(&self) -> &Map<String, Value> {
        &self.lookups
    }

    pub fn lookups_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.lookups
    }

    pub fn set_lookup(&mut self, key: impl Into<String>, value: Value) {
        self.lookups.insert(key.into(), value);
    }

    pub fn get_lookup(&self, key: &str) -> Option<&Value> {
        self.lookups.get(key)
    }

    fn validate(component: &Component) -> Result<String, TopologyError> {
        let uid = match component.uid.as_deref() {
            Some(uid) if !uid.is_empty() => uid.to_string(),
            _ => {
                return Err(TopologyError::InvalidComponent {
                    uid: "<none>".to_string(),
                    reason: "uid is required".to_string(),
                })
            }
        };
        if component.name().is_none() {
            return Err(TopologyError::InvalidComponent {
                uid,
                reason: "name is required".to_string(),
            });
        }
        Ok(uid)
    }

    pub fn add_component(&mut self, component: Component) -> Result<&Component, TopologyError> {
        let uid = Self::validate(&component)?;
        if self.components.contains_key(&uid) {
            return Err(TopologyError::DuplicateComponent(uid));
        }
        Ok(self.components.entry(uid).or_insert(component))
    }

    pub fn get_component(&self, uid: &str) -> Option<&Component> {
        self.components.get(uid)
    }

    pub fn get_component_mut(&mut self, uid: &str) -> Option<&mut Component> {
        self.components.get_mut(uid)
    }

    pub fn component_exists(&self, uid: &str) -> bool {
        self.components.contains_key(uid)
    }

    fn single_match<'a>(
        matches: Vec<&'a Component>,
        description: String,
        raise_not_found: bool,
    ) -> Result<Option<&'a Component>, TopologyError> {
        match matches.len() {
            0 if raise_not_found => Err(TopologyError::ComponentNotFound(description)),
            0 => Ok(None),
            1 => Ok(matches.into_iter().next()),
            _ => Err(TopologyError::AmbiguousComponent(description)),
        }
    }

    pub fn get_component_by_name(
        &self,
        name: &str,
        raise_not_found: bool,
    ) -> Result<Option<&Component>, TopologyError> {
        let matches = self
            .components
            .values()
            .filter(|c| c.name() == Some(name))
            .collect();
        Self::single_match(matches, format!("({})", name), raise_not_found)
    }

    pub fn get_component_by_name_and_type(
        &self,
        component_type: &str,
        name: &str,
        raise_not_found: bool,
    ) -> Result<Option<&Component>, TopologyError> {
        let matches = self
            .components
            .values()
            .filter(|c| c.component_type() == component_type && c.name() == Some(name))
            .collect();
        Self::single_match(
            matches,
            format!("({}, {})", component_type, name),
            raise_not_found,
        )
    }

    pub fn get_component_by_name_postfix(
        &self,
        postfix: &str,
        raise_not_found: bool,
    ) -> Result<Option<&Component>, TopologyError> {
        let matches = self
            .components
            .values()
            .filter(|c| c.name().map(|n| n.ends_with(postfix)).unwrap_or(false))
            .collect();
        Self::single_match(matches, format!("postfix ({})", postfix), raise_not_found)
    }

    pub fn relation_exists(&self, source_id: &str, target_id: &str) -> bool {
        self.relations.contains_key(&Relation::key(source_id, target_id))
    }

    pub fn add_relation(
        &mut self,
        source_id: &str,
        target_id: &str,
        relation_type: &str,
    ) -> Result<&Relation, TopologyError> {
        let key = Relation::key(source_id, target_id);
        if self.relations.contains_key(&key) {
            return Err(TopologyError::DuplicateRelation(key));
        }
        Ok(self
            .relations
            .entry(key)
            .or_insert_with(|| Relation::new(source_id, target_id, relation_type)))
    }

    /// Attach relation intents (`[<type>|]<target>`) to a registered component.
    pub fn add_component_relations<S: AsRef<str>>(
        &mut self,
        uid: &str,
        declarations: &[S],
    ) -> Result<(), TopologyError> {
        let component = self
            .components
            .get_mut(uid)
            .ok_or_else(|| TopologyError::ComponentNotFound(format!("({})", uid)))?;
        for declaration in declarations {
            let declaration = declaration.as_ref();
            if !declaration.trim().is_empty() {
                component.add_relation(RelationIntent::parse(declaration));
            }
        }
        Ok(())
    }

    pub fn add_health(&mut self, health: HealthCheckState) -> Result<(), TopologyError> {
        if self.health.contains_key(&health.check_id) {
            return Err(TopologyError::DuplicateHealth(health.check_id));
        }
        self.health.insert(health.check_id.clone(), health);
        Ok(())
    }

    pub fn add_event(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn add_metric(&mut self, metric: Metric) {
        self.metrics.push(metric);
    }

    /// Uid of the component a relation target refers to: the uid itself, or
    /// the single component carrying it as an identifier.
    fn resolve_target(&self, target: &str) -> Result<Option<String>, TopologyError> {
        if self.components.contains_key(target) {
            return Ok(Some(target.to_string()));
        }
        let mut owners = self
            .components
            .iter()
            .filter(|(_, c)| c.properties.identifiers.iter().any(|i| i == target))
            .map(|(uid, _)| uid);
        match (owners.next(), owners.next()) {
            (None, _) => Ok(None),
            (Some(uid), None) => Ok(Some(uid.clone())),
            (Some(_), Some(_)) => Err(TopologyError::AmbiguousComponent(format!(
                "identifier ({})",
                target
            ))),
        }
    }

    /// Materialize every relation intent whose target now exists.
    ///
    /// Edges that already exist are left alone, so repeated calls produce the
    /// same relation set. Intents whose target cannot be found are reported
    /// together after all resolvable ones have been added.
    pub fn resolve_relations(&mut self) -> Result<usize, TopologyError> {
        let mut pending = Vec::new();
        let mut unresolved = Vec::new();
        let mut intents = 0;
        for (uid, component) in &self.components {
            for intent in &component.relations {
                intents += 1;
                match self.resolve_target(&intent.target)? {
                    Some(target_uid) => {
                        pending.push((uid.clone(), target_uid, intent.relation_type.clone()))
                    }
                    None => unresolved.push(format!("{} -> {}", uid, intent)),
                }
            }
        }

        let mut created = 0;
        for (source, target, relation_type) in pending {
            let key = Relation::key(&source, &target);
            if self.relations.contains_key(&key) {
                RelationAlreadyMaterialized { key: &key }.log();
                continue;
            }
            self.relations
                .insert(key, Relation::new(&source, &target, &relation_type));
            created += 1;
        }

        RelationsResolved {
            intents,
            created,
            unresolved: unresolved.len(),
        }
        .log();

        if unresolved.is_empty() {
            Ok(created)
        } else {
            Err(TopologyError::UnresolvedRelations(unresolved))
        }
    }

    /// Publishable copy of the graph with component labels deduplicated.
    pub fn snapshot(&self) -> TopologySnapshot {
        let components = self
            .components
            .values()
            .map(|component| {
                let mut component = component.clone();
                component.properties.dedup_labels();
                component
            })
            .collect();

        let summary = self.health.values().fold(
            HealthSummary {
                critical: 0,
                deviating: 0,
                clear: 0,
            },
            |mut summary, state| {
                match state.health {
                    HealthState::Critical => summary.critical += 1,
                    HealthState::Deviating => summary.deviating += 1,
                    HealthState::Clear => summary.clear += 1,
                }
                summary
            },
        );
        summary.log();

        TopologySnapshot {
            components,
            relations: self.relations.values().cloned().collect(),
            health: self.health.values().cloned().collect(),
            events: self.events.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn component(uid: &str, name: &str, component_type: &str) -> Component {
        let mut component = Component::default();
        component.uid = Some(uid.to_string());
        component.set_name(name);
        component.set_type(component_type);
        component.properties.add_identifier(uid);
        component
    }

    fn health(check_id: &str) -> HealthCheckState {
        HealthCheckState {
            check_id: check_id.to_string(),
            check_name: "power".to_string(),
            topo_identifier: "urn:vm:/a".to_string(),
            message: String::new(),
            health: HealthState::Clear,
        }
    }

    #[test]
    fn test_duplicate_uid_rejected_regardless_of_other_fields() {
        let mut factory = TopologyFactory::new();
        factory.add_component(component("urn:vm:/a", "a", "vm")).unwrap();

        let err = factory
            .add_component(component("urn:vm:/a", "completely different", "host"))
            .unwrap_err();
        assert_eq!(err, TopologyError::DuplicateComponent("urn:vm:/a".to_string()));
        assert_eq!(factory.components().len(), 1);
        assert_eq!(factory.get_component("urn:vm:/a").and_then(Component::name), Some("a"));
    }

    #[test]
    fn test_invalid_components() {
        let mut factory = TopologyFactory::new();
        let missing_uid = Component::default();
        assert!(matches!(
            factory.add_component(missing_uid),
            Err(TopologyError::InvalidComponent { .. })
        ));

        let mut missing_name = Component::default();
        missing_name.uid = Some("urn:x".to_string());
        assert!(matches!(
            factory.add_component(missing_name),
            Err(TopologyError::InvalidComponent { reason, .. }) if reason.contains("name")
        ));
    }

    #[test]
    fn test_relations_and_health_are_unique() {
        let mut factory = TopologyFactory::new();
        let relation = factory.add_relation("a", "b", "uses").unwrap();
        assert_eq!(relation.external_id, "a --> b");
        assert!(factory.relation_exists("a", "b"));
        assert!(!factory.relation_exists("b", "a"));
        assert_eq!(
            factory.add_relation("a", "b", "runs_on").unwrap_err(),
            TopologyError::DuplicateRelation("a --> b".to_string())
        );

        factory.add_health(health("c1")).unwrap();
        assert_eq!(
            factory.add_health(health("c1")).unwrap_err(),
            TopologyError::DuplicateHealth("c1".to_string())
        );
    }

    #[test]
    fn test_lookups_by_name() {
        let mut factory = TopologyFactory::new();
        factory.add_component(component("urn:vm:/web-1", "web-1", "vm")).unwrap();
        factory.add_component(component("urn:vm:/web-2", "web-2", "vm")).unwrap();
        factory.add_component(component("urn:host:/web-1", "web-1", "host")).unwrap();

        assert!(matches!(
            factory.get_component_by_name("web-1", true),
            Err(TopologyError::AmbiguousComponent(_))
        ));
        let vm = factory.get_component_by_name_and_type("vm", "web-1", true).unwrap();
        assert_eq!(vm.and_then(|c| c.uid.as_deref()), Some("urn:vm:/web-1"));

        assert!(factory.get_component_by_name("db", false).unwrap().is_none());
        assert!(matches!(
            factory.get_component_by_name("db", true),
            Err(TopologyError::ComponentNotFound(_))
        ));

        let postfix = factory.get_component_by_name_postfix("-2", true).unwrap();
        assert_eq!(postfix.and_then(Component::name), Some("web-2"));
        assert!(matches!(
            factory.get_component_by_name_postfix("-1", false),
            Err(TopologyError::AmbiguousComponent(_))
        ));
    }

    #[test]
    fn test_get_uid_and_sanitize() {
        assert_eq!(TopologyFactory::get_uid("host", "vm", "My VM"), "urn:host:vm/my_vm");
        for value in ["My VM", "already_clean", "Mixed Case Name  x"] {
            let once = TopologyFactory::sanitize(value);
            assert_eq!(TopologyFactory::sanitize(&once), once);
        }
    }

    #[test]
    fn test_resolve_relations_is_idempotent() {
        let mut factory = TopologyFactory::new();
        let mut vm = component("urn:vm:/a", "a", "vm");
        vm.properties.add_identifier("vm-a-serial");
        factory.add_component(vm).unwrap();
        factory.add_component(component("urn:host:/h", "h", "host")).unwrap();
        factory
            .add_component_relations("urn:vm:/a", &["runs_on|urn:host:/h"])
            .unwrap();
        factory
            .add_component_relations("urn:host:/h", &["vm-a-serial"])
            .unwrap();

        assert_eq!(factory.resolve_relations().unwrap(), 2);
        let first: Vec<String> = factory.relations().keys().cloned().collect();
        assert_eq!(factory.resolve_relations().unwrap(), 0);
        let second: Vec<String> = factory.relations().keys().cloned().collect();

        assert_eq!(first, second);
        assert_eq!(
            factory.relations()["urn:vm:/a --> urn:host:/h"].relation_type.name,
            "runs_on"
        );
        assert_eq!(
            factory.relations()["urn:host:/h --> urn:vm:/a"].relation_type.name,
            "uses"
        );
    }

    #[test]
    fn test_unresolved_relations_reported_after_resolvable_ones() {
        let mut factory = TopologyFactory::new();
        factory.add_component(component("urn:vm:/a", "a", "vm")).unwrap();
        factory.add_component(component("urn:host:/h", "h", "host")).unwrap();
        factory
            .add_component_relations("urn:vm:/a", &["urn:host:/h", "urn:host:/missing"])
            .unwrap();

        let err = factory.resolve_relations().unwrap_err();
        match err {
            TopologyError::UnresolvedRelations(targets) => {
                assert_eq!(targets, vec!["urn:vm:/a -> uses|urn:host:/missing".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(factory.relation_exists("urn:vm:/a", "urn:host:/h"));
    }

    #[test]
    fn test_snapshot_dedups_labels() {
        let mut factory = TopologyFactory::new();
        let mut vm = component("urn:vm:/a", "a", "vm");
        vm.properties.add_label("env:prod");
        vm.properties.add_label("env:prod");
        factory.add_component(vm).unwrap();
        factory.set_lookup("clusters", json!(["c1"]));

        let snapshot = factory.snapshot();
        assert_eq!(snapshot.components[0].properties.labels, vec!["env:prod"]);
        assert_eq!(factory.get_lookup("clusters"), Some(&json!(["c1"])));
        // the factory's own copy is untouched
        assert_eq!(factory.components()["urn:vm:/a"].properties.labels.len(), 2);
    }
}
