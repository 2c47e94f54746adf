// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Entities accumulated by the topology factory.
//!
//! Serialized field names follow the receiving monitoring backend
//! (`externalId`, `sourceId`, `checkStateId`, ...), so a snapshot of the
//! factory can be published without another mapping step.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const UNKNOWN: &str = "Unknown";
pub const DEFAULT_RELATION_TYPE: &str = "uses";
pub const DEFAULT_EVENT_SOURCE: &str = "ETL";

/// Type tag shared by components and relations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementType {
    pub name: String,
}

impl ElementType {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(rename = "externalId")]
    pub external_id: String,
    #[serde(rename = "type")]
    pub relation_type: ElementType,
    #[serde(rename = "sourceId")]
    pub source_id: String,
    #[serde(rename = "targetId")]
    pub target_id: String,
    #[serde(rename = "data")]
    pub properties: Map<String, Value>,
}

impl Relation {
    /// Composite key `"{source} --> {target}"`.
    pub fn key(source_id: &str, target_id: &str) -> String {
        format!("{} --> {}", source_id, target_id)
    }

    pub fn new(source_id: &str, target_id: &str, relation_type: &str) -> Self {
        let mut properties = Map::new();
        properties.insert("labels".to_string(), Value::Array(Vec::new()));
        Self {
            external_id: Self::key(source_id, target_id),
            relation_type: ElementType::new(relation_type),
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            properties,
        }
    }
}

/// A relation declared by a component whose target may not exist yet.
///
/// Written as `[<type>|]<target>`; the target is a uid or any identifier of
/// another component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationIntent {
    pub relation_type: String,
    pub target: String,
}

impl RelationIntent {
    pub fn parse(declaration: &str) -> Self {
        match declaration.split_once('|') {
            Some((relation_type, target)) if !relation_type.trim().is_empty() => Self {
                relation_type: relation_type.trim().to_string(),
                target: target.trim().to_string(),
            },
            Some((_, target)) => Self::new(target.trim(), DEFAULT_RELATION_TYPE),
            None => Self::new(declaration.trim(), DEFAULT_RELATION_TYPE),
        }
    }

    pub fn new(target: impl Into<String>, relation_type: impl Into<String>) -> Self {
        Self {
            relation_type: relation_type.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for RelationIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.relation_type, self.target)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentProperties {
    pub name: Option<String>,
    pub layer: String,
    pub domain: String,
    pub environment: String,
    pub labels: Vec<String>,
    pub identifiers: Vec<String>,
    pub custom_properties: Map<String, Value>,
}

impl Default for ComponentProperties {
    fn default() -> Self {
        Self {
            name: None,
            layer: UNKNOWN.to_string(),
            domain: UNKNOWN.to_string(),
            environment: UNKNOWN.to_string(),
            labels: Vec::new(),
            identifiers: Vec::new(),
            custom_properties: Map::new(),
        }
    }
}

impl ComponentProperties {
    pub fn add_label(&mut self, label: impl Into<String>) {
        self.labels.push(label.into());
    }

    pub fn add_label_kv(&mut self, key: &str, value: &str) {
        self.labels.push(format!("{}:{}", key, value));
    }

    pub fn add_identifier(&mut self, identifier: impl Into<String>) {
        let identifier = identifier.into();
        if !self.identifiers.contains(&identifier) {
            self.identifiers.push(identifier);
        }
    }

    pub fn update_properties(&mut self, properties: Map<String, Value>) {
        self.custom_properties.extend(properties);
    }

    pub fn add_property(&mut self, name: impl Into<String>, value: Value) {
        self.custom_properties.insert(name.into(), value);
    }

    pub fn get_property(&self, name: &str) -> Option<&Value> {
        self.custom_properties.get(name)
    }

    /// Drop repeated labels, keeping first occurrences in order.
    pub fn dedup_labels(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.labels.retain(|label| seen.insert(label.clone()));
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Component {
    #[serde(rename = "externalId")]
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub component_type: ElementType,
    #[serde(rename = "data")]
    pub properties: ComponentProperties,
    #[serde(skip)]
    pub relations: Vec<RelationIntent>,
}

impl Component {
    pub fn name(&self) -> Option<&str> {
        self.properties.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.properties.name = Some(name.into());
    }

    pub fn component_type(&self) -> &str {
        &self.component_type.name
    }

    pub fn set_type(&mut self, name: impl Into<String>) {
        self.component_type.name = name.into();
    }

    pub fn add_relation(&mut self, intent: RelationIntent) {
        if !self.relations.contains(&intent) {
            self.relations.push(intent);
        }
    }
}

/// A closed set of string choices parsed from configuration values.
pub trait Choice: Sized + Copy {
    const ALL: &'static [&'static str];

    fn as_str(&self) -> &'static str;

    fn parse_choice(value: &str) -> Option<Self>;
}

macro_rules! string_choice {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl Choice for $name {
            const ALL: &'static [&'static str] = &[$($text),+];

            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            fn parse_choice(value: &str) -> Option<Self> {
                match value {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Self::parse_choice(value).ok_or_else(|| {
                    format!("'{}' not allowed. Valid values {:?}.", value, Self::ALL)
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_choice!(HealthState {
    Clear => "CLEAR",
    Deviating => "DEVIATING",
    Critical => "CRITICAL",
});

string_choice!(EventCategory {
    Activities => "Activities",
    Alerts => "Alerts",
    Anomalies => "Anomalies",
    Changes => "Changes",
    Others => "Others",
});

string_choice!(MetricType {
    Gauge => "gauge",
    Count => "count",
    MonotonicCount => "monotonic_count",
    Rate => "rate",
    Histogram => "histogram",
    Historate => "historate",
    Increment => "increment",
    Decrement => "decrement",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckState {
    #[serde(rename = "checkStateId")]
    pub check_id: String,
    #[serde(rename = "name")]
    pub check_name: String,
    #[serde(rename = "topologyElementIdentifier")]
    pub topo_identifier: String,
    pub message: String,
    pub health: HealthState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceLink {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventContext {
    pub category: EventCategory,
    pub data: Map<String, Value>,
    pub element_identifiers: Vec<String>,
    pub source: String,
    pub source_links: Vec<SourceLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub context: EventContext,
    pub event_type: String,
    pub msg_title: String,
    pub msg_text: String,
    pub source_type_name: String,
    pub tags: Vec<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub metric_type: MetricType,
    pub value: f64,
    pub target_uid: String,
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_relation_intent_parsing() {
        let cases = vec![
            ("urn:host:/h1", "uses", "urn:host:/h1"),
            ("runs_on|urn:host:/h1", "runs_on", "urn:host:/h1"),
            ("|urn:host:/h1", "uses", "urn:host:/h1"),
            (" hosted_by | h1 ", "hosted_by", "h1"),
        ];
        for (declaration, relation_type, target) in cases {
            let intent = RelationIntent::parse(declaration);
            assert_eq!(intent.relation_type, relation_type, "{}", declaration);
            assert_eq!(intent.target, target, "{}", declaration);
        }
    }

    #[test]
    fn test_component_serialized_names() {
        let mut component = Component::default();
        component.uid = Some("urn:vm:/a".to_string());
        component.set_type("vm");
        component.set_name("a");
        component.add_relation(RelationIntent::parse("urn:host:/h"));

        let value = serde_json::to_value(&component).unwrap();
        assert_eq!(value["externalId"], json!("urn:vm:/a"));
        assert_eq!(value["type"]["name"], json!("vm"));
        assert_eq!(value["data"]["layer"], json!("Unknown"));
        assert!(value.get("relations").is_none());
    }

    #[test]
    fn test_dedup_labels_keeps_first_occurrence() {
        let mut properties = ComponentProperties::default();
        for label in ["b", "a", "b", "c", "a"] {
            properties.add_label(label);
        }
        properties.dedup_labels();
        assert_eq!(properties.labels, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_identifiers_are_unique() {
        let mut properties = ComponentProperties::default();
        properties.add_identifier("x");
        properties.add_identifier("x");
        assert_eq!(properties.identifiers, vec!["x"]);
    }

    #[test]
    fn test_choices() {
        assert_eq!("monotonic_count".parse::<MetricType>(), Ok(MetricType::MonotonicCount));
        assert!("bogus".parse::<MetricType>().is_err());
        assert_eq!(HealthState::ALL, &["CLEAR", "DEVIATING", "CRITICAL"]);
        assert_eq!(serde_json::to_value(EventCategory::Alerts).unwrap(), json!("Alerts"));
        assert_eq!(MetricType::Gauge.to_string(), "gauge");
    }

    #[test]
    fn test_relation_defaults() {
        let relation = Relation::new("a", "b", DEFAULT_RELATION_TYPE);
        assert_eq!(relation.external_id, "a --> b");
        let value = serde_json::to_value(&relation).unwrap();
        assert_eq!(value["data"], json!({"labels": []}));
        assert_eq!(value["type"]["name"], json!("uses"));
    }
}
