// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::DEFAULT_MODULE_ROOT;
use crate::errors::{ConfigError, ValidationError};
use crate::topology::model::UNKNOWN;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// A document holding one ETL model under the top-level `etl` key.
#[derive(Debug, Deserialize)]
pub struct EtlDocument {
    pub etl: Option<Etl>,
}

/// One declarative ETL model.
///
/// Models reference each other through `refs`; the loader flattens the
/// reference tree into a processing order (see [`crate::config::ModelLoader`]).
///
/// # Example
/// ```yaml
/// etl:
///   refs:
///     - "module_dir://templates.nutanix"
///   datasources:
///     - name: inventory
///       module: etl.builtin
///       cls: FileDataSource
///       init: "FileDataSource('resources/data/vms.json')"
///   queries:
///     - name: vms
///       query: "inventory.list('$.entities[*]')"
///       template_refs: [vm]
///   processors:
///     - name: summary
///       code: "log.info('%s components', len(factory.components))"
///   template:
///     components:
///       - name: vm
///         spec:
///           name: "$.name"
///           type: vm
///           uid: "|uid('nutanix', 'vm', item['uuid'])"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Etl {
    pub refs: Vec<String>,
    pub datasources: Vec<DataSourceSpec>,
    pub queries: Vec<QuerySpec>,
    pub processors: Vec<ProcessorSpec>,
    pub template: TemplateSet,
    /// Where the model was loaded from; set by the loader.
    #[serde(skip)]
    pub source: String,
}

impl Etl {
    pub fn template_count(&self) -> usize {
        let t = &self.template;
        t.components.len() + t.events.len() + t.metrics.len() + t.health.len()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataSourceSpec {
    pub name: String,
    pub module: String,
    pub cls: String,
    pub init: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuerySpec {
    pub name: String,
    pub query: String,
    #[serde(default)]
    pub processor: Option<String>,
    pub template_refs: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorSpec {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplateSet {
    pub components: Vec<ComponentTemplate>,
    pub events: Vec<EventTemplate>,
    pub metrics: Vec<MetricTemplate>,
    pub health: Vec<HealthTemplate>,
}

pub type ComponentTemplate = Template<ComponentSpec>;
pub type EventTemplate = Template<EventSpec>;
pub type MetricTemplate = Template<MetricSpec>;
pub type HealthTemplate = Template<HealthSpec>;

/// A named recipe turning one item into one entity.
///
/// Exactly one of `spec` and `code` must be present; documents violating
/// that fail to parse.
#[derive(Debug, Clone, Deserialize)]
#[serde(
    try_from = "RawTemplate<S>",
    bound(deserialize = "S: Deserialize<'de>")
)]
pub struct Template<S> {
    pub name: String,
    pub selector: Option<String>,
    pub body: TemplateBody<S>,
}

#[derive(Debug, Clone)]
pub enum TemplateBody<S> {
    Spec(S),
    Code(String),
}

#[derive(Deserialize)]
struct RawTemplate<S> {
    name: String,
    #[serde(default)]
    selector: Option<String>,
    #[serde(default = "Option::default")]
    spec: Option<S>,
    #[serde(default)]
    code: Option<String>,
}

impl<S> TryFrom<RawTemplate<S>> for Template<S> {
    type Error = ValidationError;

    fn try_from(raw: RawTemplate<S>) -> Result<Self, Self::Error> {
        let body = match (raw.spec, raw.code) {
            (Some(_), Some(_)) => {
                return Err(ValidationError::TemplateBodyConflict { template: raw.name })
            }
            (Some(spec), None) => TemplateBody::Spec(spec),
            (None, Some(code)) => TemplateBody::Code(code),
            (None, None) => return Err(ValidationError::TemplateBodyMissing { template: raw.name }),
        };
        Ok(Template {
            name: raw.name,
            selector: raw.selector,
            body,
        })
    }
}

/// A list-valued field: one expression yielding a list, or a list of
/// per-element values.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ListSpec {
    Expression(String),
    Items(Vec<Value>),
}

/// A dict-valued field: one expression yielding a dict, or literal entries
/// whose values are resolved one by one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DictSpec {
    Expression(String),
    Entries(Map<String, Value>),
}

/// Scalar spec values arrive as strings; YAML numbers and booleans are kept
/// as their text so `value: 5` behaves like `value: "5"`.
fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected a scalar value, found {}",
                other
            )))
        }
    })
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComponentSpec {
    #[serde(default, deserialize_with = "scalar_text")]
    pub name: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "scalar_text")]
    pub component_type: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub uid: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub layer: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub domain: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub environment: Option<String>,
    #[serde(default)]
    pub labels: Option<ListSpec>,
    #[serde(default)]
    pub identifiers: Option<ListSpec>,
    #[serde(default)]
    pub custom_properties: Option<DictSpec>,
    #[serde(default)]
    pub relations: Option<ListSpec>,
    /// Code run after the base fields are resolved.
    #[serde(default)]
    pub processor: Option<String>,
    /// Fold labels into identifiers.
    #[serde(default = "default_true")]
    pub label_identifiers: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceLinkSpec {
    #[serde(default, deserialize_with = "scalar_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventSpec {
    #[serde(default, deserialize_with = "scalar_text")]
    pub event_type: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub msg_title: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub msg_text: Option<String>,
    #[serde(default)]
    pub element_identifiers: Option<ListSpec>,
    #[serde(default)]
    pub data: Option<DictSpec>,
    #[serde(default)]
    pub source_links: Vec<SourceLinkSpec>,
    #[serde(default)]
    pub tags: Option<ListSpec>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricSpec {
    #[serde(default, deserialize_with = "scalar_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub metric_type: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub target_uid: Option<String>,
    #[serde(default)]
    pub tags: Option<ListSpec>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthSpec {
    #[serde(default, deserialize_with = "scalar_text")]
    pub check_id: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub check_name: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub topo_identifier: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub health: Option<String>,
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// One monitored instance: entity defaults plus the root ETL model.
///
/// Keys not listed here are kept in `extra` and reach datasource
/// initializers through `conf`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "unknown")]
    pub domain: String,
    #[serde(default = "unknown")]
    pub layer: String,
    #[serde(default = "unknown")]
    pub environment: String,
    #[serde(default)]
    pub module_root: Option<PathBuf>,
    pub etl: Etl,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize)]
struct ConfView<'a> {
    name: Option<&'a str>,
    domain: &'a str,
    layer: &'a str,
    environment: &'a str,
    module_root: &'a Path,
}

impl InstanceInfo {
    /// Display name used in logs.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("default")
    }

    pub fn module_root(&self) -> PathBuf {
        self.module_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODULE_ROOT))
    }

    /// The `conf` binding seen by datasource initializers.
    pub fn conf_value(&self) -> Value {
        let module_root = self.module_root();
        let view = ConfView {
            name: self.name.as_deref(),
            domain: &self.domain,
            layer: &self.layer,
            environment: &self.environment,
            module_root: &module_root,
        };
        let mut conf = match serde_json::to_value(view) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for (key, value) in &self.extra {
            conf.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Value::Object(conf)
    }
}

/// Top-level instance configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceConfig {
    pub instances: Vec<InstanceInfo>,
}

pub(crate) fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the instance configuration from a YAML file.
pub fn load_instances<P: AsRef<Path>>(path: P) -> Result<InstanceConfig, ConfigError> {
    let path = path.as_ref();
    let content = read_file(path)?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a single ETL model document (YAML or JSON) without following its refs.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Etl, ConfigError> {
    let path = path.as_ref();
    let content = read_file(path)?;
    let document: EtlDocument =
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    let mut etl = document.etl.ok_or_else(|| ConfigError::MissingEtl {
        path: path.to_path_buf(),
    })?;
    etl.source = path.display().to_string();
    Ok(etl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_model() {
        let yaml = r#"
etl:
  datasources:
    - name: inventory
      module: etl.builtin
      cls: StaticDataSource
      init: "StaticDataSource({'vms': []})"
  queries:
    - name: vms
      query: "inventory.list('$.vms[*]')"
      template_refs: [vm, vm_cpu]
  template:
    components:
      - name: vm
        selector: "|item['kind'] == 'vm'"
        spec:
          name: "$.name"
          type: vm
          uid: "|uid('demo', 'vm', item['name'])"
          labels: ["env:prod", "$.zone"]
          custom_properties:
            cores: "$.cores"
    metrics:
      - name: vm_cpu
        spec:
          name: cpu
          value: 5
          target_uid: "|uid('demo', 'vm', item['name'])"
"#;
        let document: EtlDocument = serde_yaml::from_str(yaml).unwrap();
        let etl = document.etl.unwrap();

        assert_eq!(etl.datasources[0].cls, "StaticDataSource");
        assert_eq!(etl.queries[0].template_refs, vec!["vm", "vm_cpu"]);
        assert!(etl.queries[0].processor.is_none());

        let vm = &etl.template.components[0];
        assert_eq!(vm.selector.as_deref(), Some("|item['kind'] == 'vm'"));
        match &vm.body {
            TemplateBody::Spec(spec) => {
                assert_eq!(spec.component_type.as_deref(), Some("vm"));
                assert!(spec.label_identifiers);
                assert_eq!(
                    spec.labels,
                    Some(ListSpec::Items(vec![
                        Value::String("env:prod".into()),
                        Value::String("$.zone".into())
                    ]))
                );
                assert!(matches!(spec.custom_properties, Some(DictSpec::Entries(_))));
            }
            TemplateBody::Code(_) => panic!("expected spec body"),
        }

        match &etl.template.metrics[0].body {
            TemplateBody::Spec(spec) => assert_eq!(spec.value.as_deref(), Some("5")),
            TemplateBody::Code(_) => panic!("expected spec body"),
        }
        assert_eq!(etl.template_count(), 2);
    }

    #[test]
    fn template_body_must_be_exclusive() {
        struct TestCase {
            name: &'static str,
            yaml: &'static str,
            expected: &'static str,
        }

        let cases = vec![
            TestCase {
                name: "both",
                yaml: "name: t\nspec: {name: a}\ncode: \"component.set_name('a')\"\n",
                expected: "cannot have both spec and code",
            },
            TestCase {
                name: "neither",
                yaml: "name: t\nselector: \"|True\"\n",
                expected: "must have either spec or code",
            },
        ];

        for case in cases {
            let err = serde_yaml::from_str::<ComponentTemplate>(case.yaml).unwrap_err();
            assert!(
                err.to_string().contains(case.expected),
                "{}: {}",
                case.name,
                err
            );
        }
    }

    #[test]
    fn instance_defaults_and_conf() {
        let yaml = r#"
name: lab
domain: Nutanix
url: https://prism.example:9440
etl:
  refs: ["module_dir://templates"]
"#;
        let instance: InstanceInfo = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(instance.layer, "Unknown");
        assert_eq!(instance.module_root(), PathBuf::from("resources"));
        assert_eq!(instance.etl.refs.len(), 1);

        let conf = instance.conf_value();
        assert_eq!(conf["domain"], "Nutanix");
        assert_eq!(conf["url"], "https://prism.example:9440");
        assert_eq!(conf["module_root"], "resources");
    }

    #[test]
    fn document_without_etl_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.yaml");
        std::fs::write(&path, "other: 1\n").unwrap();

        let err = load_model(&path).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEtl { .. }));

        let missing = load_model(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
