// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Whole passes over real model files: the sample instance under
//! `configs/` and `resources/`, and small models written to temp directories.

use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::{load_instances, InstanceInfo};
use crate::errors::{EtlError, TemplateError, TopologyError};
use crate::etl::DataSourceClasses;
use crate::sync::{run_sync, EtlDriver};
use crate::topology::{shared_factory, HealthState, MetricType};

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    format!("file://{}", path.display())
}

fn instance(yaml: &str) -> InstanceInfo {
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
fn test_sample_instance_end_to_end() {
    let config = load_instances("configs/instances.yaml").unwrap();
    let lab = &config.instances[0];
    assert_eq!(lab.display_name(), "lab");

    let factory = run_sync(lab, &DataSourceClasses::with_builtins()).unwrap();

    let uids: Vec<_> = factory.components().keys().cloned().collect();
    assert_eq!(
        uids,
        vec![
            "urn:nutanix:cluster/lab_cluster",
            "urn:nutanix:host/host-a",
            "urn:nutanix:host/host-b",
            "urn:nutanix:vm/db_1",
            "urn:nutanix:vm/web_1",
        ]
    );

    let web = factory.get_component("urn:nutanix:vm/web_1").unwrap();
    assert_eq!(web.properties.layer, "Machines");
    assert_eq!(web.properties.domain, "Nutanix");
    assert_eq!(web.properties.labels, vec!["env:prod", "app:web"]);
    assert_eq!(
        web.properties.identifiers,
        vec!["urn:nutanix:uuid:vm-0001", "urn:nutanix:vm/web_1"]
    );

    let host = factory.get_component("urn:nutanix:host/host-a").unwrap();
    assert_eq!(host.properties.layer, "Hosts");
    assert_eq!(host.properties.get_property("memory_capacity_mb"), Some(&json!(262144)));

    let relations: Vec<_> = factory
        .relations()
        .values()
        .map(|r| format!("{} {}", r.external_id, r.relation_type.name))
        .collect();
    assert_eq!(
        relations,
        vec![
            "urn:nutanix:host/host-a --> urn:nutanix:cluster/lab_cluster is_part_of",
            "urn:nutanix:host/host-b --> urn:nutanix:cluster/lab_cluster is_part_of",
            "urn:nutanix:vm/db_1 --> urn:nutanix:cluster/lab_cluster is_part_of",
            "urn:nutanix:vm/db_1 --> urn:nutanix:host/host-b runs_on",
            "urn:nutanix:vm/web_1 --> urn:nutanix:cluster/lab_cluster is_part_of",
            "urn:nutanix:vm/web_1 --> urn:nutanix:host/host-a runs_on",
        ]
    );

    assert_eq!(factory.health().len(), 3);
    assert_eq!(factory.health()["vm-0003_power"].health, HealthState::Deviating);

    let cpu: Vec<_> = factory.metrics().iter().map(|m| m.value).collect();
    assert_eq!(cpu, vec![25.0, 50.0]);
    assert!(factory.metrics().iter().all(|m| m.metric_type == MetricType::Gauge));

    assert_eq!(factory.events().len(), 1);
    assert_eq!(factory.events()[0].msg_text, "Alert alert-0001 raised on Web 1");
    assert_eq!(factory.get_lookup("running_vms"), Some(&json!(2)));

    let snapshot = serde_json::to_value(factory.snapshot()).unwrap();
    assert_eq!(snapshot["components"].as_array().map(Vec::len), Some(5));
}

#[test]
fn test_selector_claims_subset_and_post_processor_runs_once() {
    let instance = instance(
        r#"
etl:
  datasources:
    - name: inventory
      module: etl.builtin
      cls: StaticDataSource
      init: |
        StaticDataSource([
          {'name': 'a', 'state': 'on'},
          {'name': 'b', 'state': 'off'},
          {'name': 'c', 'state': 'on'},
        ])
  queries:
    - name: vms
      query: "inventory.data()"
      template_refs: [vm]
      processor: "factory.set_lookup('post_runs', factory.get_lookup('post_runs', 0) + 1)"
  template:
    components:
      - name: vm
        selector: "|item['state'] == 'on'"
        spec:
          name: "$.name"
          type: vm
          uid: "|uid('lab', 'vm', item['name'])"
"#,
    );

    let factory = run_sync(&instance, &DataSourceClasses::with_builtins()).unwrap();
    assert_eq!(factory.components().len(), 2);
    assert!(factory.component_exists("urn:lab:vm/a"));
    assert!(factory.component_exists("urn:lab:vm/c"));
    assert_eq!(factory.get_lookup("post_runs"), Some(&json!(1)));
}

#[test]
fn test_refs_run_in_post_order_with_shared_datasources() {
    let dir = TempDir::new().unwrap();
    let record = |name: &str| {
        format!(
            "  processors:\n    - name: record\n      code: \"factory.set_lookup('order', factory.get_lookup('order', []) + ['{}', source.data()])\"\n",
            name
        )
    };
    let datasource = |value: &str| {
        format!(
            "  datasources:\n    - name: source\n      module: etl.builtin\n      cls: StaticDataSource\n      init: \"StaticDataSource('{}')\"\n",
            value
        )
    };

    let c = write(dir.path(), "c.yaml", &format!("etl:\n{}", record("c")));
    let a = write(
        dir.path(),
        "a.yaml",
        &format!("etl:\n{}{}", datasource("from-a"), record("a")),
    );
    let b = write(
        dir.path(),
        "b.yaml",
        &format!("etl:\n  refs: [\"{}\"]\n{}{}", c, datasource("from-b"), record("b")),
    );

    let instance = instance(&format!(
        "module_root: {}\netl:\n  refs: [\"{}\", \"{}\"]\n{}",
        dir.path().display(),
        a,
        b,
        record("root")
    ));
    let factory = run_sync(&instance, &DataSourceClasses::with_builtins()).unwrap();

    assert_eq!(
        factory.get_lookup("order"),
        Some(&json!(["a", "from-a", "c", "from-a", "b", "from-a", "root", "from-a"]))
    );
}

#[test]
fn test_bogus_metric_type_aborts_before_registration() {
    let instance = instance(
        r#"
etl:
  datasources:
    - name: inventory
      module: etl.builtin
      cls: StaticDataSource
      init: "StaticDataSource([{'name': 'h1', 'cpu': 10}])"
  queries:
    - name: hosts
      query: "inventory.data()"
      template_refs: [cpu]
  template:
    metrics:
      - name: cpu
        spec:
          name: host.cpu
          metric_type: bogus
          target_uid: "|uid('lab', 'host', item['name'])"
          value: "$.cpu"
"#,
    );
    let classes = DataSourceClasses::with_builtins();
    let driver = EtlDriver::new(&instance, &classes).unwrap();
    let factory = shared_factory();

    let err = driver.process(&factory).unwrap_err();
    assert!(matches!(
        err,
        EtlError::Template(TemplateError::InvalidChoice { field: "metric_type", .. })
    ));
    assert!(factory.borrow().metrics().is_empty());
}

#[test]
fn test_unresolved_relations_are_reported_after_resolvable_ones() {
    let instance = instance(
        r#"
etl:
  datasources:
    - name: inventory
      module: etl.builtin
      cls: StaticDataSource
      init: "StaticDataSource([{'name': 'app', 'uses': ['db', 'cache']}, {'name': 'db', 'uses': []}])"
  queries:
    - name: services
      query: "inventory.data()"
      template_refs: [service]
  template:
    components:
      - name: service
        spec:
          name: "$.name"
          type: service
          uid: "|uid('lab', 'service', item['name'])"
          identifiers:
            - "|'service:' + item['name']"
          relations: "|['service:' + u for u in item['uses']]"
"#,
    );
    let classes = DataSourceClasses::with_builtins();
    let driver = EtlDriver::new(&instance, &classes).unwrap();
    let factory = shared_factory();
    driver.process(&factory).unwrap();

    let mut factory = factory.borrow_mut();
    let err = factory.resolve_relations().unwrap_err();
    assert_eq!(
        err,
        TopologyError::UnresolvedRelations(vec!["urn:lab:service/app -> uses|service:cache".to_string()])
    );
    assert!(factory.relation_exists("urn:lab:service/app", "urn:lab:service/db"));
    assert_eq!(factory.relations().len(), 1);

    // A second pass adds nothing new and reports the same target.
    assert!(factory.resolve_relations().is_err());
    assert_eq!(factory.relations().len(), 1);

    let instance_err = run_sync(&instance, &classes).unwrap_err();
    assert!(matches!(
        instance_err,
        EtlError::Topology(TopologyError::UnresolvedRelations(_))
    ));
}

#[test]
fn test_missing_template_and_evaluation_errors_carry_context() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("items.json");
    fs::write(&data, r#"[{"name": "x"}]"#).unwrap();

    let instance = instance(&format!(
        r#"
etl:
  datasources:
    - name: inventory
      module: etl.builtin
      cls: FileDataSource
      init: "FileDataSource('{}')"
  queries:
    - name: things
      query: "inventory.data()"
      template_refs: [thing]
  template:
    events:
      - name: thing
        spec:
          event_type: "|item['kind'].upper()"
          category: Changes
          msg_title: "$.name"
"#,
        data.display()
    ));

    let err = run_sync(&instance, &DataSourceClasses::with_builtins()).unwrap_err();
    match err {
        EtlError::Template(TemplateError::Evaluation(e)) => {
            assert_eq!(e.property, "event_type");
            assert_eq!(e.source_name, "template 'thing'");
            assert_eq!(e.expression, "item['kind'].upper()");
        }
        other => panic!("unexpected {:?}", other),
    }

    let value: Value = serde_json::from_str(&fs::read_to_string(&data).unwrap()).unwrap();
    assert_eq!(value, json!([{"name": "x"}]));
}

fn code_component_instance(code: &str) -> InstanceInfo {
    let indented: String = code.lines().map(|line| format!("          {}\n", line)).collect();
    instance(&format!(
        r#"
etl:
  datasources:
    - name: inventory
      module: etl.builtin
      cls: StaticDataSource
      init: "StaticDataSource([{{'name': 'x'}}])"
  queries:
    - name: things
      query: "inventory.data()"
      template_refs: [thing]
  template:
    components:
      - name: thing
        code: |
{}"#,
        indented
    ))
}

#[test]
fn test_component_passed_to_its_own_methods() {
    let instance = code_component_instance(
        "component.set_name('x'); component.uid = 'u'\ncomponent.add_property('me', component)\ncomponent.update_properties({'copy': component})",
    );

    let factory = run_sync(&instance, &DataSourceClasses::with_builtins()).unwrap();
    let component = factory.get_component("u").unwrap();
    assert_eq!(component.properties.get_property("me").map(|me| &me["externalId"]), Some(&json!("u")));
    assert!(component.properties.get_property("copy").is_some());
}

#[test]
fn test_oversized_sequences_fail_the_pass_with_context() {
    struct TestCase {
        code: &'static str,
    }

    let cases = vec![
        TestCase { code: "component.set_name('x' * 100000000000000000)" },
        TestCase { code: "component.set_name(str(['x'] * 9223372036854775807))" },
        TestCase { code: "component.set_name(str(len(range(100000000000))))" },
    ];

    for case in cases {
        let err = run_sync(&code_component_instance(case.code), &DataSourceClasses::with_builtins()).unwrap_err();
        match err {
            EtlError::Template(TemplateError::Evaluation(e)) => {
                assert_eq!(e.source_name, "template 'thing'", "{}", case.code);
                assert!(e.to_string().contains("maximum length"), "{}: {}", case.code, e);
            }
            other => panic!("{} raised unexpected {:?}", case.code, other),
        }
    }
}
