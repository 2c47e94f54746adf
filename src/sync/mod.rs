// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! One synchronization pass: load the instance's models, run them against a
//! fresh factory and materialize the relations components declared.
//!
//! # Example
//! ```rust
//! use topology_etl::config::InstanceInfo;
//! use topology_etl::etl::DataSourceClasses;
//! use topology_etl::sync::run_sync;
//!
//! let instance: InstanceInfo = serde_yaml::from_str(r#"
//! etl:
//!   datasources:
//!     - name: inventory
//!       module: etl.builtin
//!       cls: StaticDataSource
//!       init: "StaticDataSource([{'name': 'Web 1'}, {'name': 'Web 2'}])"
//!   queries:
//!     - name: vms
//!       query: "inventory.data()"
//!       template_refs: [vm]
//!   template:
//!     components:
//!       - name: vm
//!         spec:
//!           name: "$.name"
//!           type: vm
//!           uid: "|uid('lab', 'vm', item['name'])"
//! "#).unwrap();
//!
//! let factory = run_sync(&instance, &DataSourceClasses::with_builtins()).unwrap();
//! assert!(factory.component_exists("urn:lab:vm/web_1"));
//! assert_eq!(factory.components().len(), 2);
//! ```

mod driver;
#[cfg(test)]
mod integration_tests;

pub use driver::{EtlDriver, EtlProcessor};

use std::rc::Rc;
use std::time::Instant;

use crate::config::InstanceInfo;
use crate::errors::EtlResult;
use crate::etl::DataSourceClasses;
use crate::observability::messages::topology::SyncCompleted;
use crate::observability::messages::StructuredLog;
use crate::topology::{shared_factory, TopologyFactory};

/// Run one pass for `instance` and return the finished graph.
///
/// Fails on the first configuration, evaluation or graph error; there is no
/// partial result. Relation intents that match no component are reported
/// after every resolvable one has been materialized.
pub fn run_sync(instance: &InstanceInfo, classes: &DataSourceClasses) -> EtlResult<TopologyFactory> {
    let started = Instant::now();
    let span = tracing::info_span!("sync", instance = instance.display_name());
    let _guard = span.enter();

    let driver = EtlDriver::new(instance, classes)?;
    let shared = shared_factory();
    driver.process(&shared)?;

    let mut factory = match Rc::try_unwrap(shared) {
        Ok(cell) => cell.into_inner(),
        Err(shared) => shared.borrow().clone(),
    };
    factory.resolve_relations()?;

    SyncCompleted {
        instance: instance.display_name(),
        components: factory.components().len(),
        relations: factory.relations().len(),
        health: factory.health().len(),
        events: factory.events().len(),
        metrics: factory.metrics().len(),
        duration: started.elapsed(),
    }
    .log();
    Ok(factory)
}
