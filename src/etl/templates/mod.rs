// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Template interpreters turn one item into one entity.
//!
//! Every interpreter follows the same steps: bind the item and a fresh
//! draft, check the selector, resolve fields from the `spec` or run the
//! `code`, validate required fields and register the entity with the
//! factory. An inactive item produces nothing and no error.

mod component;
mod event;
mod health;
mod metric;

pub use component::ComponentTemplateInterpreter;
pub use event::EventTemplateInterpreter;
pub use health::HealthTemplateInterpreter;
pub use metric::MetricTemplateInterpreter;

use std::rc::Rc;

use serde_json::Value;

use crate::config::TemplateRef;
use crate::errors::TemplateError;
use crate::etl::context::TopologyContext;
use crate::etl::scope::Scope;
use crate::topology::model::Choice;

pub trait TemplateInterpreter {
    fn context(&self) -> &TopologyContext;

    fn template_name(&self) -> &str;

    fn selector(&self) -> Option<&str>;

    /// Whether the selector accepts `item`. Templates without one accept everything.
    fn active(&self, item: &Rc<Value>) -> Result<bool, TemplateError> {
        let mut scope = Scope::for_template(self.context(), Rc::clone(item), self.template_name());
        scope.is_active(self.selector())
    }

    /// Build the entity for `item` and register it with the factory.
    fn interpret(&self, item: &Rc<Value>) -> Result<(), TemplateError>;
}

/// Pick the interpreter matching the template's kind.
pub fn interpreter_for<'a>(
    ctx: &'a TopologyContext,
    template: TemplateRef<'a>,
) -> Box<dyn TemplateInterpreter + 'a> {
    match template {
        TemplateRef::Component(template) => Box::new(ComponentTemplateInterpreter::new(ctx, template)),
        TemplateRef::Event(template) => Box::new(EventTemplateInterpreter::new(ctx, template)),
        TemplateRef::Metric(template) => Box::new(MetricTemplateInterpreter::new(ctx, template)),
        TemplateRef::Health(template) => Box::new(HealthTemplateInterpreter::new(ctx, template)),
    }
}

pub(crate) fn parse_choice<C: Choice>(
    value: Option<String>,
    template: &str,
    field: &'static str,
) -> Result<C, TemplateError> {
    let value = value.unwrap_or_default();
    C::parse_choice(&value).ok_or_else(|| TemplateError::InvalidChoice {
        template: template.to_string(),
        field,
        value,
        allowed: C::ALL,
    })
}

pub(crate) fn required<T>(value: Option<T>, template: &str, field: &'static str) -> Result<T, TemplateError> {
    value.ok_or_else(|| TemplateError::MissingField {
        template: template.to_string(),
        field,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::{EtlDocument, InstanceInfo, TemplateSet};
    use crate::etl::context::TopologyContext;
    use crate::topology::shared_factory;

    pub fn context() -> TopologyContext {
        let instance: InstanceInfo =
            serde_yaml::from_str("domain: Nutanix\nlayer: Machines\netl: {}\n").unwrap();
        TopologyContext::new(shared_factory(), &instance)
    }

    pub fn templates(yaml: &str) -> TemplateSet {
        let document: EtlDocument = serde_yaml::from_str(yaml).unwrap();
        document.etl.unwrap().template
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{context, templates};
    use super::*;
    use crate::config::TemplateLookup;
    use crate::config::Etl;
    use serde_json::json;

    #[test]
    fn test_dispatch_by_kind_and_selector() {
        let set = templates(
            r#"
etl:
  template:
    health:
      - name: power
        selector: "|item['state'] != 'on'"
        spec:
          check_id: "|'power_' + item['name']"
          check_name: Power
          topo_identifier: "|uid('nutanix', 'vm', item['name'])"
          health: CRITICAL
"#,
        );
        let etl = Etl {
            template: set,
            ..Etl::default()
        };
        let lookup = TemplateLookup::from_models(std::slice::from_ref(&etl));
        let ctx = context();
        let interpreter = interpreter_for(&ctx, lookup.find("power").unwrap());

        let running = Rc::new(json!({"name": "a", "state": "on"}));
        let stopped = Rc::new(json!({"name": "b", "state": "off"}));
        assert!(!interpreter.active(&running).unwrap());
        assert!(interpreter.active(&stopped).unwrap());

        interpreter.interpret(&stopped).unwrap();
        let factory = ctx.factory().borrow();
        let health = &factory.health()["power_b"];
        assert_eq!(health.topo_identifier, "urn:nutanix:vm/b");
    }

    #[test]
    fn test_parse_choice_reports_allowed_values() {
        let err = parse_choice::<crate::topology::MetricType>(Some("bogus".into()), "cpu", "metric_type")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Template cpu metric_type 'bogus' not allowed. Valid values [\"gauge\", \"count\", \"monotonic_count\", \"rate\", \"histogram\", \"historate\", \"increment\", \"decrement\"]."
        );
    }
}
