// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::config::{HealthSpec, HealthTemplate, TemplateBody};
use crate::errors::TemplateError;
use crate::etl::context::TopologyContext;
use crate::etl::scope::Scope;
use crate::etl::templates::{parse_choice, required, TemplateInterpreter};
use crate::expression::{Dynamic, ObjectRef};
use crate::topology::HealthDraft;

pub struct HealthTemplateInterpreter<'a> {
    ctx: &'a TopologyContext,
    template: &'a HealthTemplate,
}

impl<'a> HealthTemplateInterpreter<'a> {
    pub fn new(ctx: &'a TopologyContext, template: &'a HealthTemplate) -> Self {
        Self { ctx, template }
    }

    fn interpret_spec(
        &self,
        scope: &mut Scope<'_>,
        draft: &RefCell<HealthDraft>,
        spec: &HealthSpec,
    ) -> Result<(), TemplateError> {
        let template = self.template.name.as_str();

        let check_id = scope.string_property(spec.check_id.as_deref(), "check_id", None)?;
        let check_id = required(check_id, template, "check_id")?;
        let check_name = scope.string_property(spec.check_name.as_deref(), "check_name", None)?;
        let check_name = required(check_name, template, "check_name")?;
        let topo_identifier = scope.string_property(spec.topo_identifier.as_deref(), "topo_identifier", None)?;
        let topo_identifier = required(topo_identifier, template, "topo_identifier")?;
        let message = scope.string_property(spec.message.as_deref(), "message", Some(""))?;
        let health = scope.string_property(spec.health.as_deref(), "health", None)?;
        let health = parse_choice(health, template, "health")?;

        let mut state = draft.borrow_mut();
        state.check_id = Some(check_id);
        state.check_name = Some(check_name);
        state.topo_identifier = Some(topo_identifier);
        state.message = message.unwrap_or_default();
        state.health = Some(health);
        Ok(())
    }
}

impl TemplateInterpreter for HealthTemplateInterpreter<'_> {
    fn context(&self) -> &TopologyContext {
        self.ctx
    }

    fn template_name(&self) -> &str {
        &self.template.name
    }

    fn selector(&self) -> Option<&str> {
        self.template.selector.as_deref()
    }

    fn interpret(&self, item: &Rc<Value>) -> Result<(), TemplateError> {
        let draft = Rc::new(RefCell::new(HealthDraft::default()));
        let mut scope = Scope::for_template(self.ctx, Rc::clone(item), &self.template.name);
        let handle: ObjectRef = draft.clone();
        scope.bind("health", Dynamic::Object(handle));

        match &self.template.body {
            TemplateBody::Spec(spec) => self.interpret_spec(&mut scope, &draft, spec)?,
            TemplateBody::Code(code) => {
                scope.run_code(Some(code), "code")?;
            }
        }
        drop(scope);

        let state = draft.borrow().build(&self.template.name)?;
        self.ctx.factory().borrow_mut().add_health(state)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TopologyError;
    use crate::etl::templates::test_support::{context, templates};
    use crate::topology::HealthState;
    use serde_json::json;

    const HEALTH: &str = r#"
etl:
  template:
    health:
      - name: vm_power
        spec:
          check_id: "|item['uuid'] + '_power'"
          check_name: VmPower
          topo_identifier: "|uid('nutanix', 'vm', item['name'])"
          message: "|'Power state is ' + item['power_state']"
          health: "|'CLEAR' if item['power_state'] == 'ON' else 'CRITICAL'"
      - name: by_code
        code: |
          health.check_id = item['uuid'] + '_code'
          health.check_name = 'Code'
          health.topo_identifier = 'urn:x'
          health.health = 'DEVIATING'
      - name: no_state
        spec:
          check_id: a
          check_name: b
          topo_identifier: c
"#;

    fn item(power: &str) -> Rc<Value> {
        Rc::new(json!({"uuid": "vm-1", "name": "Web", "power_state": power}))
    }

    #[test]
    fn test_health_states() {
        let set = templates(HEALTH);
        let ctx = context();

        HealthTemplateInterpreter::new(&ctx, &set.health[0])
            .interpret(&item("OFF"))
            .unwrap();
        HealthTemplateInterpreter::new(&ctx, &set.health[1])
            .interpret(&item("ON"))
            .unwrap();

        let factory = ctx.factory().borrow();
        let power = &factory.health()["vm-1_power"];
        assert_eq!(power.health, HealthState::Critical);
        assert_eq!(power.message, "Power state is OFF");
        assert_eq!(power.topo_identifier, "urn:nutanix:vm/web");
        assert_eq!(factory.health()["vm-1_code"].health, HealthState::Deviating);
    }

    #[test]
    fn test_duplicate_check_and_missing_state() {
        let set = templates(HEALTH);
        let ctx = context();
        let power = HealthTemplateInterpreter::new(&ctx, &set.health[0]);

        power.interpret(&item("ON")).unwrap();
        assert!(matches!(
            power.interpret(&item("ON")),
            Err(TemplateError::Topology(TopologyError::DuplicateHealth(_)))
        ));

        let err = HealthTemplateInterpreter::new(&ctx, &set.health[2])
            .interpret(&item("ON"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Template no_state health '' not allowed. Valid values [\"CLEAR\", \"DEVIATING\", \"CRITICAL\"]."
        );
    }
}
