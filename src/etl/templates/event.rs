// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::config::{EventSpec, EventTemplate, TemplateBody};
use crate::errors::TemplateError;
use crate::etl::context::TopologyContext;
use crate::etl::scope::Scope;
use crate::etl::templates::{parse_choice, required, TemplateInterpreter};
use crate::expression::{Dynamic, ObjectRef};
use crate::topology::model::{SourceLink, DEFAULT_EVENT_SOURCE};
use crate::topology::EventDraft;

pub struct EventTemplateInterpreter<'a> {
    ctx: &'a TopologyContext,
    template: &'a EventTemplate,
}

impl<'a> EventTemplateInterpreter<'a> {
    pub fn new(ctx: &'a TopologyContext, template: &'a EventTemplate) -> Self {
        Self { ctx, template }
    }

    fn interpret_spec(
        &self,
        scope: &mut Scope<'_>,
        draft: &RefCell<EventDraft>,
        spec: &EventSpec,
    ) -> Result<(), TemplateError> {
        let template = self.template.name.as_str();

        let event_type = scope.string_property(spec.event_type.as_deref(), "event_type", None)?;
        let event_type = required(event_type, template, "event_type")?;
        let category = scope.string_property(spec.category.as_deref(), "category", None)?;
        let category = parse_choice(category, template, "category")?;
        let element_identifiers =
            scope.list_property(spec.element_identifiers.as_ref(), "element_identifiers")?;
        let data = scope.dict_property(spec.data.as_ref(), "data")?;

        let mut source_links = Vec::with_capacity(spec.source_links.len());
        for link in &spec.source_links {
            source_links.push(SourceLink {
                title: scope
                    .string_property(link.title.as_deref(), "sourcelink.title", None)?
                    .unwrap_or_default(),
                url: scope
                    .string_property(link.url.as_deref(), "sourcelink.url", None)?
                    .unwrap_or_default(),
            });
        }

        let tags = scope.list_property(spec.tags.as_ref(), "tags")?;
        let source = scope.string_property(spec.source.as_deref(), "source", Some(DEFAULT_EVENT_SOURCE))?;
        let msg_title = scope.string_property(spec.msg_title.as_deref(), "msg_title", None)?;
        let msg_title = required(msg_title, template, "msg_title")?;
        let msg_text = scope.string_property(spec.msg_text.as_deref(), "msg_text", Some(""))?;
        let timestamp = scope.timestamp_property(spec.timestamp.as_deref(), "timestamp")?;

        let mut event = draft.borrow_mut();
        event.event_type = Some(event_type);
        event.category = Some(category);
        event.element_identifiers = element_identifiers;
        event.data = data;
        event.source_links = source_links;
        event.tags = tags;
        event.source = source.unwrap_or_else(|| DEFAULT_EVENT_SOURCE.to_string());
        event.msg_title = Some(msg_title);
        event.msg_text = msg_text.unwrap_or_default();
        event.timestamp = timestamp;
        Ok(())
    }
}

impl TemplateInterpreter for EventTemplateInterpreter<'_> {
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
        let draft = Rc::new(RefCell::new(EventDraft::default()));
        let mut scope = Scope::for_template(self.ctx, Rc::clone(item), &self.template.name);
        let handle: ObjectRef = draft.clone();
        scope.bind("event", Dynamic::Object(handle));

        match &self.template.body {
            TemplateBody::Spec(spec) => self.interpret_spec(&mut scope, &draft, spec)?,
            TemplateBody::Code(code) => {
                scope.run_code(Some(code), "code")?;
            }
        }
        drop(scope);

        let event = draft.borrow().build(&self.template.name)?;
        self.ctx.factory().borrow_mut().add_event(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etl::templates::test_support::{context, templates};
    use crate::topology::EventCategory;
    use serde_json::json;

    fn alert() -> Rc<Value> {
        Rc::new(json!({
            "id": "alert-7",
            "title": "Disk almost full",
            "severity": "warning",
            "entity": "Web VM",
            "created": "2024-05-01T10:00:00Z",
            "link": "https://prism.local/alerts/alert-7"
        }))
    }

    #[test]
    fn test_spec_event() {
        let set = templates(
            r#"
etl:
  template:
    events:
      - name: alert
        spec:
          event_type: "|'Alert_' + item['severity']"
          category: Alerts
          msg_title: "$.title"
          msg_text: "|f\"{item['entity']} raised {item['id']}\""
          element_identifiers:
            - "|uid('nutanix', 'vm', item['entity'])"
          data:
            severity: "$.severity"
          source_links:
            - title: Prism
              url: "$.link"
          tags: ["source:prism"]
          timestamp: "$.created"
"#,
        );
        let ctx = context();
        EventTemplateInterpreter::new(&ctx, &set.events[0])
            .interpret(&alert())
            .unwrap();

        let factory = ctx.factory().borrow();
        let event = &factory.events()[0];
        assert_eq!(event.event_type, "Alert_warning");
        assert_eq!(event.context.category, EventCategory::Alerts);
        assert_eq!(event.msg_text, "Web VM raised alert-7");
        assert_eq!(event.context.element_identifiers, vec!["urn:nutanix:vm/web_vm"]);
        assert_eq!(event.context.source, "ETL");
        assert_eq!(event.source_type_name, "ETL");
        assert_eq!(event.context.source_links[0].url, "https://prism.local/alerts/alert-7");
        assert_eq!(event.tags, vec!["source:prism"]);
        assert_eq!(event.timestamp.timestamp(), 1_714_557_600);
        assert_eq!(Value::Object(event.context.data.clone()), json!({"severity": "warning"}));
    }

    #[test]
    fn test_code_event_and_invalid_category() {
        let set = templates(
            r#"
etl:
  template:
    events:
      - name: by_code
        code: |
          event.event_type = 'VmAlert'
          event.category = 'Activities'
          event.msg_title = item['title']
          event.add_tag('sev:' + item['severity'])
      - name: bad_category
        spec:
          event_type: x
          category: Gossip
          msg_title: y
"#,
        );
        let ctx = context();
        EventTemplateInterpreter::new(&ctx, &set.events[0])
            .interpret(&alert())
            .unwrap();
        assert_eq!(ctx.factory().borrow().events()[0].tags, vec!["sev:warning"]);

        let err = EventTemplateInterpreter::new(&ctx, &set.events[1])
            .interpret(&alert())
            .unwrap_err();
        assert!(matches!(err, TemplateError::InvalidChoice { field: "category", .. }));
        assert_eq!(ctx.factory().borrow().events().len(), 1);
    }
}
