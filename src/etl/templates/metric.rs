// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::config::{MetricSpec, MetricTemplate, TemplateBody};
use crate::errors::TemplateError;
use crate::etl::context::TopologyContext;
use crate::etl::scope::Scope;
use crate::etl::templates::{parse_choice, required, TemplateInterpreter};
use crate::expression::{Dynamic, ObjectRef};
use crate::topology::model::{Choice, MetricType};
use crate::topology::MetricDraft;

pub struct MetricTemplateInterpreter<'a> {
    ctx: &'a TopologyContext,
    template: &'a MetricTemplate,
}

impl<'a> MetricTemplateInterpreter<'a> {
    pub fn new(ctx: &'a TopologyContext, template: &'a MetricTemplate) -> Self {
        Self { ctx, template }
    }

    fn interpret_spec(
        &self,
        scope: &mut Scope<'_>,
        draft: &RefCell<MetricDraft>,
        spec: &MetricSpec,
    ) -> Result<(), TemplateError> {
        let template = self.template.name.as_str();

        let name = scope.string_property(spec.name.as_deref(), "name", None)?;
        let name = required(name, template, "name")?;
        let target_uid = scope.string_property(spec.target_uid.as_deref(), "target_uid", None)?;
        let metric_type = scope.string_property(
            spec.metric_type.as_deref(),
            "metric_type",
            Some(MetricType::Gauge.as_str()),
        )?;
        let metric_type: MetricType = parse_choice(metric_type, template, "metric_type")?;
        let value = scope.float_property(spec.value.as_deref(), "value", None)?;
        let tags = scope.list_property(spec.tags.as_ref(), "tags")?;
        let timestamp = scope.timestamp_property(spec.timestamp.as_deref(), "timestamp")?;

        let mut metric = draft.borrow_mut();
        metric.name = Some(name);
        metric.target_uid = target_uid;
        metric.metric_type = Some(metric_type);
        metric.value = value;
        metric.tags = tags;
        metric.timestamp = timestamp;
        Ok(())
    }
}

impl TemplateInterpreter for MetricTemplateInterpreter<'_> {
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
        let draft = Rc::new(RefCell::new(MetricDraft::default()));
        let mut scope = Scope::for_template(self.ctx, Rc::clone(item), &self.template.name);
        let handle: ObjectRef = draft.clone();
        scope.bind("metric", Dynamic::Object(handle));

        match &self.template.body {
            TemplateBody::Spec(spec) => self.interpret_spec(&mut scope, &draft, spec)?,
            TemplateBody::Code(code) => {
                scope.run_code(Some(code), "code")?;
            }
        }
        drop(scope);

        let metric = draft.borrow().build(&self.template.name)?;
        self.ctx.factory().borrow_mut().add_metric(metric);
        Ok(())
    }
}
