// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::config::{ComponentSpec, ComponentTemplate, TemplateBody};
use crate::errors::TemplateError;
use crate::etl::context::TopologyContext;
use crate::etl::scope::Scope;
use crate::etl::templates::{required, TemplateInterpreter};
use crate::expression::{Dynamic, ObjectRef};
use crate::topology::model::{Component, RelationIntent, UNKNOWN};

pub struct ComponentTemplateInterpreter<'a> {
    ctx: &'a TopologyContext,
    template: &'a ComponentTemplate,
}

impl<'a> ComponentTemplateInterpreter<'a> {
    pub fn new(ctx: &'a TopologyContext, template: &'a ComponentTemplate) -> Self {
        Self { ctx, template }
    }

    fn interpret_spec(
        &self,
        scope: &mut Scope<'_>,
        draft: &RefCell<Component>,
        spec: &ComponentSpec,
    ) -> Result<(), TemplateError> {
        let template = self.template.name.as_str();
        let defaults = self.ctx.defaults();

        let component_type = scope.string_property(spec.component_type.as_deref(), "type", None)?;
        let name = scope.string_property(spec.name.as_deref(), "name", None)?;
        let name = required(name, template, "name")?;
        scope.set_source_name(name.clone());

        let layer = scope.string_property(spec.layer.as_deref(), "layer", Some(&defaults.layer))?;
        let domain = scope.string_property(spec.domain.as_deref(), "domain", Some(&defaults.domain))?;
        let environment =
            scope.string_property(spec.environment.as_deref(), "environment", Some(&defaults.environment))?;
        let labels = scope.list_property(spec.labels.as_ref(), "labels")?;
        let custom_properties = scope.dict_property(spec.custom_properties.as_ref(), "custom_properties")?;
        let uid = scope.string_property(spec.uid.as_deref(), "uid", None)?;
        let uid = required(uid, template, "uid")?;

        {
            let mut component = draft.borrow_mut();
            if let Some(component_type) = component_type {
                component.set_type(component_type);
            }
            component.set_name(name);
            let properties = &mut component.properties;
            properties.layer = layer.unwrap_or_else(|| UNKNOWN.to_string());
            properties.domain = domain.unwrap_or_else(|| UNKNOWN.to_string());
            properties.environment = environment.unwrap_or_else(|| UNKNOWN.to_string());
            properties.labels.extend(labels);
            properties.update_properties(custom_properties);
            component.uid = Some(uid);
        }

        // The processor sees the draft; uid may depend on what it changed.
        scope.run_code(spec.processor.as_deref(), "processor")?;
        let uid = scope.string_property(spec.uid.as_deref(), "uid", None)?;
        let uid = required(uid, template, "uid")?;

        let identifiers = scope.list_property(spec.identifiers.as_ref(), "identifiers")?;
        let relations = scope.list_property(spec.relations.as_ref(), "relations")?;

        let mut component = draft.borrow_mut();
        component.uid = Some(uid.clone());
        let properties = &mut component.properties;
        properties.identifiers.extend(identifiers);
        if spec.label_identifiers {
            let labels = properties.labels.clone();
            properties.identifiers.extend(labels);
        }
        properties.identifiers.push(uid);
        for declaration in relations {
            component.add_relation(RelationIntent::parse(&declaration));
        }
        Ok(())
    }

    fn interpret_code(
        &self,
        scope: &mut Scope<'_>,
        draft: &RefCell<Component>,
        code: &str,
    ) -> Result<(), TemplateError> {
        let template = self.template.name.as_str();
        scope.run_code(Some(code), "code")?;

        let mut component = draft.borrow_mut();
        required(component.name().map(str::to_string), template, "name")?;
        let defaults = self.ctx.defaults();
        let properties = &mut component.properties;
        if properties.layer == UNKNOWN {
            properties.layer = defaults.layer.clone();
        }
        if properties.domain == UNKNOWN {
            properties.domain = defaults.domain.clone();
        }
        let uid = required(component.uid.clone(), template, "uid")?;
        component.properties.add_identifier(uid);
        Ok(())
    }
}

impl TemplateInterpreter for ComponentTemplateInterpreter<'_> {
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
        let draft = Rc::new(RefCell::new(Component::default()));
        let mut scope = Scope::for_template(self.ctx, Rc::clone(item), &self.template.name);
        let handle: ObjectRef = draft.clone();
        scope.bind("component", Dynamic::Object(handle));

        match &self.template.body {
            TemplateBody::Spec(spec) => self.interpret_spec(&mut scope, &draft, spec)?,
            TemplateBody::Code(code) => self.interpret_code(&mut scope, &draft, code)?,
        }
        drop(scope);

        let component = draft.borrow().clone();
        self.ctx.factory().borrow_mut().add_component(component)?;
        Ok(())
    }
}
