// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Host objects through which expressions reach the entity graph.
//!
//! `factory` is a [`FactoryHandle`] over the pass-wide [`SharedFactory`].
//! The entity under construction is bound as `component`, `event`, `metric`
//! or `health`; components registered earlier come back from factory lookups
//! as [`RegisteredComponent`] handles that edit the stored entity in place.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::errors::{EvalError, TemplateError, TopologyError};
use crate::expression::{type_name, CallArgs, Dynamic};
use crate::topology::factory::TopologyFactory;
use crate::topology::model::{
    Choice, Component, ComponentProperties, Event, EventCategory, EventContext, HealthCheckState,
    HealthState, Metric, MetricType, RelationIntent, SourceLink, DEFAULT_EVENT_SOURCE,
    DEFAULT_RELATION_TYPE,
};
use crate::traits::HostObject;

/// The factory shared by every interpreter of one synchronization pass.
pub type SharedFactory = Rc<RefCell<TopologyFactory>>;

pub fn shared_factory() -> SharedFactory {
    Rc::new(RefCell::new(TopologyFactory::new()))
}

fn string_value(attribute: &str, value: Value) -> Result<String, EvalError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(EvalError::type_error(format!(
            "'{}' must be str, not {}",
            attribute,
            type_name(&other)
        ))),
    }
}

fn optional_string(attribute: &str, value: Value) -> Result<Option<String>, EvalError> {
    match value {
        Value::Null => Ok(None),
        other => string_value(attribute, other).map(Some),
    }
}

fn string_list(attribute: &str, value: Value) -> Result<Vec<String>, EvalError> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| string_value(attribute, item))
            .collect(),
        other => Err(EvalError::type_error(format!(
            "'{}' must be list, not {}",
            attribute,
            type_name(&other)
        ))),
    }
}

fn dict_value(attribute: &str, value: Value) -> Result<Map<String, Value>, EvalError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(EvalError::type_error(format!(
            "'{}' must be dict, not {}",
            attribute,
            type_name(&other)
        ))),
    }
}

fn choice_value<C: Choice>(attribute: &str, value: Value) -> Result<Option<C>, EvalError> {
    match optional_string(attribute, value)? {
        None => Ok(None),
        Some(text) => C::parse_choice(&text).map(Some).ok_or_else(|| {
            EvalError::type_error(format!(
                "{} '{}' not allowed. Valid values {:?}.",
                attribute,
                text,
                C::ALL
            ))
        }),
    }
}

/// Epoch seconds (int or float) or an RFC 3339 string.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let seconds = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            Utc.timestamp_opt(seconds, 0).single()
        }
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        _ => None,
    }
}

fn timestamp_value(attribute: &str, value: Value) -> Result<Option<DateTime<Utc>>, EvalError> {
    if value.is_null() {
        return Ok(None);
    }
    parse_timestamp(&value).map(Some).ok_or_else(|| {
        EvalError::type_error(format!("'{}' is not a valid timestamp: {}", attribute, value))
    })
}

fn text_or_null(value: Option<&str>) -> Value {
    value.map(|s| Value::String(s.to_string())).unwrap_or(Value::Null)
}

fn strings(values: &[String]) -> Value {
    Value::Array(values.iter().cloned().map(Value::String).collect())
}

fn no_return() -> Result<Dynamic, EvalError> {
    Ok(Dynamic::null())
}

/// Component with its pending relation intents, as plain data.
fn component_value(component: &Component) -> Option<Value> {
    let mut value = serde_json::to_value(component).ok()?;
    if let Value::Object(map) = &mut value {
        let intents = component
            .relations
            .iter()
            .map(|intent| Value::String(intent.to_string()))
            .collect();
        map.insert("relations".to_string(), Value::Array(intents));
    }
    Some(value)
}

/// Inverse of the data view: a component dict, optionally carrying `relations`.
pub fn component_from_value(value: Value) -> Result<Component, EvalError> {
    let mut map = dict_value("component", value)?;
    let declarations = match map.remove("relations") {
        Some(Value::Null) | None => Vec::new(),
        Some(list) => string_list("relations", list)?,
    };
    let mut component: Component = serde_json::from_value(Value::Object(map))
        .map_err(|e| EvalError::type_error(format!("invalid component: {}", e)))?;
    for declaration in declarations {
        component.add_relation(RelationIntent::parse(&declaration));
    }
    Ok(component)
}

impl HostObject for Component {
    fn type_name(&self) -> &str {
        "Component"
    }

    fn get_attr(&self, name: &str) -> Result<Dynamic, EvalError> {
        let properties = &self.properties;
        let value = match name {
            "uid" => text_or_null(self.uid.as_deref()),
            "name" => text_or_null(self.name()),
            "type" | "component_type" => Value::String(self.component_type().to_string()),
            "layer" => Value::String(properties.layer.clone()),
            "domain" => Value::String(properties.domain.clone()),
            "environment" => Value::String(properties.environment.clone()),
            "labels" => strings(&properties.labels),
            "identifiers" => strings(&properties.identifiers),
            "custom_properties" => Value::Object(properties.custom_properties.clone()),
            "relations" => Value::Array(
                self.relations
                    .iter()
                    .map(|intent| Value::String(intent.to_string()))
                    .collect(),
            ),
            "properties" => serde_json::to_value(properties)
                .map_err(|e| EvalError::type_error(e.to_string()))?,
            _ => return Err(EvalError::attribute(self.type_name(), name)),
        };
        Ok(Dynamic::Value(value))
    }

    fn set_attr(&mut self, name: &str, value: Value) -> Result<(), EvalError> {
        let properties = &mut self.properties;
        match name {
            "uid" => self.uid = optional_string(name, value)?,
            "name" => properties.name = optional_string(name, value)?,
            "type" | "component_type" => self.component_type.name = string_value(name, value)?,
            "layer" => properties.layer = string_value(name, value)?,
            "domain" => properties.domain = string_value(name, value)?,
            "environment" => properties.environment = string_value(name, value)?,
            "labels" => properties.labels = string_list(name, value)?,
            "identifiers" => properties.identifiers = string_list(name, value)?,
            "custom_properties" => properties.custom_properties = dict_value(name, value)?,
            "relations" => {
                self.relations.clear();
                for declaration in string_list(name, value)? {
                    self.add_relation(RelationIntent::parse(&declaration));
                }
            }
            "properties" => {
                *properties = serde_json::from_value::<ComponentProperties>(value)
                    .map_err(|e| EvalError::type_error(format!("invalid properties: {}", e)))?
            }
            _ => return Err(EvalError::attribute(self.type_name(), name)),
        }
        Ok(())
    }

    fn call_method(&mut self, name: &str, args: CallArgs) -> Result<Dynamic, EvalError> {
        match name {
            "set_name" => self.set_name(args.required_str(name, 0, "name")?),
            "set_type" => self.set_type(args.required_str(name, 0, "name")?),
            "add_label" => self.properties.add_label(args.required_str(name, 0, "label")?),
            "add_label_kv" => {
                let key = args.required_str(name, 0, "key")?;
                let value = args.required_value(name, 1, "value")?;
                self.properties.add_label_kv(&key, &crate::expression::display(&value));
            }
            "add_identifier" => self
                .properties
                .add_identifier(args.required_str(name, 0, "identifier")?),
            "add_property" => {
                let key = args.required_str(name, 0, "name")?;
                let value = args.required_value(name, 1, "value")?;
                self.properties.add_property(key, value);
            }
            "update_properties" => {
                let properties = dict_value("properties", args.required_value(name, 0, "properties")?)?;
                self.properties.update_properties(properties);
            }
            "get_property" => {
                let key = args.required_str(name, 0, "name")?;
                let default = args.value(1, "default")?.unwrap_or(Value::Null);
                let value = self.properties.get_property(&key).cloned().unwrap_or(default);
                return Ok(Dynamic::Value(value));
            }
            "add_relation" => {
                let target = args.required_str(name, 0, "target")?;
                let intent = match args.optional_str(name, 1, "type")? {
                    Some(relation_type) => RelationIntent::new(target, relation_type),
                    None => RelationIntent::parse(&target),
                };
                self.add_relation(intent);
            }
            _ => return Err(EvalError::attribute(self.type_name(), name)),
        }
        no_return()
    }

    fn to_value(&self) -> Option<Value> {
        component_value(self)
    }
}

fn factory_busy() -> EvalError {
    EvalError::type_error("factory is in use by another operation")
}

/// A component already held by the factory, addressed by uid.
pub struct RegisteredComponent {
    factory: SharedFactory,
    uid: String,
}

impl RegisteredComponent {
    pub fn new(factory: SharedFactory, uid: impl Into<String>) -> Self {
        Self {
            factory,
            uid: uid.into(),
        }
    }

    fn with_component<T>(
        &self,
        apply: impl FnOnce(&mut Component) -> Result<T, EvalError>,
    ) -> Result<T, EvalError> {
        let mut factory = self.factory.try_borrow_mut().map_err(|_| factory_busy())?;
        let component = factory
            .get_component_mut(&self.uid)
            .ok_or_else(|| TopologyError::ComponentNotFound(format!("({})", self.uid)))?;
        apply(component)
    }
}

impl HostObject for RegisteredComponent {
    fn type_name(&self) -> &str {
        "Component"
    }

    fn get_attr(&self, name: &str) -> Result<Dynamic, EvalError> {
        self.with_component(|component| component.get_attr(name))
    }

    fn set_attr(&mut self, name: &str, value: Value) -> Result<(), EvalError> {
        if name == "uid" {
            return Err(EvalError::type_error(format!(
                "uid of registered component '{}' cannot change",
                self.uid
            )));
        }
        self.with_component(|component| component.set_attr(name, value))
    }

    fn call_method(&mut self, name: &str, args: CallArgs) -> Result<Dynamic, EvalError> {
        // Arguments that are themselves handles must be read before the factory is borrowed.
        let args = CallArgs {
            positional: args
                .positional
                .into_iter()
                .map(plain_argument)
                .collect::<Result<_, _>>()?,
            named: args
                .named
                .into_iter()
                .map(|(key, value)| plain_argument(value).map(|value| (key, value)))
                .collect::<Result<_, _>>()?,
        };
        self.with_component(|component| component.call_method(name, args))
    }

    fn to_value(&self) -> Option<Value> {
        let factory = self.factory.try_borrow().ok()?;
        factory.get_component(&self.uid).and_then(component_value)
    }
}

fn plain_argument(arg: Dynamic) -> Result<Dynamic, EvalError> {
    match arg {
        Dynamic::Object(_) => arg.into_value().map(Dynamic::Value),
        other => Ok(other),
    }
}

/// The `factory` binding.
pub struct FactoryHandle {
    factory: SharedFactory,
}

impl FactoryHandle {
    pub fn new(factory: SharedFactory) -> Self {
        Self { factory }
    }

    fn registered(&self, uid: Option<String>) -> Dynamic {
        match uid {
            Some(uid) => Dynamic::object(RegisteredComponent::new(self.factory.clone(), uid)),
            None => Dynamic::null(),
        }
    }

    fn uid_of(argument: Dynamic) -> Result<String, EvalError> {
        match argument.into_value()? {
            Value::String(uid) => Ok(uid),
            Value::Object(map) => match map.get("externalId") {
                Some(Value::String(uid)) => Ok(uid.clone()),
                _ => Err(EvalError::type_error("component has no uid")),
            },
            other => Err(EvalError::type_error(format!(
                "expected uid or component, not {}",
                type_name(&other)
            ))),
        }
    }

    fn add_component(&self, argument: Option<Dynamic>) -> Result<Dynamic, EvalError> {
        let component = match argument {
            None => return Err(TopologyError::NullComponent.into()),
            Some(arg) if arg.is_null() => return Err(TopologyError::NullComponent.into()),
            Some(arg) => component_from_value(arg.into_value()?)?,
        };
        let uid = {
            let mut factory = self.factory.try_borrow_mut().map_err(|_| factory_busy())?;
            factory.add_component(component)?.uid.clone()
        };
        Ok(self.registered(uid))
    }
}

fn collect_values<'a, I, T>(items: I) -> Result<Value, EvalError>
where
    I: IntoIterator<Item = (&'a String, &'a T)>,
    T: serde::Serialize + 'a,
{
    let mut map = Map::new();
    for (key, item) in items {
        let value = serde_json::to_value(item).map_err(|e| EvalError::type_error(e.to_string()))?;
        map.insert(key.clone(), value);
    }
    Ok(Value::Object(map))
}

impl HostObject for FactoryHandle {
    fn type_name(&self) -> &str {
        "TopologyFactory"
    }

    fn get_attr(&self, name: &str) -> Result<Dynamic, EvalError> {
        let factory = self.factory.try_borrow().map_err(|_| factory_busy())?;
        let value = match name {
            "components" => {
                let mut map = Map::new();
                for (uid, component) in factory.components() {
                    map.insert(uid.clone(), component_value(component).unwrap_or(Value::Null));
                }
                Value::Object(map)
            }
            "relations" => collect_values(factory.relations())?,
            "health" => collect_values(factory.health())?,
            "events" => serde_json::to_value(factory.events())
                .map_err(|e| EvalError::type_error(e.to_string()))?,
            "metrics" => serde_json::to_value(factory.metrics())
                .map_err(|e| EvalError::type_error(e.to_string()))?,
            "lookups" => Value::Object(factory.lookups().clone()),
            _ => return Err(EvalError::attribute(self.type_name(), name)),
        };
        Ok(Dynamic::Value(value))
    }

    fn set_attr(&mut self, name: &str, value: Value) -> Result<(), EvalError> {
        match name {
            "lookups" => {
                let lookups = dict_value(name, value)?;
                let mut factory = self.factory.try_borrow_mut().map_err(|_| factory_busy())?;
                *factory.lookups_mut() = lookups;
                Ok(())
            }
            _ => Err(EvalError::type_error(format!(
                "cannot set attribute '{}' on '{}'",
                name,
                self.type_name()
            ))),
        }
    }

    fn call_method(&mut self, name: &str, args: CallArgs) -> Result<Dynamic, EvalError> {
        match name {
            "add_component" => {
                args.expect_at_most(name, 1)?;
                self.add_component(args.get(0, "component").cloned())
            }
            "add_relation" => {
                let source = args.required_str(name, 0, "source_id")?;
                let target = args.required_str(name, 1, "target_id")?;
                let relation_type = args
                    .optional_str(name, 2, "type")?
                    .unwrap_or_else(|| DEFAULT_RELATION_TYPE.to_string());
                let mut factory = self.factory.try_borrow_mut().map_err(|_| factory_busy())?;
                let relation = factory.add_relation(&source, &target, &relation_type)?;
                let value = serde_json::to_value(relation)
                    .map_err(|e| EvalError::type_error(e.to_string()))?;
                Ok(Dynamic::Value(value))
            }
            "add_component_relations" => {
                let target = args
                    .get(0, "component")
                    .cloned()
                    .ok_or_else(|| EvalError::arguments(name, "missing required argument 'component'"))?;
                let uid = Self::uid_of(target)?;
                let declarations = string_list("relations", args.required_value(name, 1, "relations")?)?;
                let mut factory = self.factory.try_borrow_mut().map_err(|_| factory_busy())?;
                factory.add_component_relations(&uid, &declarations)?;
                no_return()
            }
            "get_component" => {
                let uid = args.required_str(name, 0, "uid")?;
                let raise_not_found = args.bool_or(1, "raise_not_found", true)?;
                let exists = {
                    let factory = self.factory.try_borrow().map_err(|_| factory_busy())?;
                    factory.component_exists(&uid)
                };
                if !exists && raise_not_found {
                    return Err(TopologyError::ComponentNotFound(format!("({})", uid)).into());
                }
                Ok(self.registered(exists.then_some(uid)))
            }
            "get_component_by_name" => {
                let component_name = args.required_str(name, 0, "name")?;
                let raise_not_found = args.bool_or(1, "raise_not_found", true)?;
                let uid = {
                    let factory = self.factory.try_borrow().map_err(|_| factory_busy())?;
                    factory
                        .get_component_by_name(&component_name, raise_not_found)?
                        .and_then(|c| c.uid.clone())
                };
                Ok(self.registered(uid))
            }
            "get_component_by_name_and_type" => {
                let component_type = args.required_str(name, 0, "component_type")?;
                let component_name = args.required_str(name, 1, "name")?;
                let raise_not_found = args.bool_or(2, "raise_not_found", true)?;
                let uid = {
                    let factory = self.factory.try_borrow().map_err(|_| factory_busy())?;
                    factory
                        .get_component_by_name_and_type(&component_type, &component_name, raise_not_found)?
                        .and_then(|c| c.uid.clone())
                };
                Ok(self.registered(uid))
            }
            "get_component_by_name_postfix" => {
                let postfix = args.required_str(name, 0, "postfix")?;
                let raise_not_found = args.bool_or(1, "raise_not_found", false)?;
                let uid = {
                    let factory = self.factory.try_borrow().map_err(|_| factory_busy())?;
                    factory
                        .get_component_by_name_postfix(&postfix, raise_not_found)?
                        .and_then(|c| c.uid.clone())
                };
                Ok(self.registered(uid))
            }
            "component_exists" => {
                let uid = args.required_str(name, 0, "uid")?;
                let factory = self.factory.try_borrow().map_err(|_| factory_busy())?;
                Ok(Dynamic::Value(Value::Bool(factory.component_exists(&uid))))
            }
            "relation_exists" => {
                let source = args.required_str(name, 0, "source_id")?;
                let target = args.required_str(name, 1, "target_id")?;
                let factory = self.factory.try_borrow().map_err(|_| factory_busy())?;
                Ok(Dynamic::Value(Value::Bool(factory.relation_exists(&source, &target))))
            }
            "get_uid" => {
                let integration = args.required_str(name, 0, "integration")?;
                let kind = args.required_str(name, 1, "type")?;
                let raw = args.required_str(name, 2, "name")?;
                Ok(Dynamic::Value(Value::String(TopologyFactory::get_uid(
                    &integration,
                    &kind,
                    &raw,
                ))))
            }
            "sanitize" => {
                let raw = args.required_str(name, 0, "value")?;
                Ok(Dynamic::Value(Value::String(TopologyFactory::sanitize(&raw))))
            }
            "set_lookup" => {
                let key = args.required_str(name, 0, "key")?;
                let value = args.required_value(name, 1, "value")?;
                let mut factory = self.factory.try_borrow_mut().map_err(|_| factory_busy())?;
                factory.set_lookup(key, value);
                no_return()
            }
            "get_lookup" => {
                let key = args.required_str(name, 0, "key")?;
                let default = args.value(1, "default")?.unwrap_or(Value::Null);
                let factory = self.factory.try_borrow().map_err(|_| factory_busy())?;
                Ok(Dynamic::Value(factory.get_lookup(&key).cloned().unwrap_or(default)))
            }
            _ => Err(EvalError::attribute(self.type_name(), name)),
        }
    }
}

fn required<T>(value: Option<T>, template: &str, field: &'static str) -> Result<T, TemplateError> {
    value.ok_or_else(|| TemplateError::MissingField {
        template: template.to_string(),
        field,
    })
}

fn required_text(value: Option<String>, template: &str, field: &'static str) -> Result<String, TemplateError> {
    required(value.filter(|s| !s.is_empty()), template, field)
}

/// Metric under construction.
#[derive(Debug, Clone, Default)]
pub struct MetricDraft {
    pub name: Option<String>,
    pub metric_type: Option<MetricType>,
    pub value: Option<f64>,
    pub target_uid: Option<String>,
    pub tags: Vec<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl MetricDraft {
    pub fn build(&self, template: &str) -> Result<Metric, TemplateError> {
        Ok(Metric {
            name: required_text(self.name.clone(), template, "name")?,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            metric_type: self.metric_type.unwrap_or(MetricType::Gauge),
            value: required(self.value, template, "value")?,
            target_uid: required_text(self.target_uid.clone(), template, "target_uid")?,
            tags: self.tags.clone(),
        })
    }
}

impl HostObject for MetricDraft {
    fn type_name(&self) -> &str {
        "Metric"
    }

    fn get_attr(&self, name: &str) -> Result<Dynamic, EvalError> {
        let value = match name {
            "name" => text_or_null(self.name.as_deref()),
            "metric_type" => text_or_null(self.metric_type.as_ref().map(|choice| choice.as_str())),
            "value" => self.value.map(Value::from).unwrap_or(Value::Null),
            "target_uid" => text_or_null(self.target_uid.as_deref()),
            "tags" => strings(&self.tags),
            "timestamp" => self
                .timestamp
                .map(|ts| Value::from(ts.timestamp()))
                .unwrap_or(Value::Null),
            _ => return Err(EvalError::attribute(self.type_name(), name)),
        };
        Ok(Dynamic::Value(value))
    }

    fn set_attr(&mut self, name: &str, value: Value) -> Result<(), EvalError> {
        match name {
            "name" => self.name = optional_string(name, value)?,
            "metric_type" => self.metric_type = choice_value(name, value)?,
            "value" => {
                self.value = match value {
                    Value::Null => None,
                    Value::Number(n) => n.as_f64(),
                    other => {
                        return Err(EvalError::type_error(format!(
                            "'value' must be numeric, not {}",
                            type_name(&other)
                        )))
                    }
                }
            }
            "target_uid" => self.target_uid = optional_string(name, value)?,
            "tags" => self.tags = string_list(name, value)?,
            "timestamp" => self.timestamp = timestamp_value(name, value)?,
            _ => return Err(EvalError::attribute(self.type_name(), name)),
        }
        Ok(())
    }

    fn call_method(&mut self, name: &str, args: CallArgs) -> Result<Dynamic, EvalError> {
        match name {
            "add_tag" => {
                self.tags.push(args.required_str(name, 0, "tag")?);
                no_return()
            }
            _ => Err(EvalError::attribute(self.type_name(), name)),
        }
    }
}

/// Event under construction.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub event_type: Option<String>,
    pub category: Option<EventCategory>,
    pub msg_title: Option<String>,
    pub msg_text: String,
    pub element_identifiers: Vec<String>,
    pub data: Map<String, Value>,
    pub source_links: Vec<SourceLink>,
    pub tags: Vec<String>,
    pub source: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Default for EventDraft {
    fn default() -> Self {
        Self {
            event_type: None,
            category: None,
            msg_title: None,
            msg_text: String::new(),
            element_identifiers: Vec::new(),
            data: Map::new(),
            source_links: Vec::new(),
            tags: Vec::new(),
            source: DEFAULT_EVENT_SOURCE.to_string(),
            timestamp: None,
        }
    }
}

impl EventDraft {
    pub fn build(&self, template: &str) -> Result<Event, TemplateError> {
        Ok(Event {
            context: EventContext {
                category: required(self.category, template, "category")?,
                data: self.data.clone(),
                element_identifiers: self.element_identifiers.clone(),
                source: self.source.clone(),
                source_links: self.source_links.clone(),
            },
            event_type: required_text(self.event_type.clone(), template, "event_type")?,
            msg_title: required_text(self.msg_title.clone(), template, "msg_title")?,
            msg_text: self.msg_text.clone(),
            source_type_name: self.source.clone(),
            tags: self.tags.clone(),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
        })
    }
}

fn source_links(value: Value) -> Result<Vec<SourceLink>, EvalError> {
    serde_json::from_value(value)
        .map_err(|e| EvalError::type_error(format!("invalid source_links: {}", e)))
}

impl HostObject for EventDraft {
    fn type_name(&self) -> &str {
        "Event"
    }

    fn get_attr(&self, name: &str) -> Result<Dynamic, EvalError> {
        let value = match name {
            "event_type" => text_or_null(self.event_type.as_deref()),
            "category" => text_or_null(self.category.as_ref().map(|choice| choice.as_str())),
            "msg_title" => text_or_null(self.msg_title.as_deref()),
            "msg_text" => Value::String(self.msg_text.clone()),
            "element_identifiers" => strings(&self.element_identifiers),
            "data" => Value::Object(self.data.clone()),
            "source_links" => serde_json::to_value(&self.source_links)
                .map_err(|e| EvalError::type_error(e.to_string()))?,
            "tags" => strings(&self.tags),
            "source" => Value::String(self.source.clone()),
            "timestamp" => self
                .timestamp
                .map(|ts| Value::from(ts.timestamp()))
                .unwrap_or(Value::Null),
            _ => return Err(EvalError::attribute(self.type_name(), name)),
        };
        Ok(Dynamic::Value(value))
    }

    fn set_attr(&mut self, name: &str, value: Value) -> Result<(), EvalError> {
        match name {
            "event_type" => self.event_type = optional_string(name, value)?,
            "category" => self.category = choice_value(name, value)?,
            "msg_title" => self.msg_title = optional_string(name, value)?,
            "msg_text" => self.msg_text = optional_string(name, value)?.unwrap_or_default(),
            "element_identifiers" => self.element_identifiers = string_list(name, value)?,
            "data" => self.data = dict_value(name, value)?,
            "source_links" => self.source_links = source_links(value)?,
            "tags" => self.tags = string_list(name, value)?,
            "source" => {
                self.source = optional_string(name, value)?
                    .unwrap_or_else(|| DEFAULT_EVENT_SOURCE.to_string())
            }
            "timestamp" => self.timestamp = timestamp_value(name, value)?,
            _ => return Err(EvalError::attribute(self.type_name(), name)),
        }
        Ok(())
    }

    fn call_method(&mut self, name: &str, args: CallArgs) -> Result<Dynamic, EvalError> {
        match name {
            "add_tag" => self.tags.push(args.required_str(name, 0, "tag")?),
            "add_source_link" => self.source_links.push(SourceLink {
                title: args.required_str(name, 0, "title")?,
                url: args.required_str(name, 1, "url")?,
            }),
            _ => return Err(EvalError::attribute(self.type_name(), name)),
        }
        no_return()
    }
}

/// Health check state under construction.
#[derive(Debug, Clone, Default)]
pub struct HealthDraft {
    pub check_id: Option<String>,
    pub check_name: Option<String>,
    pub topo_identifier: Option<String>,
    pub message: String,
    pub health: Option<HealthState>,
}

impl HealthDraft {
    pub fn build(&self, template: &str) -> Result<HealthCheckState, TemplateError> {
        Ok(HealthCheckState {
            check_id: required_text(self.check_id.clone(), template, "check_id")?,
            check_name: required_text(self.check_name.clone(), template, "check_name")?,
            topo_identifier: required_text(self.topo_identifier.clone(), template, "topo_identifier")?,
            message: self.message.clone(),
            health: required(self.health, template, "health")?,
        })
    }
}

impl HostObject for HealthDraft {
    fn type_name(&self) -> &str {
        "HealthCheckState"
    }

    fn get_attr(&self, name: &str) -> Result<Dynamic, EvalError> {
        let value = match name {
            "check_id" => text_or_null(self.check_id.as_deref()),
            "check_name" => text_or_null(self.check_name.as_deref()),
            "topo_identifier" => text_or_null(self.topo_identifier.as_deref()),
            "message" => Value::String(self.message.clone()),
            "health" => text_or_null(self.health.as_ref().map(|choice| choice.as_str())),
            _ => return Err(EvalError::attribute(self.type_name(), name)),
        };
        Ok(Dynamic::Value(value))
    }

    fn set_attr(&mut self, name: &str, value: Value) -> Result<(), EvalError> {
        match name {
            "check_id" => self.check_id = optional_string(name, value)?,
            "check_name" => self.check_name = optional_string(name, value)?,
            "topo_identifier" => self.topo_identifier = optional_string(name, value)?,
            "message" => self.message = optional_string(name, value)?.unwrap_or_default(),
            "health" => self.health = choice_value(name, value)?,
            _ => return Err(EvalError::attribute(self.type_name(), name)),
        }
        Ok(())
    }

    fn call_method(&mut self, name: &str, _args: CallArgs) -> Result<Dynamic, EvalError> {
        Err(EvalError::attribute(self.type_name(), name))
    }
}
