// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::rc::Rc;

use serde_json::Value;

use crate::config::consts::ROOT_MODEL_SOURCE;
use crate::config::{validate_models, Etl, InstanceInfo, ModelLoader, TemplateLookup};
use crate::errors::{ConfigError, EtlError, EtlResult};
use crate::etl::{
    interpreter_for, DataSourceClasses, DataSourceInterpreter, ProcessorInterpreter,
    QueryInterpreter, QueryProcessorInterpreter, TopologyContext,
};
use crate::observability::messages::etl::{
    ItemInterpretationFailed, ModelProcessing, QueryCounters, QueryItemsUnprocessed,
    QueryReturnedNoResults, TemplateSkipped,
};
use crate::observability::messages::StructuredLog;
use crate::topology::SharedFactory;

/// Loads every model an instance refers to and runs them in order.
///
/// Construction resolves refs, indexes templates and validates template
/// refs, so a driver that exists is known to be runnable.
pub struct EtlDriver<'a> {
    instance: &'a InstanceInfo,
    classes: &'a DataSourceClasses,
    models: Vec<Etl>,
    lookup: TemplateLookup,
}

impl<'a> EtlDriver<'a> {
    pub fn new(instance: &'a InstanceInfo, classes: &'a DataSourceClasses) -> Result<Self, ConfigError> {
        let mut root = instance.etl.clone();
        root.source = ROOT_MODEL_SOURCE.to_string();

        let models = ModelLoader::new(instance.module_root()).load(root)?;
        let lookup = TemplateLookup::from_models(&models);
        validate_models(&models, &lookup).map_err(ConfigError::Validation)?;

        Ok(Self {
            instance,
            classes,
            models,
            lookup,
        })
    }

    /// Models in processing order.
    pub fn models(&self) -> &[Etl] {
        &self.models
    }

    pub fn lookup(&self) -> &TemplateLookup {
        &self.lookup
    }

    /// Run every model against `factory`. Datasources are shared across models.
    pub fn process(&self, factory: &SharedFactory) -> EtlResult<()> {
        let mut ctx = TopologyContext::new(factory.clone(), self.instance);
        for model in &self.models {
            EtlProcessor::new(model, &self.lookup, self.classes).process(&mut ctx)?;
        }
        Ok(())
    }
}

/// Runs a single model: datasources, queries with their templates, then processors.
pub struct EtlProcessor<'a> {
    etl: &'a Etl,
    lookup: &'a TemplateLookup,
    classes: &'a DataSourceClasses,
}

impl<'a> EtlProcessor<'a> {
    pub fn new(etl: &'a Etl, lookup: &'a TemplateLookup, classes: &'a DataSourceClasses) -> Self {
        Self { etl, lookup, classes }
    }

    pub fn process(&self, ctx: &mut TopologyContext) -> EtlResult<()> {
        let message = ModelProcessing {
            source: &self.etl.source,
            queries: self.etl.queries.len(),
            processors: self.etl.processors.len(),
        };
        let span = message.span("process");
        let _guard = span.enter();
        message.log();

        self.init_datasources(ctx)?;
        self.process_queries(ctx)?;
        for processor in &self.etl.processors {
            ProcessorInterpreter::new(ctx).interpret(processor)?;
        }
        Ok(())
    }

    fn init_datasources(&self, ctx: &mut TopologyContext) -> EtlResult<()> {
        let interpreter = DataSourceInterpreter::new(self.classes);
        for datasource in &self.etl.datasources {
            interpreter.interpret(ctx, datasource)?;
        }
        Ok(())
    }

    fn process_queries(&self, ctx: &TopologyContext) -> EtlResult<()> {
        let mut counters = Vec::with_capacity(self.etl.queries.len());

        for query in &self.etl.queries {
            let items: Vec<Rc<Value>> = QueryInterpreter::new(ctx)
                .interpret(query)?
                .into_iter()
                .map(Rc::new)
                .collect();
            if items.is_empty() {
                QueryReturnedNoResults { query: &query.name }.log();
            }
            counters.push((query.name.clone(), items.len()));

            let mut processed = 0;
            for template_ref in &query.template_refs {
                let template = self
                    .lookup
                    .find(template_ref)
                    .ok_or_else(|| EtlError::TemplateNotFound(template_ref.clone()))?;
                let interpreter = interpreter_for(ctx, template);

                for item in &items {
                    let outcome = interpreter.active(item).and_then(|active| {
                        if active {
                            interpreter.interpret(item).map(|_| true)
                        } else {
                            Ok(false)
                        }
                    });
                    match outcome {
                        Ok(true) => processed += 1,
                        Ok(false) => TemplateSkipped {
                            template: template_ref,
                            query: &query.name,
                        }
                        .log(),
                        Err(error) => {
                            let payload = serde_json::to_string_pretty(item.as_ref())
                                .unwrap_or_else(|_| item.to_string());
                            ItemInterpretationFailed {
                                template: template_ref,
                                query: &query.name,
                                item: &payload,
                                error: &error,
                            }
                            .log();
                            return Err(error.into());
                        }
                    }
                }
            }

            if processed == 0 {
                QueryItemsUnprocessed {
                    query: &query.name,
                    items: items.len(),
                }
                .log();
            }
            QueryProcessorInterpreter::new(ctx).interpret(query)?;
        }

        QueryCounters {
            source: &self.etl.source,
            counters: &counters,
        }
        .log();
        Ok(())
    }
}
