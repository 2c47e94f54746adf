// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Queries produce the items templates run against; processors run free-form
//! code against the factory once per query or once per model.

use std::rc::Rc;

use serde_json::Value;

use crate::config::{ProcessorSpec, QuerySpec};
use crate::errors::EvaluationError;
use crate::etl::context::TopologyContext;
use crate::etl::scope::Scope;

pub struct QueryInterpreter<'a> {
    ctx: &'a TopologyContext,
}

impl<'a> QueryInterpreter<'a> {
    pub fn new(ctx: &'a TopologyContext) -> Self {
        Self { ctx }
    }

    /// Items produced by the query expression. `None` yields no items and a
    /// non-list result is treated as a single item.
    pub fn interpret(&self, query: &QuerySpec) -> Result<Vec<Value>, EvaluationError> {
        let mut scope = Scope::new(self.ctx, Rc::new(Value::Null), format!("query '{}'", query.name));
        let items = scope.run_for_value(Some(&query.query), "query")?;
        Ok(match items {
            Value::Null => Vec::new(),
            Value::Array(items) => items,
            item => vec![item],
        })
    }
}

pub struct QueryProcessorInterpreter<'a> {
    ctx: &'a TopologyContext,
}

impl<'a> QueryProcessorInterpreter<'a> {
    pub fn new(ctx: &'a TopologyContext) -> Self {
        Self { ctx }
    }

    pub fn interpret(&self, query: &QuerySpec) -> Result<(), EvaluationError> {
        let mut scope = Scope::new(self.ctx, Rc::new(Value::Null), format!("query '{}'", query.name));
        scope.run_code(query.processor.as_deref(), "processor")?;
        Ok(())
    }
}

pub struct ProcessorInterpreter<'a> {
    ctx: &'a TopologyContext,
}

impl<'a> ProcessorInterpreter<'a> {
    pub fn new(ctx: &'a TopologyContext) -> Self {
        Self { ctx }
    }

    pub fn interpret(&self, processor: &ProcessorSpec) -> Result<(), EvaluationError> {
        let mut scope = Scope::new(
            self.ctx,
            Rc::new(Value::Null),
            format!("processor '{}'", processor.name),
        );
        scope.run_code(Some(&processor.code), "code")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstanceInfo;
    use crate::expression::Dynamic;
    use crate::topology::shared_factory;
    use serde_json::json;

    fn context() -> TopologyContext {
        let instance: InstanceInfo = serde_yaml::from_str("etl: {}\n").unwrap();
        let mut ctx = TopologyContext::new(shared_factory(), &instance);
        ctx.register_datasource(
            "inventory",
            Dynamic::Value(json!({"vms": [{"name": "a"}, {"name": "b"}], "cluster": {"name": "c1"}})),
        );
        ctx
    }

    fn query(expression: &str) -> QuerySpec {
        QuerySpec {
            name: "test".to_string(),
            query: expression.to_string(),
            processor: None,
            template_refs: Vec::new(),
        }
    }

    #[test]
    fn test_query_results_are_coerced_to_lists() {
        struct TestCase {
            expression: &'static str,
            expected: Vec<Value>,
        }

        let cases = vec![
            TestCase {
                expression: "inventory['vms']",
                expected: vec![json!({"name": "a"}), json!({"name": "b"})],
            },
            TestCase {
                expression: "|inventory['cluster']",
                expected: vec![json!({"name": "c1"})],
            },
            TestCase {
                expression: "None",
                expected: vec![],
            },
        ];

        let ctx = context();
        for case in cases {
            let items = QueryInterpreter::new(&ctx).interpret(&query(case.expression)).unwrap();
            assert_eq!(items, case.expected, "{}", case.expression);
        }
    }

    #[test]
    fn test_processors_mutate_factory() {
        let ctx = context();
        let mut spec = query("[]");
        spec.processor = Some("factory.set_lookup('seen', len(inventory['vms']))".to_string());
        QueryProcessorInterpreter::new(&ctx).interpret(&spec).unwrap();

        let processor = ProcessorSpec {
            name: "summary".to_string(),
            code: "factory.set_lookup('total', factory.get_lookup('seen') + 1)".to_string(),
        };
        ProcessorInterpreter::new(&ctx).interpret(&processor).unwrap();

        let factory = ctx.factory().borrow();
        assert_eq!(factory.get_lookup("total"), Some(&json!(3)));
    }

    #[test]
    fn test_processor_failure_names_processor() {
        let ctx = context();
        let processor = ProcessorSpec {
            name: "broken".to_string(),
            code: "factory.get_component('urn:missing')".to_string(),
        };
        let err = ProcessorInterpreter::new(&ctx).interpret(&processor).unwrap_err();
        assert_eq!(err.source_name, "processor 'broken'");
        assert_eq!(err.property, "code");
    }
}
