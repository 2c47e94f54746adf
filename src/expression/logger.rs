// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use tracing::{debug, error, info, warn};

use crate::errors::EvalError;
use crate::expression::builtins::render;
use crate::expression::value::{CallArgs, Dynamic};
use crate::traits::HostObject;

/// The `log` binding. Messages go to `tracing` under the
/// `topology_etl::expression` target, tagged with the evaluating source.
#[derive(Debug, Clone)]
pub struct ScriptLogger {
    source: String,
}

impl ScriptLogger {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }
}

/// Substitute `%s`/`%d`/`%r` placeholders in order, logger style.
fn format_message(args: &CallArgs) -> Result<String, EvalError> {
    let template = match args.positional.first() {
        Some(first) => render(first),
        None => return Err(EvalError::arguments("log", "missing message")),
    };
    let mut rest = args.positional.iter().skip(1);
    let mut message = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '%' {
            match chars.peek() {
                Some('s') | Some('d') | Some('r') => {
                    chars.next();
                    match rest.next() {
                        Some(arg) => message.push_str(&render(arg)),
                        None => return Err(EvalError::arguments("log", "not enough arguments for format string")),
                    }
                    continue;
                }
                Some('%') => {
                    chars.next();
                }
                _ => {}
            }
        }
        message.push(c);
    }
    Ok(message)
}

impl HostObject for ScriptLogger {
    fn type_name(&self) -> &str {
        "log"
    }

    fn get_attr(&self, name: &str) -> Result<Dynamic, EvalError> {
        Err(EvalError::attribute(self.type_name(), name))
    }

    fn call_method(&mut self, name: &str, args: CallArgs) -> Result<Dynamic, EvalError> {
        let message = format_message(&args)?;
        let source = self.source.as_str();
        match name {
            "debug" => debug!(target: "topology_etl::expression", source, "{}", message),
            "info" => info!(target: "topology_etl::expression", source, "{}", message),
            "warning" | "warn" => warn!(target: "topology_etl::expression", source, "{}", message),
            "error" | "exception" => error!(target: "topology_etl::expression", source, "{}", message),
            other => return Err(EvalError::attribute(self.type_name(), other)),
        }
        Ok(Dynamic::null())
    }
}
