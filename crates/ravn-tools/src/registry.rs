// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Number, Value};
use tracing::debug;

use crate::error::{RegistryError, ValidationError};
use crate::schema::{ParamKind, ParamSpec, ToolSchema};
use crate::tool::{Arguments, ExecutionResult, Tool, ValidatedCall};

/// Central registry holding all available tools.
///
/// Read-only once the session starts: tools are registered at startup and
/// then only looked up.  Iteration follows registration order.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(Arc::new(tool));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| self.tools[i].clone())
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.schema().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Check `arguments` against the schema of `name`.
    ///
    /// Checks run in a fixed order (unknown tool, unexpected parameter,
    /// missing parameter, type mismatch) so the reported error is
    /// deterministic.  On success the arguments are coerced to their
    /// declared types and omitted optional parameters take their defaults.
    pub fn validate(&self, name: &str, arguments: &Arguments) -> Result<ValidatedCall, ValidationError> {
        let tool = self.get(name).ok_or_else(|| ValidationError::UnknownTool {
            name: name.to_string(),
        })?;
        let schema = tool.schema();

        let mut keys: Vec<&String> = arguments.keys().collect();
        keys.sort();
        if let Some(extra) = keys.into_iter().find(|k| schema.parameter(k).is_none()) {
            return Err(ValidationError::UnexpectedParameter {
                tool: schema.name.clone(),
                parameter: extra.clone(),
            });
        }

        if let Some(missing) = schema
            .parameters
            .iter()
            .find(|p| p.required && !arguments.contains_key(&p.name))
        {
            return Err(ValidationError::MissingParameter {
                tool: schema.name.clone(),
                parameter: missing.name.clone(),
            });
        }

        let mut coerced = Arguments::new();
        for spec in &schema.parameters {
            match arguments.get(&spec.name) {
                Some(value) => {
                    coerced.insert(spec.name.clone(), coerce(&schema.name, spec, value)?);
                }
                None => {
                    if let Some(d) = &spec.default {
                        coerced.insert(spec.name.clone(), d.clone());
                    }
                }
            }
        }

        Ok(ValidatedCall {
            name: schema.name.clone(),
            arguments: coerced,
        })
    }

    /// Run a validated call through its tool's handler.
    pub async fn dispatch(&self, call: &ValidatedCall) -> ExecutionResult {
        match self.get(&call.name) {
            Some(tool) => {
                debug!(tool = %call.name, "dispatching tool call");
                tool.execute(call).await
            }
            None => ExecutionResult::rejected(ValidationError::UnknownTool {
                name: call.name.clone(),
            }),
        }
    }

    /// Output-shape constraint covering every registered tool.
    ///
    /// A single tool yields its own argument schema; several tools yield a
    /// `oneOf` whose branches are told apart by a `function` const.
    pub fn output_constraint(&self) -> Option<Value> {
        match self.tools.as_slice() {
            [] => None,
            [only] => Some(only.schema().to_json_schema()),
            many => Some(json!({
                "oneOf": many
                    .iter()
                    .map(|t| t.schema().to_discriminated_schema())
                    .collect::<Vec<_>>()
            })),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn coerce(tool: &str, spec: &ParamSpec, value: &Value) -> Result<Value, ValidationError> {
    let coerced = match (&spec.kind, value) {
        (ParamKind::String, Value::String(_)) => Some(value.clone()),
        (ParamKind::Integer, Value::Number(n)) => {
            if n.is_i64() || n.is_u64() {
                Some(value.clone())
            } else {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| json!(f as i64))
            }
        }
        (ParamKind::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(|i| json!(i)),
        (ParamKind::Number, Value::Number(_)) => Some(value.clone()),
        (ParamKind::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        (ParamKind::Boolean, Value::Bool(_)) => Some(value.clone()),
        (ParamKind::Boolean, Value::String(s)) => match s.as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        (ParamKind::Enum(allowed), Value::String(s)) if allowed.iter().any(|a| a == s) => {
            Some(value.clone())
        }
        _ => None,
    };
    coerced.ok_or_else(|| ValidationError::TypeMismatch {
        tool: tool.to_string(),
        parameter: spec.name.clone(),
        expected: spec.kind.describe(),
        found: describe_value(value),
    })
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(_) => "array".into(),
        Value::Object(_) => "object".into(),
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
