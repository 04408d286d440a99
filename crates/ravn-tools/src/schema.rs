// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde_json::{json, Map, Value};

/// Primitive type of a single tool parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    /// A string restricted to one of the listed values (exact match).
    Enum(Vec<String>),
}

impl ParamKind {
    /// Human-readable form used in validation errors and the system prompt.
    pub fn describe(&self) -> String {
        match self {
            ParamKind::String => "string".into(),
            ParamKind::Integer => "integer".into(),
            ParamKind::Number => "number".into(),
            ParamKind::Boolean => "boolean".into(),
            ParamKind::Enum(values) => {
                let quoted: Vec<String> = values.iter().map(|v| format!("\"{v}\"")).collect();
                format!("one of {}", quoted.join("|"))
            }
        }
    }

    fn json_schema(&self) -> Value {
        match self {
            ParamKind::String => json!({ "type": "string" }),
            ParamKind::Integer => json!({ "type": "integer" }),
            ParamKind::Number => json!({ "type": "number" }),
            ParamKind::Boolean => json!({ "type": "boolean" }),
            ParamKind::Enum(values) => json!({ "type": "string", "enum": values }),
        }
    }
}

/// Declaration of one named parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    /// Filled in by validation when an optional parameter is omitted.
    pub default: Option<Value>,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            default: None,
            description: description.into(),
        }
    }

    pub fn optional(
        name: impl Into<String>,
        kind: ParamKind,
        default: Option<Value>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            default,
            description: description.into(),
        }
    }
}

/// Declarative contract for one invocable action.
///
/// The same value drives the system prompt text, the JSON schema handed to
/// the backend as an output constraint, and argument validation.  Extra
/// parameters are always forbidden.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// Declared order is preserved; validation reports missing parameters
    /// in this order.
    pub parameters: Vec<ParamSpec>,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Builder-style parameter declaration.
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ParamSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// JSON Schema object describing the arguments of this tool.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for p in &self.parameters {
            let mut prop = p.kind.json_schema();
            if !p.description.is_empty() {
                prop["description"] = json!(p.description);
            }
            if let Some(d) = &p.default {
                prop["default"] = d.clone();
            }
            properties.insert(p.name.clone(), prop);
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Like [`to_json_schema`](Self::to_json_schema) but with a required
    /// `function` property pinned to this tool's name, so several tools can
    /// be combined under `oneOf`.
    pub fn to_discriminated_schema(&self) -> Value {
        let mut schema = self.to_json_schema();
        schema["properties"]["function"] = json!({ "const": self.name });
        if let Some(required) = schema["required"].as_array_mut() {
            required.insert(0, json!("function"));
        }
        schema
    }

    /// One-line call signature, e.g. `get_weather(city: string, metric: ... = "celsius")`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| {
                let mut s = format!("{}: {}", p.name, p.kind.describe());
                if let Some(d) = &p.default {
                    s.push_str(&format!(" = {d}"));
                } else if !p.required {
                    s.push_str(" (optional)");
                }
                s
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
