// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde_json::{json, Value};

use ravn_config::CallFormat;
use ravn_tools::ToolRegistry;

/// Bumped whenever the generated system prompt text changes.
pub const PROMPT_VERSION: u32 = 1;

/// Build the system prompt from the registered tool schemas.
///
/// `implicit_tool` is set when JSON replies may omit the tool name because
/// the parser maps name-less objects to a default tool.
pub fn system_prompt(tools: &ToolRegistry, format: CallFormat, implicit_tool: bool) -> String {
    let mut out = String::from(
        "You are an expert in composing functions. You are given a question and a set of \
         possible functions.\n\
         Based on the question, make the function call(s) that achieve the purpose.\n\
         If none of the functions can be used, point it out. If the question lacks the \
         parameters a function requires, also point it out.\n\n",
    );

    match format {
        CallFormat::Bracketed => out.push_str(
            "If you decide to invoke any of the functions, you MUST put it in the format of\n\
             [func_name1(param_name1=param_value1, param_name2=param_value2...), func_name2(params)]\n\
             Quote string values. You SHOULD NOT include any other text in the response.\n\n",
        ),
        CallFormat::Json if implicit_tool => out.push_str(
            "If you decide to invoke the function, reply with exactly one JSON object holding \
             its arguments, for example {\"param_name\": \"value\"}.\n\
             You SHOULD NOT include any other text in the response.\n\n",
        ),
        CallFormat::Json => out.push_str(
            "If you decide to invoke a function, reply with exactly one JSON object of the form\n\
             {\"function\": \"func_name\", \"param_name1\": param_value1, ...}\n\
             You SHOULD NOT include any other text in the response.\n\n",
        ),
    }

    out.push_str("Function signatures:\n");
    for schema in tools.schemas() {
        out.push_str(&format!("- {}\n", schema.signature()));
    }

    let listing: Vec<Value> = tools
        .schemas()
        .iter()
        .map(|s| {
            json!({
                "name": s.name,
                "description": s.description,
                "parameters": s.to_json_schema(),
            })
        })
        .collect();
    let pretty = serde_json::to_string_pretty(&listing).unwrap_or_else(|_| "[]".into());
    out.push_str("\nHere is the list of functions in JSON format that you can invoke.\n");
    out.push_str(&pretty);
    out
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ravn_config::ToolsConfig;

    fn registry(enabled: &[&str]) -> ToolRegistry {
        ravn_tools::registry_from_config(&ToolsConfig {
            enabled: enabled.iter().map(|s| s.to_string()).collect(),
            ..ToolsConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn bracketed_prompt_describes_format_and_tools() {
        let p = system_prompt(&registry(&["bash", "get_weather"]), CallFormat::Bracketed, false);
        assert!(p.contains("[func_name1("));
        assert!(p.contains("- bash(command: string)"));
        assert!(p.contains("\"name\": \"get_weather\""));
        assert!(p.contains("\"additionalProperties\": false"));
    }

    #[test]
    fn json_prompt_names_function_key() {
        let p = system_prompt(&registry(&["bash", "get_weather"]), CallFormat::Json, false);
        assert!(p.contains("{\"function\": \"func_name\""));
    }

    #[test]
    fn implicit_tool_prompt_asks_for_bare_arguments() {
        let p = system_prompt(&registry(&["bash"]), CallFormat::Json, true);
        assert!(!p.contains("\"function\""));
        assert!(p.contains("holding its arguments"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let reg = registry(&["bash"]);
        assert_eq!(
            system_prompt(&reg, CallFormat::Bracketed, false),
            system_prompt(&reg, CallFormat::Bracketed, false)
        );
    }
}
