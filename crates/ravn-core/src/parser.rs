// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Extraction of tool calls from raw model output.
//!
//! Two encodings are accepted:
//!
//! - bracketed: `[name(param=value, ...), other(...)]`
//! - JSON: `{"function": "name", "param": value, ...}` (or `"name"` instead
//!   of `"function"`); an object without a name field maps to the default
//!   tool when one is configured
//!
//! The first `[` or `{` in the text picks the encoding.  Parsing is
//! fail-closed: anything that is not exactly one well-formed call block is a
//! [`ParseError`].

use std::fmt;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use ravn_tools::{Arguments, ToolCallRequest};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no tool call found in model output")]
    NoToolCall { raw: String },

    #[error("unbalanced `{open}` in model output")]
    Unbalanced { raw: String, open: char },

    #[error("malformed tool call: {reason}")]
    Malformed { raw: String, reason: String },

    #[error("text around the tool call contains further brackets or braces")]
    Ambiguous { raw: String },

    #[error("JSON tool call names no tool and no default tool is configured")]
    MissingToolName { raw: String },
}

impl ParseError {
    /// The model output that failed to parse, verbatim.
    pub fn raw(&self) -> &str {
        match self {
            ParseError::NoToolCall { raw }
            | ParseError::Unbalanced { raw, .. }
            | ParseError::Malformed { raw, .. }
            | ParseError::Ambiguous { raw }
            | ParseError::MissingToolName { raw } => raw,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToolCallParser {
    default_tool: Option<String>,
}

impl ToolCallParser {
    pub fn new(default_tool: Option<String>) -> Self {
        Self { default_tool }
    }

    pub fn default_tool(&self) -> Option<&str> {
        self.default_tool.as_deref()
    }

    /// Parse `raw` into tool call requests, left to right.
    pub fn parse(&self, raw: &str) -> Result<Vec<ToolCallRequest>, ParseError> {
        let text = raw.trim();
        let Some(start) = text.find(['[', '{']) else {
            return Err(ParseError::NoToolCall { raw: raw.to_string() });
        };
        let open = text[start..].chars().next().unwrap_or('[');
        let Some(len) = block_len(&text[start..]) else {
            return Err(ParseError::Unbalanced { raw: raw.to_string(), open });
        };
        let end = start + len;

        if has_delimiter(&text[..start]) || has_delimiter(&text[end..]) {
            return Err(ParseError::Ambiguous { raw: raw.to_string() });
        }

        let body = &text[start..end];
        let malformed = |reason: String| ParseError::Malformed { raw: raw.to_string(), reason };
        match open {
            '[' => parse_bracketed(body).map_err(malformed),
            _ => {
                let object = serde_json::from_str::<StrictObject>(body)
                    .map_err(|e| malformed(e.to_string()))?
                    .0;
                self.json_call(object, raw).map(|call| vec![call])
            }
        }
    }

    fn json_call(&self, mut object: Arguments, raw: &str) -> Result<ToolCallRequest, ParseError> {
        let malformed = |reason: &str| ParseError::Malformed {
            raw: raw.to_string(),
            reason: reason.to_string(),
        };
        let name = match (object.remove("function"), object.remove("name")) {
            (Some(_), Some(_)) => return Err(malformed("both `function` and `name` given")),
            (Some(Value::String(n)), None) | (None, Some(Value::String(n))) => n,
            (Some(_), None) | (None, Some(_)) => return Err(malformed("tool name must be a string")),
            (None, None) => self
                .default_tool
                .clone()
                .ok_or_else(|| ParseError::MissingToolName { raw: raw.to_string() })?,
        };
        if name.trim().is_empty() {
            return Err(malformed("empty tool name"));
        }
        Ok(ToolCallRequest::new(name, object))
    }
}

fn has_delimiter(s: &str) -> bool {
    s.contains(['[', ']', '{', '}'])
}

/// Byte length of the balanced block at the start of `s`.
///
/// Brackets inside quoted strings are ignored.  JSON blocks only know `"`
/// strings; bracketed blocks also accept `'`.  A mismatched closer counts as
/// unbalanced.
fn block_len(s: &str) -> Option<usize> {
    let single_quotes = s.starts_with('[');
    let mut stack: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if let Some(q) = quote {
            if escape_next {
                escape_next = false;
            } else if ch == '\\' {
                escape_next = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' => quote = Some('"'),
            '\'' if single_quotes => quote = Some('\''),
            '[' => stack.push(']'),
            '{' => stack.push('}'),
            ']' | '}' => {
                if stack.pop() != Some(ch) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i + ch.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

// ── Bracketed encoding ────────────────────────────────────────────────────────

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn eat(&mut self, want: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(want) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, want: char) -> Result<(), String> {
        if self.eat(want) {
            Ok(())
        } else {
            Err(match self.peek() {
                Some(c) => format!("expected `{want}`, found `{c}` at offset {}", self.pos),
                None => format!("expected `{want}`, found end of input"),
            })
        }
    }

    fn ident(&mut self) -> Result<&'a str, String> {
        self.skip_ws();
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' => {}
            Some(c) => return Err(format!("expected identifier, found `{c}` at offset {start}")),
            None => return Err("expected identifier, found end of input".into()),
        }
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            self.bump();
        }
        Ok(&self.src[start..self.pos])
    }

    fn value(&mut self) -> Result<Value, String> {
        self.skip_ws();
        match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.bump();
                self.quoted(q).map(Value::String)
            }
            _ => self.bare(),
        }
    }

    fn quoted(&mut self, q: char) -> Result<String, String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err("unterminated string".into()),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(c @ ('\\' | '"' | '\'')) => out.push(c),
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                    }
                    None => return Err("unterminated string".into()),
                },
                Some(c) if c == q => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }

    fn bare(&mut self) -> Result<Value, String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            match c {
                ',' | ')' => break,
                '(' | '[' | ']' | '{' | '}' | '=' | '"' | '\'' => {
                    return Err(format!("unexpected `{c}` in unquoted value at offset {}", self.pos))
                }
                _ => {
                    self.bump();
                }
            }
        }
        let literal = self.src[start..self.pos].trim();
        if literal.is_empty() {
            return Err(format!("missing value at offset {start}"));
        }
        // Kept as text; the registry coerces it to the declared parameter type.
        Ok(Value::String(literal.to_string()))
    }
}

fn parse_bracketed(body: &str) -> Result<Vec<ToolCallRequest>, String> {
    let mut cur = Cursor::new(body);
    cur.expect('[')?;
    if cur.eat(']') {
        return Err("empty call list".into());
    }
    let mut calls = Vec::new();
    loop {
        calls.push(parse_call(&mut cur)?);
        if cur.eat(',') {
            continue;
        }
        cur.expect(']')?;
        break;
    }
    cur.skip_ws();
    if cur.pos != body.len() {
        return Err(format!("trailing input at offset {}", cur.pos));
    }
    Ok(calls)
}

fn parse_call(cur: &mut Cursor<'_>) -> Result<ToolCallRequest, String> {
    let name = cur.ident()?.to_string();
    cur.expect('(')?;
    let mut arguments = Arguments::new();
    if !cur.eat(')') {
        loop {
            let key = cur.ident()?.to_string();
            cur.expect('=')?;
            let value = cur.value()?;
            if arguments.insert(key.clone(), value).is_some() {
                return Err(format!("duplicate argument `{key}` in call to `{name}`"));
            }
            if cur.eat(',') {
                continue;
            }
            cur.expect(')')?;
            break;
        }
    }
    Ok(ToolCallRequest::new(name, arguments))
}

// ── JSON encoding ─────────────────────────────────────────────────────────────

/// A JSON object whose top-level keys must be unique.  `serde_json` would
/// otherwise keep the last duplicate silently.
struct StrictObject(Map<String, Value>);

impl<'de> Deserialize<'de> for StrictObject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ObjectVisitor;

        impl<'de> Visitor<'de> for ObjectVisitor {
            type Value = StrictObject;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<StrictObject, A::Error> {
                let mut map = Map::new();
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    if map.contains_key(&key) {
                        return Err(serde::de::Error::custom(format!("duplicate key `{key}`")));
                    }
                    map.insert(key, value);
                }
                Ok(StrictObject(map))
            }
        }

        deserializer.deserialize_map(ObjectVisitor)
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parser() -> ToolCallParser {
        ToolCallParser::default()
    }

    fn args(v: Value) -> Arguments {
        v.as_object().cloned().unwrap()
    }

    // ── Bracketed ─────────────────────────────────────────────────────────────

    #[test]
    fn single_bracketed_call() {
        let calls = parser().parse(r#"[get_weather(city="Brisbane", metric="celsius")]"#).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "get_weather");
        assert_eq!(calls[0].arguments, args(json!({"city": "Brisbane", "metric": "celsius"})));
    }

    #[test]
    fn whitespace_is_insignificant() {
        let tight = parser().parse(r#"[f(a=1,b="x")]"#).unwrap();
        let loose = parser().parse("  [ f ( a = 1 ,\n b = \"x\" ) ]  ").unwrap();
        assert_eq!(tight, loose);
    }

    #[test]
    fn several_calls_keep_order() {
        let calls = parser()
            .parse(r#"[bash(command="ls"), get_weather(city='Oslo')]"#)
            .unwrap();
        let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["bash", "get_weather"]);
        assert_eq!(calls[1].arguments["city"], json!("Oslo"));
    }

    #[test]
    fn bare_literals_keep_their_text() {
        let calls = parser()
            .parse("[f(i=007, n=1.50, t=true, f=false, s=hello world)]")
            .unwrap();
        let a = &calls[0].arguments;
        assert_eq!(a["i"], json!("007"));
        assert_eq!(a["n"], json!("1.50"));
        assert_eq!(a["t"], json!("true"));
        assert_eq!(a["f"], json!("false"));
        assert_eq!(a["s"], json!("hello world"));
    }

    #[test]
    fn bare_word_command_validates_as_string() {
        let registry =
            ravn_tools::registry_from_config(&ravn_config::ToolsConfig::default()).unwrap();
        let calls = parser().parse("[bash(command=true)]").unwrap();
        let call = registry.validate(&calls[0].name, &calls[0].arguments).unwrap();
        assert_eq!(call.arguments["command"], json!("true"));
    }

    #[test]
    fn quoted_strings_keep_delimiters_and_escapes() {
        let calls = parser()
            .parse(r#"[bash(command="for i in {1..3}; do echo \"$i\"; done, ok")]"#)
            .unwrap();
        assert_eq!(
            calls[0].arguments["command"],
            json!(r#"for i in {1..3}; do echo "$i"; done, ok"#)
        );
    }

    #[test]
    fn call_without_arguments() {
        let calls = parser().parse("[now()]").unwrap();
        assert!(calls[0].arguments.is_empty());
    }

    #[test]
    fn surrounding_prose_without_delimiters_is_tolerated() {
        let calls = parser().parse(r#"Sure. [bash(command="date")] Done."#).unwrap();
        assert_eq!(calls[0].name, "bash");
    }

    #[test]
    fn duplicate_argument_is_rejected() {
        let err = parser().parse(r#"[f(a=1, a=2)]"#).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { ref reason, .. } if reason.contains("duplicate")));
    }

    #[test]
    fn empty_list_is_rejected() {
        assert!(matches!(parser().parse("[ ]"), Err(ParseError::Malformed { .. })));
    }

    #[test]
    fn junk_inside_the_list_is_rejected() {
        for raw in ["[bash]", "[bash(command)]", "[bash(command=\"ls\") extra]", "[f(a=(1))]", "[f(a=1,)]"] {
            assert!(
                matches!(parser().parse(raw), Err(ParseError::Malformed { .. })),
                "should reject {raw}"
            );
        }
    }

    #[test]
    fn unterminated_quote_is_unbalanced() {
        let err = parser().parse(r#"[bash(command="ls)]"#).unwrap_err();
        assert!(matches!(err, ParseError::Unbalanced { open: '[', .. }));
    }

    #[test]
    fn mismatched_closer_is_unbalanced() {
        assert!(matches!(parser().parse("[f(a=1)}"), Err(ParseError::Unbalanced { .. })));
    }

    #[test]
    fn second_block_is_ambiguous() {
        let raw = r#"[f(a=1)] or maybe [g(b=2)]"#;
        let err = parser().parse(raw).unwrap_err();
        assert!(matches!(err, ParseError::Ambiguous { .. }));
        assert_eq!(err.raw(), raw);
    }

    // ── JSON ──────────────────────────────────────────────────────────────────

    #[test]
    fn json_with_function_key() {
        let calls = parser().parse(r#"{"function": "bash", "command": "ls -la"}"#).unwrap();
        assert_eq!(calls, vec![ToolCallRequest::new("bash", args(json!({"command": "ls -la"})))]);
    }

    #[test]
    fn json_with_name_key() {
        let calls = parser().parse(r#"{"name": "get_weather", "city": "Oslo"}"#).unwrap();
        assert_eq!(calls[0].name, "get_weather");
        assert_eq!(calls[0].arguments, args(json!({"city": "Oslo"})));
    }

    #[test]
    fn json_without_name_uses_default_tool() {
        let p = ToolCallParser::new(Some("bash".into()));
        let calls = p.parse(r#"{"command":"echo hello world"}"#).unwrap();
        assert_eq!(calls[0].name, "bash");
        assert_eq!(calls[0].arguments["command"], json!("echo hello world"));
    }

    #[test]
    fn json_braces_inside_strings_are_ignored() {
        let p = ToolCallParser::new(Some("bash".into()));
        let calls = p.parse(r#"{"command":"for i in {1..5}; do echo $i; done"}"#).unwrap();
        assert_eq!(calls[0].arguments["command"], json!("for i in {1..5}; do echo $i; done"));
    }

    #[test]
    fn json_apostrophes_do_not_open_strings() {
        let p = ToolCallParser::new(Some("bash".into()));
        let calls = p.parse(r#"{"command":"echo 'Hello World'"}"#).unwrap();
        assert_eq!(calls[0].arguments["command"], json!("echo 'Hello World'"));
    }

    #[test]
    fn json_without_name_or_default_is_error() {
        let err = parser().parse(r#"{"command":"ls"}"#).unwrap_err();
        assert!(matches!(err, ParseError::MissingToolName { .. }));
    }

    #[test]
    fn json_with_both_name_keys_is_error() {
        let err = parser().parse(r#"{"function":"a","name":"b"}"#).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
    }

    #[test]
    fn json_duplicate_keys_are_error() {
        let err = parser()
            .parse(r#"{"function":"bash","command":"ls","command":"rm -rf /"}"#)
            .unwrap_err();
        assert!(matches!(err, ParseError::Malformed { ref reason, .. } if reason.contains("duplicate")));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = parser().parse(r#"{"function": bash}"#).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
    }

    // ── No call at all ────────────────────────────────────────────────────────

    #[test]
    fn prose_is_no_tool_call() {
        let raw = "I cannot help with that because no function fits.";
        let err = parser().parse(raw).unwrap_err();
        assert_eq!(err, ParseError::NoToolCall { raw: raw.into() });
    }

    #[test]
    fn stray_closer_in_prose_is_not_a_call() {
        assert!(matches!(parser().parse("see note 1)"), Err(ParseError::NoToolCall { .. })));
    }

    #[test]
    fn raw_is_kept_verbatim_including_whitespace() {
        let raw = "  nothing to do\n";
        assert_eq!(parser().parse(raw).unwrap_err().raw(), raw);
    }
}
