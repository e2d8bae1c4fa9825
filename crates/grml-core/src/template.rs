//! Code templates for the textual representation.
//!
//! A template is a list of lines with placeholders filled from the
//! function's current port names and property values:
//!
//! - `{param.N}` / `{ret.N}`: name of the N-th parameter / return value
//! - `{params}` / `{rets}`: all names joined with `,`
//! - `{prop.KEY}`: property value (strings unquoted, other JSON as text)
//! - `{{` and `}}`: literal braces
//!
//! Unknown placeholders and out-of-range indices render as empty text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::property::Properties;

/// Line template producing a function's code snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeTemplate {
    lines: Vec<String>,
}

impl CodeTemplate {
    pub fn new<S: Into<String>>(lines: impl IntoIterator<Item = S>) -> Self {
        CodeTemplate {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Renders every line.
    pub fn render(&self, params: &[&str], rets: &[&str], props: &Properties) -> Vec<String> {
        self.lines
            .iter()
            .map(|line| render_line(line, params, rets, props))
            .collect()
    }

    /// Renders and joins the lines with `\n`.
    pub fn render_code(&self, params: &[&str], rets: &[&str], props: &Properties) -> String {
        self.render(params, rets, props).join("\n")
    }
}

fn render_line(line: &str, params: &[&str], rets: &[&str], props: &Properties) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut token = String::new();
                let mut closed = false;
                for t in chars.by_ref() {
                    if t == '}' {
                        closed = true;
                        break;
                    }
                    token.push(t);
                }
                if closed {
                    out.push_str(&resolve(&token, params, rets, props));
                } else {
                    out.push('{');
                    out.push_str(&token);
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn resolve(token: &str, params: &[&str], rets: &[&str], props: &Properties) -> String {
    match token {
        "params" => return params.join(","),
        "rets" => return rets.join(","),
        _ => {}
    }

    if let Some(index) = token.strip_prefix("param.") {
        return indexed(params, index);
    }
    if let Some(index) = token.strip_prefix("ret.") {
        return indexed(rets, index);
    }
    if let Some(key) = token.strip_prefix("prop.") {
        return match props.value(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
    }
    String::new()
}

fn indexed(names: &[&str], index: &str) -> String {
    index
        .parse::<usize>()
        .ok()
        .and_then(|i| names.get(i))
        .map(|s| s.to_string())
        .unwrap_or_default()
}
