//! Format templates for print sinks.
//!
//! A template is literal text with exactly one value placeholder: `{}` for
//! the default rendering or `{:.N}` for `N` decimal places. `{{` and `}}`
//! produce literal braces. Templates are parsed once, when the sink is
//! built, so a bad template fails before any data flows.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::types::Value;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatTemplate {
    source: String,
    prefix: String,
    suffix: String,
    precision: Option<usize>,
}

impl FormatTemplate {
    pub fn parse(template: &str) -> PipelineResult<Self> {
        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut precision = None;
        let mut seen_placeholder = false;

        let mut chars = template.chars().peekable();
        while let Some(c) = chars.next() {
            let target = if seen_placeholder {
                &mut suffix
            } else {
                &mut prefix
            };
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    target.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    target.push('}');
                }
                '{' => {
                    if seen_placeholder {
                        return Err(bad(template, "more than one placeholder"));
                    }
                    let mut spec = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => spec.push(ch),
                            None => return Err(bad(template, "unterminated placeholder")),
                        }
                    }
                    precision = parse_spec(template, &spec)?;
                    seen_placeholder = true;
                }
                '}' => return Err(bad(template, "unmatched '}'")),
                _ => target.push(c),
            }
        }

        if !seen_placeholder {
            return Err(bad(template, "missing '{}' placeholder"));
        }

        Ok(Self {
            source: template.to_string(),
            prefix,
            suffix,
            precision,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn render(&self, value: Value) -> String {
        let mut out = String::with_capacity(self.prefix.len() + self.suffix.len() + 24);
        out.push_str(&self.prefix);
        // Writing into a String cannot fail.
        let _ = match self.precision {
            Some(p) => write!(out, "{:.*}", p, value),
            None => write!(out, "{}", value),
        };
        out.push_str(&self.suffix);
        out
    }
}

impl Default for FormatTemplate {
    /// One value per line.
    fn default() -> Self {
        Self {
            source: "{}\n".to_string(),
            prefix: String::new(),
            suffix: "\n".to_string(),
            precision: None,
        }
    }
}

fn parse_spec(template: &str, spec: &str) -> PipelineResult<Option<usize>> {
    if spec.is_empty() {
        return Ok(None);
    }
    let digits = spec
        .strip_prefix(":.")
        .ok_or_else(|| bad(template, "only '{}' and '{:.N}' are supported"))?;
    digits
        .parse::<usize>()
        .map(Some)
        .map_err(|_| bad(template, "precision must be a non-negative integer"))
}

fn bad(template: &str, reason: &str) -> PipelineError {
    PipelineError::Config(format!("format template {:?}: {}", template, reason))
}

impl Serialize for FormatTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for FormatTemplate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        FormatTemplate::parse(&s).map_err(serde::de::Error::custom)
    }
}
