//! Turning attribute values into command-line arguments.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::core::Attributes;
use crate::error::{PipelineError, Result};

static KW_STRING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(?:(\$)|\{([^}]+)\}|([A-Za-z_][A-Za-z0-9_]*))").expect("Invalid kw_string regex")
});

/// A `--name value` argument whose value comes from an attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordArg {
    pub name: String,
    pub attribute: String,
}

impl KeywordArg {
    pub fn new(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute: attribute.into(),
        }
    }
}

/// What a positional argument inserts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionalValue {
    /// The literal text
    Raw(String),
    /// The value of the named attribute
    Attribute(String),
}

/// An argument inserted at a fixed position after the command name.
///
/// Position 0 is the first argument. `-1` appends to the end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionalArg {
    pub value: PositionalValue,
    pub position: i32,
}

impl PositionalArg {
    pub fn raw(text: impl Into<String>, position: i32) -> Self {
        Self {
            value: PositionalValue::Raw(text.into()),
            position,
        }
    }

    pub fn attribute(name: impl Into<String>, position: i32) -> Self {
        Self {
            value: PositionalValue::Attribute(name.into()),
            position,
        }
    }
}

fn lookup<'a>(attributes: &'a Attributes, key: &str, context: &str) -> Result<&'a str> {
    attributes
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| PipelineError::constraint_not_found(key, context.to_string()))
}

/// Append each keyword argument as a single `--name value` token
pub fn apply_keyword_args(
    command: &mut Vec<String>,
    keywords: &[KeywordArg],
    attributes: &Attributes,
) -> Result<()> {
    for keyword in keywords {
        let value = lookup(attributes, &keyword.attribute, "keyword argument")?;
        command.push(format!("--{} {}", keyword.name, value));
    }
    Ok(())
}

/// Insert positional arguments in order.
///
/// Element 0 of `command` is the program, so position `p` lands at index
/// `p + 1`, clamped to the end of the list.
pub fn apply_positional_args(
    command: &mut Vec<String>,
    positionals: &[PositionalArg],
    attributes: &Attributes,
) -> Result<()> {
    for positional in positionals {
        let value = match &positional.value {
            PositionalValue::Raw(text) => text.clone(),
            PositionalValue::Attribute(name) => lookup(attributes, name, "positional argument")?.to_string(),
        };

        if positional.position < 0 {
            command.push(value);
        } else {
            let index = (positional.position as usize + 1).min(command.len());
            command.insert(index, value);
        }
    }
    Ok(())
}

/// Substitute `$name` and `${name}` references; `$$` is a literal `$`
pub fn render_kw_string(template: &str, attributes: &Attributes) -> Result<String> {
    let mut missing = None;
    let rendered = KW_STRING_REGEX.replace_all(template, |caps: &Captures| {
        if caps.get(1).is_some() {
            return "$".to_string();
        }
        let name = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or_default();
        match attributes.get(name) {
            Some(value) => value.clone(),
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(PipelineError::constraint_not_found(
            name,
            format!("keyword string '{template}'"),
        )),
        None => Ok(rendered.into_owned()),
    }
}
