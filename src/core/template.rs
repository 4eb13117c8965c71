//! The `%name%` path template language.
//!
//! A template such as `/data/%model%/%variable%_%model%.nc` has three forms:
//! - a glob mask, where each unfixed placeholder becomes `*`
//! - an anchored regular expression, where each placeholder is a capture group
//! - a concrete path, once every placeholder has a value

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;

use super::constraint::{Constraint, ConstraintSet};
use super::metafile::Attributes;
use crate::error::{PipelineError, Result};

static PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%([^%\s]+?)%").expect("Invalid placeholder regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let mut segments = Vec::new();
        let mut last_end = 0;

        for cap in PLACEHOLDER_REGEX.captures_iter(&raw) {
            let (Some(full_match), Some(name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            if full_match.start() > last_end {
                segments.push(Segment::Literal(raw[last_end..full_match.start()].to_string()));
            }
            segments.push(Segment::Field(name.as_str().to_string()));
            last_end = full_match.end();
        }

        if last_end < raw.len() {
            segments.push(Segment::Literal(raw[last_end..].to_string()));
        }

        Self { raw, segments }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in order of appearance, repeats included
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Field(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// The distinct placeholder names
    pub fn keys(&self) -> BTreeSet<String> {
        self.field_names().map(str::to_string).collect()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field_names().any(|field| field == name)
    }

    /// One empty constraint per distinct placeholder
    pub fn empty_constraints(&self) -> ConstraintSet {
        self.keys().into_iter().map(Constraint::empty).collect()
    }

    /// Substitute every placeholder. A placeholder without a value is an error.
    pub fn render(&self, attributes: &Attributes) -> Result<String> {
        let mut rendered = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Field(name) => {
                    let value = attributes.get(name).ok_or_else(|| {
                        PipelineError::constraint_not_found(
                            name,
                            format!("no value to substitute into pattern '{}'", self.raw),
                        )
                    })?;
                    rendered.push_str(value);
                }
            }
        }
        Ok(rendered)
    }

    /// Build a glob mask: fixed placeholders are substituted, the rest become `*`.
    ///
    /// Literal text and fixed values are escaped so they only match themselves.
    pub fn glob_mask(&self, fixed: &Attributes) -> String {
        let mut mask = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => mask.push_str(&glob::Pattern::escape(text)),
                Segment::Field(name) => match fixed.get(name) {
                    Some(value) => mask.push_str(&glob::Pattern::escape(value)),
                    None => mask.push('*'),
                },
            }
        }
        mask
    }

    /// Compile the anchored matcher used to read attributes back out of a path
    pub fn matcher(&self) -> Result<TemplateMatcher> {
        let mut pattern = String::from("^");
        let mut groups = Vec::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
                Segment::Field(name) => {
                    pattern.push_str("(.+?)");
                    groups.push(name.clone());
                }
            }
        }
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| PipelineError::InvalidTemplate {
            template: self.raw.clone(),
            reason: e.to_string(),
        })?;

        Ok(TemplateMatcher { regex, groups })
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Extracts attribute values from a path.
///
/// A name that appears more than once in the template gets one capture group
/// per appearance; every appearance must capture the same value.
#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    regex: Regex,
    groups: Vec<String>,
}

impl TemplateMatcher {
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn capture(&self, path: &str) -> Option<Attributes> {
        let captures = self.regex.captures(path)?;
        let mut attributes = Attributes::new();

        for (index, name) in self.groups.iter().enumerate() {
            let value = captures.get(index + 1)?.as_str();
            match attributes.get(name) {
                Some(existing) if existing != value => return None,
                Some(_) => {}
                None => {
                    attributes.insert(name.clone(), value.to_string());
                }
            }
        }

        Some(attributes)
    }
}
