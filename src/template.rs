//! Field interpolation for configuration strings.
//!
//! A template is literal text with `{{ field }}` placeholders. Rendering a
//! template against a [`LogEvent`] replaces every placeholder with the string
//! form of the referenced field.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use snafu::Snafu;

use crate::event::LogEvent;

static RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(?P<key>[^\}]+)\}\}").expect("template regex is valid")
});

/// Errors raised while parsing a template string.
#[derive(Clone, Debug, Eq, PartialEq, Snafu)]
pub enum TemplateParseError {
    /// A `{{ }}` placeholder does not name a field.
    #[snafu(display("Template {src:?} contains an empty field reference"))]
    EmptyReference {
        /// The template source.
        src: String,
    },
}

/// Errors raised while rendering a template against an event.
#[derive(Clone, Debug, Eq, PartialEq, Snafu)]
pub enum TemplateRenderingError {
    /// Some referenced fields are absent or null.
    #[snafu(display("Missing fields on event: {missing_keys:?}"))]
    MissingKeys {
        /// The referenced fields that could not be found.
        missing_keys: Vec<String>,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Part {
    Literal(String),
    Reference(String),
}

/// A string with `{{ field }}` placeholders resolved per event.
///
/// A template serializes to its source text and deserializes by scanning that
/// text for placeholders.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Template {
    src: String,
    parts: Vec<Part>,
}

impl Template {
    /// Creates a template that always renders `src` verbatim.
    ///
    /// The source is not scanned for field references. Serializing keeps only
    /// the source, so a literal containing `{{ }}` reads back as a dynamic
    /// template.
    pub fn literal(src: impl Into<String>) -> Self {
        let src = src.into();
        let parts = vec![Part::Literal(src.clone())];
        Self { src, parts }
    }

    /// Returns true if rendering depends on the event.
    pub fn is_dynamic(&self) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, Part::Reference(_)))
    }

    /// The fields referenced by this template, in order of appearance.
    pub fn get_fields(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Reference(key) => Some(key.as_str()),
                Part::Literal(_) => None,
            })
            .collect()
    }

    /// The source text the template was built from.
    pub fn get_ref(&self) -> &str {
        &self.src
    }

    /// Renders the template against `event`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateRenderingError::MissingKeys`] naming every referenced
    /// field that is absent from the event or null.
    pub fn render_string(&self, event: &LogEvent) -> Result<String, TemplateRenderingError> {
        let mut missing_keys = Vec::new();
        let mut out = String::with_capacity(self.src.len());

        for part in &self.parts {
            match part {
                Part::Literal(lit) => out.push_str(lit),
                Part::Reference(key) => match event.get(key) {
                    Some(value) if !value.is_null() => out.push_str(&value.to_string_lossy()),
                    _ => missing_keys.push(key.clone()),
                },
            }
        }

        if missing_keys.is_empty() {
            Ok(out)
        } else {
            MissingKeysSnafu { missing_keys }.fail()
        }
    }
}

fn parse_template(src: &str) -> Result<Vec<Part>, TemplateParseError> {
    let mut parts = Vec::new();
    let mut last_end = 0;

    for caps in RE.captures_iter(src) {
        let (Some(all), Some(key)) = (caps.get(0), caps.name("key")) else {
            continue;
        };
        if all.start() > last_end {
            parts.push(Part::Literal(src[last_end..all.start()].to_owned()));
        }

        let key = key.as_str().trim();
        if key.is_empty() {
            return EmptyReferenceSnafu { src }.fail();
        }
        parts.push(Part::Reference(key.to_owned()));
        last_end = all.end();
    }

    if last_end < src.len() {
        parts.push(Part::Literal(src[last_end..].to_owned()));
    }

    Ok(parts)
}

impl TryFrom<&str> for Template {
    type Error = TemplateParseError;

    fn try_from(src: &str) -> Result<Self, Self::Error> {
        Self::try_from(src.to_owned())
    }
}

impl TryFrom<String> for Template {
    type Error = TemplateParseError;

    fn try_from(src: String) -> Result<Self, Self::Error> {
        let parts = parse_template(&src)?;
        Ok(Self { src, parts })
    }
}

impl From<Template> for String {
    fn from(template: Template) -> String {
        template.src
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.src.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn event() -> LogEvent {
        LogEvent::try_from(json!({
            "host": "web-1",
            "app": { "name": "nginx" },
            "pid": 42,
            "nothing": null,
        }))
        .unwrap()
    }

    #[test]
    fn static_template() {
        let template = Template::try_from("Elastic").unwrap();
        assert!(!template.is_dynamic());
        assert_eq!(template.render_string(&event()).unwrap(), "Elastic");
    }

    #[test]
    fn dynamic_template() {
        let template = Template::try_from("{{ app.name }} on {{host}} ({{ pid }})").unwrap();
        assert!(template.is_dynamic());
        assert_eq!(template.get_fields(), vec!["app.name", "host", "pid"]);
        assert_eq!(
            template.render_string(&event()).unwrap(),
            "nginx on web-1 (42)"
        );
    }

    #[test]
    fn missing_and_null_fields() {
        let template = Template::try_from("{{ missing }}-{{ nothing }}").unwrap();
        assert_eq!(
            template.render_string(&event()),
            Err(TemplateRenderingError::MissingKeys {
                missing_keys: vec!["missing".to_owned(), "nothing".to_owned()],
            })
        );
    }

    #[test]
    fn empty_reference_is_rejected() {
        let error = Template::try_from("a {{ }} b").unwrap_err();
        assert_eq!(
            error.to_string(),
            r#"Template "a {{ }} b" contains an empty field reference"#
        );
    }

    #[test]
    fn literal_is_not_scanned() {
        let template = Template::literal("{{ host }}");
        assert!(!template.is_dynamic());
        assert_eq!(template.render_string(&event()).unwrap(), "{{ host }}");
    }

    #[test]
    fn serde_round_trip_keeps_source() {
        let template: Template = serde_json::from_str(r#""{{ host }}-x""#).unwrap();
        assert_eq!(template.get_ref(), "{{ host }}-x");
        assert_eq!(
            serde_json::to_string(&template).unwrap(),
            r#""{{ host }}-x""#
        );
    }

    #[test]
    fn literal_reads_back_as_scanned_source() {
        let literal = Template::literal("{{ host }}");
        let text = serde_json::to_string(&literal).unwrap();
        assert_eq!(text, r#""{{ host }}""#);

        let read_back: Template = serde_json::from_str(&text).unwrap();
        assert!(read_back.is_dynamic());
        assert_eq!(read_back.get_ref(), literal.get_ref());
        assert_ne!(read_back, literal);

        let plain: Template = serde_json::from_str(r#""Elastic""#).unwrap();
        assert_eq!(plain, Template::literal("Elastic"));
    }
}
