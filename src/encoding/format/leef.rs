use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use tokio_util::codec::Encoder;

use crate::{
    encoding::BuildError,
    event::{LogEvent, Value, timestamp_to_string},
    internal_events::TemplateRenderingError,
    leef::{
        EXTENSION_DELIMITER, LEEF_OUTPUT_VERSION, sanitize_extension_key,
        sanitize_extension_value, sanitize_header_field,
    },
    template::Template,
};

/// Vendor written when the configured vendor renders to nothing.
pub const DEFAULT_VENDOR: &str = "Elastic";

/// Product written when the configured product renders to nothing.
pub const DEFAULT_PRODUCT: &str = "Logstash";

/// Version written when the configured version renders to nothing.
pub const DEFAULT_VERSION: &str = "2.3.3";

/// Event id written when the configured event id renders to nothing.
pub const DEFAULT_EVENT_ID: &str = "Logstash";

/// Errors that can occur while encoding an event as LEEF.
#[derive(Debug, Snafu)]
pub enum LeefEncodeError {
    /// A composite field value could not be serialized as JSON.
    #[snafu(display("Failed to serialize value of field {field:?} as JSON: {source}"))]
    ExtensionValueSerialization {
        /// The configured field name.
        field: String,
        /// The JSON error.
        source: serde_json::Error,
    },
}

/// Config used to build a `LeefSerializer`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LeefSerializerConfig {
    /// The LEEF Serializer Options.
    #[serde(default)]
    pub leef: LeefSerializerOptions,
}

impl LeefSerializerConfig {
    /// Creates a new `LeefSerializerConfig`.
    pub const fn new(leef: LeefSerializerOptions) -> Self {
        Self { leef }
    }

    /// Build the `LeefSerializer` from this configuration.
    ///
    /// # Errors
    ///
    /// Fails if a configured field name has no characters left after it is
    /// reduced to an extension key.
    pub fn build(&self) -> Result<LeefSerializer, BuildError> {
        let fields = self
            .leef
            .fields
            .iter()
            .map(|field| {
                let key = sanitize_extension_key(field);
                if key.is_empty() {
                    Err(format!(
                        "LEEF field {field:?} does not contain any ASCII letters or digits"
                    ))
                } else {
                    Ok((field.clone(), key))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LeefSerializer {
            vendor: self.leef.vendor.clone(),
            product: self.leef.product.clone(),
            version: self.leef.version.clone(),
            event_id: self.leef.event_id.clone(),
            fields,
        })
    }
}

/// Options for the LEEF serializer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LeefSerializerOptions {
    /// Device vendor for the header. Supports `{{ field }}` templates.
    #[serde(default = "default_vendor")]
    pub vendor: Template,

    /// Device product for the header. Supports `{{ field }}` templates.
    #[serde(default = "default_product")]
    pub product: Template,

    /// Device version for the header. Supports `{{ field }}` templates.
    #[serde(default = "default_version")]
    pub version: Template,

    /// Event id for the header. Supports `{{ field }}` templates.
    #[serde(default = "default_event_id", alias = "eventid")]
    pub event_id: Template,

    /// Event fields written as extension pairs, in order.
    ///
    /// Nested fields are addressed with dots. Fields that are absent or null
    /// are left out. A name whose extension key would be empty once
    /// everything but ASCII letters and digits is dropped, such as `"!!"`,
    /// is rejected when the serializer is built.
    #[serde(default)]
    pub fields: Vec<String>,
}

fn default_vendor() -> Template {
    Template::literal(DEFAULT_VENDOR)
}

fn default_product() -> Template {
    Template::literal(DEFAULT_PRODUCT)
}

fn default_version() -> Template {
    Template::literal(DEFAULT_VERSION)
}

fn default_event_id() -> Template {
    Template::literal(DEFAULT_EVENT_ID)
}

impl Default for LeefSerializerOptions {
    fn default() -> Self {
        Self {
            vendor: default_vendor(),
            product: default_product(),
            version: default_version(),
            event_id: default_event_id(),
            fields: Vec::new(),
        }
    }
}

/// Serializer that converts a `LogEvent` to bytes using the LEEF format.
#[derive(Debug, Clone)]
pub struct LeefSerializer {
    vendor: Template,
    product: Template,
    version: Template,
    event_id: Template,
    /// Configured field names with their extension keys.
    fields: Vec<(String, String)>,
}

impl LeefSerializer {
    /// Renders one header slot, falling back to `default` when the result is empty.
    fn header_field(template: &Template, name: &str, default: &str, log: &LogEvent) -> String {
        let rendered = template.render_string(log).unwrap_or_else(|error| {
            emit!(TemplateRenderingError {
                field: Some(name),
                error: &error,
            });
            String::new()
        });

        let sanitized = sanitize_header_field(&rendered);
        if sanitized.is_empty() {
            default.to_owned()
        } else {
            sanitized
        }
    }

    fn extension_value(field: &str, value: &Value) -> Result<String, LeefEncodeError> {
        Ok(match value {
            Value::Array(_) | Value::Object(_) => sanitize_extension_value(
                &value
                    .to_json_string()
                    .context(ExtensionValueSerializationSnafu { field })?,
            ),
            Value::Timestamp(timestamp) => timestamp_to_string(timestamp),
            value => sanitize_extension_value(&value.to_string_lossy()),
        })
    }
}

impl Encoder<LogEvent> for LeefSerializer {
    type Error = crate::Error;

    fn encode(&mut self, log: LogEvent, buffer: &mut BytesMut) -> Result<(), Self::Error> {
        let vendor = Self::header_field(&self.vendor, "vendor", DEFAULT_VENDOR, &log);
        let product = Self::header_field(&self.product, "product", DEFAULT_PRODUCT, &log);
        let version = Self::header_field(&self.version, "version", DEFAULT_VERSION, &log);
        let event_id = Self::header_field(&self.event_id, "event_id", DEFAULT_EVENT_ID, &log);

        let mut extension = String::new();
        for (field, key) in &self.fields {
            let value = match log.get(field) {
                None | Some(Value::Null) => continue,
                Some(value) => Self::extension_value(field, value)?,
            };

            if !extension.is_empty() {
                extension.push(EXTENSION_DELIMITER);
            }
            extension.push_str(key);
            extension.push('=');
            extension.push_str(&value);
        }

        let line = format!(
            "{LEEF_OUTPUT_VERSION}|{vendor}|{product}|{version}|{event_id}|{extension}\n"
        );
        buffer.put_slice(line.as_bytes());

        Ok(())
    }
}
