//! Configuration for the `leef` command, loaded from a TOML file.
//!
//! ```toml
//! [decoding]
//! lossy = true
//! max_length = 102400
//!
//! [encoding]
//! vendor = "{{ host }}"
//! product = "Gateway"
//! eventid = "{{ event.code }}"
//! fields = ["src", "dst", "usrName"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::{
    decoding::{
        Decoder, LeefDeserializerConfig, LeefDeserializerOptions, NewlineDelimitedDecoderConfig,
        NewlineDelimitedDecoderOptions, format::default_lossy,
    },
    encoding::{BuildError, LeefSerializer, LeefSerializerConfig, LeefSerializerOptions},
};

/// Errors raised while loading a configuration file.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// The file could not be read.
    #[snafu(display("Could not read config file {}: {source}", path.display()))]
    ReadConfig {
        /// The configured path.
        path: PathBuf,
        /// The I/O error.
        source: std::io::Error,
    },

    /// The file is not a valid configuration.
    #[snafu(display("Could not parse config: {source}"))]
    ParseConfig {
        /// The TOML error.
        source: toml::de::Error,
    },
}

/// The complete configuration of the `leef` command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Options for turning LEEF lines into events.
    #[serde(default)]
    pub decoding: DecodingConfig,

    /// Options for turning events into LEEF lines.
    #[serde(default)]
    pub encoding: LeefSerializerOptions,
}

/// Framing and parsing options for decoding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DecodingConfig {
    /// Longest line accepted by the framer, without its delimiter.
    #[serde(default = "crate::serde::default_max_length")]
    pub max_length: usize,

    /// Replace invalid UTF-8 instead of rejecting the line.
    #[serde(default = "default_lossy")]
    pub lossy: bool,
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            max_length: crate::serde::default_max_length(),
            lossy: default_lossy(),
        }
    }
}

impl DecodingConfig {
    /// Options for the line framer.
    pub const fn framing(&self) -> NewlineDelimitedDecoderOptions {
        NewlineDelimitedDecoderOptions::new_with_max_length(self.max_length)
    }

    /// Options for the LEEF deserializer.
    pub const fn leef(&self) -> LeefDeserializerOptions {
        LeefDeserializerOptions { lossy: self.lossy }
    }
}

impl Config {
    /// Reads and parses the TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).context(ReadConfigSnafu { path })?;
        Self::from_toml(&text)
    }

    /// Parses a TOML configuration.
    ///
    /// # Errors
    ///
    /// Fails if `text` is not a valid configuration.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).context(ParseConfigSnafu)
    }

    /// Builds the stream decoder described by the `decoding` table.
    pub fn build_decoder(&self) -> Decoder {
        let framer = NewlineDelimitedDecoderConfig {
            newline_delimited: self.decoding.framing(),
        }
        .build();
        let deserializer = LeefDeserializerConfig::new(self.decoding.leef()).build();
        Decoder::new(framer, deserializer)
    }

    /// Builds the serializer described by the `encoding` table.
    ///
    /// # Errors
    ///
    /// Fails if a configured field cannot be used as an extension key.
    pub fn build_serializer(&self) -> Result<LeefSerializer, BuildError> {
        LeefSerializerConfig::new(self.encoding.clone()).build()
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());

        let decoder = config.build_decoder();
        assert_eq!(decoder.framer().max_length(), 100 * 1024);
        assert!(config.build_serializer().is_ok());
    }

    #[test]
    fn full_config() {
        let config = Config::from_toml(indoc! {r#"
            [decoding]
            lossy = false
            max_length = 4096

            [encoding]
            vendor = "{{ host }}"
            product = "Gateway"
            eventid = "login"
            fields = ["src", "usr.name"]
        "#})
        .unwrap();

        assert!(!config.decoding.lossy);
        assert_eq!(config.decoding.max_length, 4096);
        assert!(config.encoding.vendor.is_dynamic());
        assert_eq!(config.encoding.product.get_ref(), "Gateway");
        assert_eq!(config.encoding.event_id.get_ref(), "login");
        assert_eq!(config.encoding.version.get_ref(), "2.3.3");
        assert_eq!(config.encoding.fields, vec!["src", "usr.name"]);

        assert_eq!(config.build_decoder().framer().max_length(), 4096);
    }

    #[test]
    fn unknown_table_is_rejected() {
        let error = Config::from_toml(indoc! {r#"
            [decodng]
            lossy = false
        "#})
        .unwrap_err();
        assert!(matches!(error, ConfigError::ParseConfig { .. }));
    }

    #[test]
    fn misspelled_keys_are_rejected() {
        for text in [
            "[decoding]\nmax_lenght = 10\n",
            "[decoding]\nlosy = false\n",
            "[encoding]\nvendr = \"X\"\n",
            "[encoding]\nfeilds = [\"a\"]\n",
        ] {
            let error = Config::from_toml(text).unwrap_err();
            assert!(
                matches!(error, ConfigError::ParseConfig { .. }),
                "{text:?} was accepted"
            );
            assert!(error.to_string().contains("unknown field"), "{error}");
        }
    }

    #[test]
    fn eventid_alias_is_accepted() {
        let config = Config::from_toml(indoc! {r#"
            [encoding]
            eventid = "a"
        "#})
        .unwrap();
        assert_eq!(config.encoding.event_id.get_ref(), "a");
    }

    #[test]
    fn invalid_template_is_rejected() {
        let error = Config::from_toml(indoc! {r#"
            [encoding]
            vendor = "{{ }}"
        "#})
        .unwrap_err();
        assert!(error.to_string().contains("empty field reference"));
    }

    #[test]
    fn unusable_field_fails_to_build() {
        let config = Config::from_toml(indoc! {r#"
            [encoding]
            fields = ["--"]
        "#})
        .unwrap();
        assert!(config.build_serializer().is_err());
    }

    #[test]
    fn missing_file() {
        let error = Config::load(Path::new("/nonexistent/leef.toml")).unwrap_err();
        assert!(
            error
                .to_string()
                .starts_with("Could not read config file /nonexistent/leef.toml:")
        );
    }
}
