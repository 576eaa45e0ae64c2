use std::{borrow::Cow, collections::BTreeMap, sync::LazyLock};

use bytes::Bytes;
use regex::Regex;
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use snafu::{ResultExt, Snafu};

use super::{Deserializer, default_lossy};
use crate::{
    event::{LogEvent, ObjectMap, Value},
    internal_events::LeefExtensionPairSkipped,
    leef::{
        HEADER_FIELD_COUNT, LEEF_TAG, leef_fields, unescape_extension_value,
        unescape_header_field,
    },
};

// The pipe split and the extension split below are heuristics, not a grammar.
// Their known gaps are exercised in the tests.

/// Every extension pair after the first starts with a space, a key of ASCII
/// word characters and dots, and `=`.
static EXTENSION_KEY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r" ([A-Za-z0-9_.]+)=").expect("extension key regex is valid")
});

/// Errors that can occur while decoding a LEEF line.
#[derive(Debug, Snafu)]
pub enum LeefDecodeError {
    /// The line has fewer than five pipe-delimited header fields.
    #[snafu(display("LEEF header has {segments} of 5 required fields"))]
    MalformedHeader {
        /// How many header segments were found.
        segments: usize,
    },

    /// The line is not valid UTF-8 and lossy decoding is disabled.
    #[snafu(display("LEEF line is not valid UTF-8: {source}"))]
    InvalidUtf8 {
        /// The UTF-8 validation error.
        source: std::str::Utf8Error,
    },
}

/// Config used to build a `LeefDeserializer`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LeefDeserializerConfig {
    /// LEEF-specific decoding options.
    #[serde(default, skip_serializing_if = "crate::serde::is_default")]
    pub leef: LeefDeserializerOptions,
}

impl LeefDeserializerConfig {
    /// Creates a new `LeefDeserializerConfig`.
    pub const fn new(options: LeefDeserializerOptions) -> Self {
        Self { leef: options }
    }

    /// Build the `LeefDeserializer` from this configuration.
    pub const fn build(&self) -> LeefDeserializer {
        LeefDeserializer::new(self.leef.lossy)
    }
}

/// LEEF-specific decoding options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LeefDeserializerOptions {
    /// Determines whether or not to replace invalid UTF-8 sequences instead of failing.
    ///
    /// When true, invalid UTF-8 sequences are replaced with the `U+FFFD REPLACEMENT CHARACTER`.
    #[serde(
        default = "default_lossy",
        skip_serializing_if = "crate::serde::is_default"
    )]
    pub lossy: bool,
}

impl Default for LeefDeserializerOptions {
    fn default() -> Self {
        Self {
            lossy: default_lossy(),
        }
    }
}

/// The five positional header fields of a LEEF line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeefHeader {
    /// The format version, without the `LEEF:` tag.
    pub version: String,
    /// The device vendor.
    pub vendor: String,
    /// The device product.
    pub product: String,
    /// The device version.
    pub device_version: String,
    /// The event identifier.
    pub event_id: String,
}

/// A decoded LEEF line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeefMessage {
    /// The header fields.
    pub header: LeefHeader,
    /// The text in front of the `LEEF:` tag, usually a syslog timestamp and host.
    pub syslog: Option<String>,
    /// The extension pairs.
    pub extension: BTreeMap<String, String>,
}

impl LeefMessage {
    /// Decodes one LEEF line.
    ///
    /// # Errors
    ///
    /// Returns [`LeefDecodeError::MalformedHeader`] if the line does not have
    /// five header fields.
    pub fn parse(line: &str) -> Result<Self, LeefDecodeError> {
        let line = strip_quotes(line);
        let ([version, vendor, product, device_version, event_id], message) = split_header(line)?;

        let version = unescape_header_field(version);
        let (syslog, version) = split_syslog_prefix(&version);
        let version = version.strip_prefix(LEEF_TAG).unwrap_or(version);

        Ok(Self {
            header: LeefHeader {
                version: version.to_owned(),
                vendor: unescape_header_field(vendor),
                product: unescape_header_field(product),
                device_version: unescape_header_field(device_version),
                event_id: unescape_header_field(event_id),
            },
            syslog,
            extension: parse_extension(message),
        })
    }

    /// Writes the decoded fields into `log`, leaving its other fields untouched.
    ///
    /// The extension pairs always land in an object, even when there are none.
    pub fn insert_into(self, log: &mut LogEvent) {
        let Self {
            header,
            syslog,
            extension,
        } = self;

        log.insert(leef_fields::VERSION, header.version);
        log.insert(leef_fields::VENDOR, header.vendor);
        log.insert(leef_fields::PRODUCT, header.product);
        log.insert(leef_fields::DEVICE_VERSION, header.device_version);
        log.insert(leef_fields::EVENT_ID, header.event_id);
        if let Some(syslog) = syslog {
            log.insert(leef_fields::SYSLOG, syslog);
        }
        log.insert(
            leef_fields::EXTENSION,
            extension
                .into_iter()
                .map(|(key, value)| (key, Value::from(value)))
                .collect::<ObjectMap>(),
        );
    }
}

impl From<LeefMessage> for LogEvent {
    fn from(message: LeefMessage) -> Self {
        let mut log = LogEvent::new();
        message.insert_into(&mut log);
        log
    }
}

/// Drops the first and last character of a line that starts with a double quote.
///
/// The closing quote is not checked.
fn strip_quotes(line: &str) -> &str {
    match line.strip_prefix('"') {
        Some(inner) => {
            let mut chars = inner.chars();
            chars.next_back();
            chars.as_str()
        }
        None => line,
    }
}

/// Splits off the five header fields and returns them with the rest of the line.
///
/// A `|` ends a field when no backslash precedes it, or when exactly two
/// backslashes do and something other than a backslash comes before those.
/// Consequently `\\|` at the very start of the line and runs of four or more
/// backslashes before a separator do not split.
fn split_header(line: &str) -> Result<([&str; HEADER_FIELD_COUNT], &str), LeefDecodeError> {
    let mut segments = [""; HEADER_FIELD_COUNT];
    let mut found = 0;
    let mut start = 0;
    // Length and starting offset of the backslash run ending at the current byte.
    let mut run = 0;
    let mut run_start = 0;

    // Both delimiters are ASCII, so scanning bytes never splits a multi-byte character.
    for (i, byte) in line.bytes().enumerate() {
        match byte {
            b'\\' => {
                if run == 0 {
                    run_start = i;
                }
                run += 1;
            }
            b'|' => {
                if run == 0 || (run == 2 && run_start > 0) {
                    segments[found] = &line[start..i];
                    found += 1;
                    start = i + 1;
                    if found == HEADER_FIELD_COUNT {
                        return Ok((segments, &line[start..]));
                    }
                }
                run = 0;
            }
            _ => run = 0,
        }
    }

    // The text after the last separator is the final header field.
    segments[found] = &line[start..];
    found += 1;
    if found == HEADER_FIELD_COUNT {
        Ok((segments, ""))
    } else {
        Err(LeefDecodeError::MalformedHeader { segments: found })
    }
}

/// Splits `version` at its last space into a syslog prefix and the version proper.
fn split_syslog_prefix(version: &str) -> (Option<String>, &str) {
    match version.rsplit_once(' ') {
        Some((prefix, version)) => (Some(prefix.to_owned()), version),
        None => (None, version),
    }
}

/// Parses the extension text following the header.
///
/// Only the value of the first pair is unescaped; later values are kept
/// exactly as they appear on the line.
fn parse_extension(message: &str) -> BTreeMap<String, String> {
    let mut extension = BTreeMap::new();
    if message.is_empty() || !message.contains('=') {
        return extension;
    }

    let mut message = message.trim().to_owned();
    // Keeps a trailing `key=` from losing its (empty) value.
    if message.ends_with('=') && !message.ends_with("\\=") {
        message.push(' ');
    }

    let keys: Vec<_> = EXTENSION_KEY_REGEX
        .captures_iter(&message)
        .filter_map(|caps| Some((caps.get(0)?, caps.get(1)?)))
        .collect();

    let first_pair_end = keys.first().map_or(message.len(), |(all, _)| all.start());
    let first_pair = &message[..first_pair_end];
    match first_pair.split_once('=') {
        Some((key, value)) => {
            extension.insert(key.to_owned(), unescape_extension_value(value));
        }
        None => emit!(LeefExtensionPairSkipped { pair: first_pair }),
    }

    for (i, (all, key)) in keys.iter().enumerate() {
        let value_end = keys
            .get(i + 1)
            .map_or(message.len(), |(next, _)| next.start());
        extension.insert(
            key.as_str().to_owned(),
            message[all.end()..value_end].to_owned(),
        );
    }

    extension
}

/// Deserializer that builds an `Event` from a byte frame containing a LEEF line.
#[derive(Debug, Clone)]
pub struct LeefDeserializer {
    lossy: bool,
}

impl Default for LeefDeserializer {
    fn default() -> Self {
        Self::new(default_lossy())
    }
}

impl LeefDeserializer {
    /// Create a new `LeefDeserializer`.
    pub const fn new(lossy: bool) -> Self {
        Self { lossy }
    }
}

impl Deserializer for LeefDeserializer {
    fn parse(&self, bytes: Bytes) -> crate::Result<SmallVec<[LogEvent; 1]>> {
        let line = match self.lossy {
            true => String::from_utf8_lossy(&bytes),
            false => Cow::Borrowed(std::str::from_utf8(&bytes).context(InvalidUtf8Snafu)?),
        };
        let line = line.strip_suffix('\n').unwrap_or(&line);
        let line = line.strip_suffix('\r').unwrap_or(line);

        let message = LeefMessage::parse(line)?;
        Ok(smallvec![message.into()])
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use similar_asserts::assert_eq;

    use super::*;

    fn ext(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn header(fields: [&str; 5]) -> LeefHeader {
        let [version, vendor, product, device_version, event_id] = fields.map(str::to_owned);
        LeefHeader {
            version,
            vendor,
            product,
            device_version,
            event_id,
        }
    }

    #[test]
    fn parses_header_and_extension() {
        let message =
            LeefMessage::parse("LEEF:1.0|Microsoft|MSExchange|4.0 SP1|15345|src=10.50.1.1 dst=2.10.20.20 spt=1200")
                .unwrap();

        assert_eq!(
            message.header,
            header(["1.0", "Microsoft", "MSExchange", "4.0 SP1", "15345"])
        );
        assert_eq!(message.syslog, None);
        assert_eq!(
            message.extension,
            ext(&[("src", "10.50.1.1"), ("dst", "2.10.20.20"), ("spt", "1200")])
        );
    }

    #[test]
    fn header_only_line() {
        let message = LeefMessage::parse("LEEF:1.0|V|P|1.0|E").unwrap();
        assert_eq!(message.header, header(["1.0", "V", "P", "1.0", "E"]));
        assert!(message.extension.is_empty());

        let message = LeefMessage::parse("LEEF:1.0|V|P|1.0|E|").unwrap();
        assert_eq!(message.header.event_id, "E");
        assert!(message.extension.is_empty());
    }

    #[rstest]
    #[case("", 1)]
    #[case("LEEF:1.0", 1)]
    #[case("LEEF:1.0|V|P|1.0", 4)]
    #[case(r"LEEF:1.0|V|P|1.0\|E", 4)]
    fn malformed_header(#[case] line: &str, #[case] segments: usize) {
        let error = LeefMessage::parse(line).unwrap_err();
        assert!(matches!(error, LeefDecodeError::MalformedHeader { segments: s } if s == segments));
        assert_eq!(
            error.to_string(),
            format!("LEEF header has {segments} of 5 required fields")
        );
    }

    #[test]
    fn strips_surrounding_quotes() {
        let quoted = LeefMessage::parse(r#""LEEF:1.0|V|P|1.0|E|a=1""#).unwrap();
        let bare = LeefMessage::parse("LEEF:1.0|V|P|1.0|E|a=1").unwrap();
        assert_eq!(quoted, bare);
    }

    #[test]
    fn strips_last_char_without_checking_it() {
        let message = LeefMessage::parse(r#""LEEF:1.0|V|P|1.0|E|a=12"#).unwrap();
        assert_eq!(message.extension, ext(&[("a", "1")]));
    }

    #[test]
    fn lone_quote_is_malformed() {
        assert!(LeefMessage::parse("\"").is_err());
    }

    #[test]
    fn syslog_prefix() {
        let message = LeefMessage::parse("Jan 1 00:00:00 host LEEF:1.0|V|P|1.0|E|a=1").unwrap();
        assert_eq!(message.syslog.as_deref(), Some("Jan 1 00:00:00 host"));
        assert_eq!(message.header.version, "1.0");
    }

    #[test]
    fn version_without_tag_is_kept() {
        let message = LeefMessage::parse("2.0|V|P|1.0|E").unwrap();
        assert_eq!(message.header.version, "2.0");
    }

    #[test]
    fn escaped_pipes_stay_in_fields() {
        let message = LeefMessage::parse(r"LEEF:1.0|Ven\|dor|Pro\\duct|1.0|E|a=1").unwrap();
        assert_eq!(message.header.vendor, "Ven|dor");
        assert_eq!(message.header.product, r"Pro\duct");
    }

    #[test]
    fn escaped_backslash_before_separator_splits() {
        let message = LeefMessage::parse(r"LEEF:1.0|V\\|P|1.0|E").unwrap();
        assert_eq!(message.header.vendor, r"V\");
        assert_eq!(message.header.product, "P");
    }

    #[test]
    fn escaped_backslash_then_escaped_pipe_stays() {
        let message = LeefMessage::parse(r"LEEF:1.0|V\\\|X|P|1.0|E").unwrap();
        assert_eq!(message.header.vendor, r"V\|X");
    }

    #[test]
    fn two_escaped_backslashes_before_separator_do_not_split() {
        // Known gap of the split heuristic.
        let message = LeefMessage::parse(r"LEEF:1.0|V\\\\|P|1.0|E|F").unwrap();
        assert_eq!(message.header.vendor, r"V\\|P");
        assert_eq!(message.header.event_id, "F");
    }

    #[test]
    fn escaped_backslash_at_line_start_does_not_split() {
        // Known gap of the split heuristic.
        let (segments, message) = split_header(r"\\|a|b|c|d|e").unwrap();
        assert_eq!(segments, [r"\\|a", "b", "c", "d", "e"]);
        assert_eq!(message, "");
    }

    #[test]
    fn message_keeps_later_pipes() {
        let message = LeefMessage::parse("LEEF:1.0|V|P|1.0|E|a=x|y b=z").unwrap();
        assert_eq!(message.extension, ext(&[("a", "x|y"), ("b", "z")]));
    }

    #[test]
    fn only_first_value_is_unescaped() {
        let message = LeefMessage::parse(r"LEEF:1.0|V|P|1.0|E|a=1\=2\\3 b=4\=5").unwrap();
        assert_eq!(message.extension, ext(&[("a", r"1=2\3"), ("b", r"4\=5")]));
    }

    #[test]
    fn trailing_empty_value() {
        let message = LeefMessage::parse("LEEF:1.0|V|P|1.0|E|a=1 b=").unwrap();
        assert_eq!(message.extension, ext(&[("a", "1"), ("b", " ")]));
    }

    #[test]
    fn trailing_escaped_equals_is_a_value() {
        let message = LeefMessage::parse(r"LEEF:1.0|V|P|1.0|E|a=1\=").unwrap();
        assert_eq!(message.extension, ext(&[("a", "1=")]));
    }

    #[test]
    fn values_may_contain_spaces() {
        let message =
            LeefMessage::parse("LEEF:1.0|V|P|1.0|E|msg=hello big world usrName=j.doe").unwrap();
        assert_eq!(
            message.extension,
            ext(&[("msg", "hello big world"), ("usrName", "j.doe")])
        );
    }

    #[test]
    fn dotted_keys() {
        let message = LeefMessage::parse("LEEF:1.0|V|P|1.0|E|a=1 x.y_z=2").unwrap();
        assert_eq!(message.extension, ext(&[("a", "1"), ("x.y_z", "2")]));
    }

    #[test]
    fn tab_separated_pairs_stay_in_first_value() {
        // Only a space starts a new pair.
        let message = LeefMessage::parse("LEEF:1.0|V|P|1.0|E|a=1\tb=2").unwrap();
        assert_eq!(message.extension, ext(&[("a", "1\tb=2")]));
    }

    #[test]
    fn message_without_equals_has_no_extension() {
        let message = LeefMessage::parse("LEEF:1.0|V|P|1.0|E|just text").unwrap();
        assert!(message.extension.is_empty());
    }

    #[test]
    fn first_pair_without_equals_is_skipped() {
        let message = LeefMessage::parse("LEEF:1.0|V|P|1.0|E|noise b=2").unwrap();
        assert_eq!(message.extension, ext(&[("b", "2")]));
    }

    #[test]
    fn duplicate_keys_keep_last() {
        let message = LeefMessage::parse("LEEF:1.0|V|P|1.0|E|a=1 a=2").unwrap();
        assert_eq!(message.extension, ext(&[("a", "2")]));
    }

    #[test]
    fn deserializes_into_log_event() {
        let deserializer = LeefDeserializerConfig::default().build();
        let events = deserializer
            .parse(Bytes::from_static(
                b"Sep 29 08:26:10 host LEEF:1.0|V|P|1.0|E|a=1 b=2\n",
            ))
            .unwrap();
        assert_eq!(events.len(), 1);

        let log = &events[0];
        assert_eq!(log.get(leef_fields::VERSION), Some(&Value::from("1.0")));
        assert_eq!(log.get(leef_fields::VENDOR), Some(&Value::from("V")));
        assert_eq!(log.get(leef_fields::PRODUCT), Some(&Value::from("P")));
        assert_eq!(log.get(leef_fields::DEVICE_VERSION), Some(&Value::from("1.0")));
        assert_eq!(log.get(leef_fields::EVENT_ID), Some(&Value::from("E")));
        assert_eq!(
            log.get(leef_fields::SYSLOG),
            Some(&Value::from("Sep 29 08:26:10 host"))
        );
        assert_eq!(log.get("leef_ext.a"), Some(&Value::from("1")));
        assert_eq!(log.get("leef_ext.b"), Some(&Value::from("2")));
    }

    #[test]
    fn empty_extension_is_an_empty_object() {
        let events = LeefDeserializer::default()
            .parse(Bytes::from_static(b"LEEF:1.0|V|P|1.0|E"))
            .unwrap();
        let log = &events[0];
        assert_eq!(
            log.get(leef_fields::EXTENSION),
            Some(&Value::Object(ObjectMap::new()))
        );
        assert!(!log.contains(leef_fields::SYSLOG));
    }

    #[test]
    fn insert_into_keeps_other_fields() {
        let mut log = LogEvent::new();
        log.insert("host", "relay-1");
        log.insert(leef_fields::SYSLOG, "stale");

        LeefMessage::parse("LEEF:1.0|V|P|1.0|E|a=1")
            .unwrap()
            .insert_into(&mut log);

        assert_eq!(log.get("host"), Some(&Value::from("relay-1")));
        assert_eq!(log.get(leef_fields::VENDOR), Some(&Value::from("V")));
        assert_eq!(log.get("leef_ext.a"), Some(&Value::from("1")));
        // Without a prefix on the line the existing field is kept.
        assert_eq!(log.get(leef_fields::SYSLOG), Some(&Value::from("stale")));
    }

    #[test]
    fn invalid_utf8() {
        let bytes = Bytes::from_static(b"LEEF:1.0|V\xff|P|1.0|E");

        let lossy = LeefDeserializer::new(true).parse(bytes.clone()).unwrap();
        assert_eq!(
            lossy[0].get(leef_fields::VENDOR),
            Some(&Value::from("V\u{FFFD}"))
        );

        let error = LeefDeserializer::new(false).parse(bytes).unwrap_err();
        assert!(error.to_string().starts_with("LEEF line is not valid UTF-8"));
    }

    #[test]
    fn config_defaults_to_lossy() {
        let config: LeefDeserializerConfig = serde_json::from_str("{}").unwrap();
        assert!(config.leef.lossy);

        let config: LeefDeserializerConfig =
            serde_json::from_str(r#"{ "leef": { "lossy": false } }"#).unwrap();
        assert!(!config.leef.lossy);
    }
}
