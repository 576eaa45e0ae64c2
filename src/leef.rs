//! Contains common definitions for LEEF codec support.
//!
//! The encoder escapes header fields and extension values for the positions
//! they occupy. The decoder only undoes the escapes it can recognize, so
//! newlines flattened on the way out are never restored.

/// Event fields written by the LEEF decoder.
pub mod leef_fields {
    /// The LEEF format version, without the `LEEF:` tag.
    pub const VERSION: &str = "leef_version";

    /// The vendor of the device that sent the event.
    pub const VENDOR: &str = "leef_vendor";

    /// The product that sent the event.
    pub const PRODUCT: &str = "leef_product";

    /// The version of the product that sent the event.
    pub const DEVICE_VERSION: &str = "leef_device_version";

    /// The event identifier.
    pub const EVENT_ID: &str = "leef_eventid";

    /// (optional) The syslog prefix a relay put in front of the LEEF tag.
    pub const SYSLOG: &str = "syslog";

    /// The extension `key=value` pairs, as an object.
    pub const EXTENSION: &str = "leef_ext";
}

/// The tag that prefixes the version header field.
pub const LEEF_TAG: &str = "LEEF:";

/// The first header field written by the encoder.
pub const LEEF_OUTPUT_VERSION: &str = "LEEF:1.0";

/// The number of positional header fields before the extension.
pub const HEADER_FIELD_COUNT: usize = 5;

/// The separator between encoded extension pairs.
pub const EXTENSION_DELIMITER: char = '\t';

/// Escapes a value for use as a header field.
///
/// Backslashes and pipes are escaped with a backslash; line breaks become a
/// single space.
pub fn sanitize_header_field(s: &str) -> String {
    let s = s.replace("\r\n", "\n");
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' | '|' => {
                out.push('\\');
                out.push(c);
            }
            '\n' | '\r' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// Reduces a field name to a valid extension key.
///
/// Every character that is not an ASCII letter or digit is dropped.
pub fn sanitize_extension_key(s: &str) -> String {
    s.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// Escapes a value for use as an extension value.
///
/// Backslashes and `=` are escaped with a backslash; line breaks become the
/// two characters `\n`.
pub fn sanitize_extension_value(s: &str) -> String {
    let s = s.replace("\r\n", "\n");
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' | '=' => {
                out.push('\\');
                out.push(c);
            }
            '\n' | '\r' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverses the pipe and backslash escapes of [`sanitize_header_field`].
///
/// Pipes are unescaped before backslashes.
pub fn unescape_header_field(s: &str) -> String {
    s.replace("\\|", "|").replace("\\\\", "\\")
}

/// Reverses the `=` and backslash escapes of [`sanitize_extension_value`].
///
/// `\=` is unescaped before backslashes. The `\n` escape is left as is.
pub fn unescape_extension_value(s: &str) -> String {
    s.replace("\\=", "=").replace("\\\\", "\\")
}
