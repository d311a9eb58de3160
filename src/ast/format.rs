//! Compact textual rendering of values, names and keys.
//!
//! Used by `Display` impls and diagnostics. A literal that would be read back differently
//! without quotes is written as a double-quoted string with escapes.

use std::fmt::{self, Write};

use once_cell::sync::Lazy;
use regex::Regex;

use super::Among;

static SIMPLE_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[^\s{}\[\](),:'"\\/=]+$"#).expect("valid regex"));
static SIMPLE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[^\s{}\[\](),:'"\\/]+$"#).expect("valid regex"));

pub fn is_simple_value(value: &str) -> bool {
    SIMPLE_VALUE.is_match(value)
}

pub fn is_simple_key(key: &str) -> bool {
    SIMPLE_KEY.is_match(key)
}

/// Whether a macro or collection name can be written without quotes. Names sit right before a
/// bracket, so `=` is fine there.
pub fn is_simple_name(name: &str) -> bool {
    SIMPLE_KEY.is_match(name)
}

/// Writes `text` as a double-quoted literal.
pub fn write_quoted(out: &mut impl Write, text: &str) -> fmt::Result {
    out.write_char('"')?;
    for c in text.chars() {
        match c {
            '"' => out.write_str("\\\"")?,
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\r' => out.write_str("\\r")?,
            '\t' => out.write_str("\\t")?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('"')
}

pub fn write_name(out: &mut impl Write, name: &str) -> fmt::Result {
    if is_simple_name(name) {
        out.write_str(name)
    } else {
        write_quoted(out, name)
    }
}

pub fn write_among(out: &mut impl Write, among: &Among) -> fmt::Result {
    match among {
        Among::Primitive(p) => {
            if is_simple_value(p.value()) {
                out.write_str(p.value())
            } else {
                write_quoted(out, p.value())
            }
        }
        Among::Object(o) => {
            if o.has_name() {
                write_name(out, o.name())?;
            }
            out.write_char('{')?;
            for (i, (key, value)) in o.properties().iter().enumerate() {
                if i != 0 {
                    out.write_char(',')?;
                }
                if is_simple_key(key) {
                    out.write_str(key)?;
                } else {
                    write_quoted(out, key)?;
                }
                out.write_char(':')?;
                write_among(out, value)?;
            }
            out.write_char('}')
        }
        Among::List(l) => {
            if l.has_name() {
                write_name(out, l.name())?;
            }
            let (open, close) = if l.is_operation() { ('(', ')') } else { ('[', ']') };
            out.write_char(open)?;
            for (i, value) in l.iter().enumerate() {
                if i != 0 {
                    out.write_char(',')?;
                }
                write_among(out, value)?;
            }
            out.write_char(close)
        }
    }
}
