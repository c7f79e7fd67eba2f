//! Best-effort JSON extraction from model output
//!
//! Language models wrap JSON in markdown fences, add prose around it, leave
//! trailing commas and emit stray control characters. [`recover`] applies a
//! fixed chain of cleanups and returns the first object that parses. It is a
//! pure function; retries are the requester's business.

use crate::error::UnrecoverableJson;
use serde_json::Value;

/// Extract a JSON object from raw model text.
///
/// # Errors
///
/// Returns [`UnrecoverableJson`] carrying the fully cleaned text when no
/// object can be parsed. Truncated objects and top-level arrays are not
/// recovered.
pub fn recover(raw: &str) -> Result<Value, UnrecoverableJson> {
    if let Some(value) = parse_object(raw) {
        return Ok(value);
    }

    let unfenced = strip_code_fences(raw);
    let sliced = slice_object(&unfenced).unwrap_or(&unfenced);
    let cleaned = strip_non_printable(&remove_trailing_commas(sliced));

    match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) if value.is_object() => Ok(value),
        Ok(_) => Err(UnrecoverableJson {
            cleaned,
            reason: "top-level value is not an object".to_string(),
        }),
        Err(err) => Err(UnrecoverableJson {
            reason: err.to_string(),
            cleaned,
        }),
    }
}

fn parse_object(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(Value::is_object)
}

/// Remove every ```` ``` ```` marker together with a language tag directly after it.
fn strip_code_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("```") {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 3..];
        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+')))
            .unwrap_or(rest.len());
        rest = &rest[tag_len..];
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// Slice from the first `{` to the last `}`.
fn slice_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Drop commas that directly precede `}` or `]`, ignoring string contents.
fn remove_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (index, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = chars[index + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}' | ']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Drop control characters, BOM and zero-width marks.
///
/// Outside string literals JSON whitespace is kept. Inside them raw line
/// breaks and tabs are escaped, since strict JSON rejects them unescaped.
fn strip_non_printable(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if matches!(c, '\u{feff}' | '\u{200b}'..='\u{200d}' | '\u{2060}') {
            continue;
        }

        if in_string {
            match c {
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c.is_control() => {}
                '\\' if !escaped => {
                    out.push(c);
                    escaped = true;
                    continue;
                }
                '"' if !escaped => {
                    out.push(c);
                    in_string = false;
                }
                c => out.push(c),
            }
            escaped = false;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '\n' | '\r' | '\t' => out.push(c),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}
