//! Variable-file literal rendering
//!
//! Renders JSON values into the literal syntax OpenTofu reads from variable
//! files. Output is the wire format handed to the provisioning tool, so it
//! must be identical for identical input.

use serde_json::{Number, Value};

/// Render a value as a variable-file literal.
///
/// Strings are quoted as-is; embedded quotes and backslashes are not escaped.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Number(n) => render_number(n),
        Value::Bool(b) => b.to_string(),
        Value::Object(map) => {
            let items: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("  {} = {}", k, render_value(v)))
                .collect();
            format!("{{\n{}\n}}", items.join("\n"))
        }
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(render_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Null => "null".to_string(),
    }
}

/// Integral values drop the decimal point; everything else uses the
/// shortest decimal that round-trips.
fn render_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) => render_float(f),
        None => n.to_string(),
    }
}

pub fn render_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}
