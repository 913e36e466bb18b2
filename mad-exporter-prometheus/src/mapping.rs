//! Mapping from host state to Prometheus names and sample values.

use mad_host::StatusValue;

/// Sanitize a metric name component to be Prometheus-compatible.
///
/// Prometheus metric names must match `[a-zA-Z_:][a-zA-Z0-9_:]*`.
/// This function:
/// - Replaces invalid characters with underscores
/// - Ensures the name starts with a letter or underscore
/// - Collapses multiple underscores into one
pub fn sanitize_metric_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 1);
    let mut last_was_underscore = false;
    let mut chars = name.chars().peekable();

    // A leading digit is kept but prefixed so the name stays valid.
    if let Some(&first) = chars.peek()
        && first.is_ascii_digit()
    {
        result.push('_');
        last_was_underscore = true;
    }

    for c in chars {
        let is_valid_char = c.is_ascii_alphanumeric() || c == '_' || c == ':';

        if is_valid_char {
            if c == '_' {
                if !last_was_underscore {
                    result.push(c);
                    last_was_underscore = true;
                }
            } else {
                result.push(c);
                last_was_underscore = false;
            }
        } else if !last_was_underscore {
            result.push('_');
            last_was_underscore = true;
        }
    }

    while result.ends_with('_') {
        result.pop();
    }

    if result.is_empty() {
        result.push_str("unnamed");
    }

    result
}

/// Build a full metric name from the configured prefix and a metric part.
///
/// Format: `{prefix}_{name}`; an empty prefix yields the bare name.
pub fn metric_name(prefix: &str, name: &str) -> String {
    let sanitized = sanitize_metric_name(name);

    if prefix.is_empty() {
        sanitized
    } else {
        format!("{}_{}", prefix, sanitized)
    }
}

/// Extract a numeric sample value from a status value.
///
/// Returns `None` for values that have no numeric rendering (text goes into
/// labels instead).
pub fn sample_value(value: &StatusValue) -> Option<f64> {
    match value {
        StatusValue::Flag(v) => Some(if *v { 1.0 } else { 0.0 }),
        StatusValue::Timestamp(v) => Some(*v as f64),
        StatusValue::Text(_) => None,
    }
}
