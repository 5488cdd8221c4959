use crate::{Error, Result, model::Payload};
use serde_json::Value;

/// Checks that every required field is present with a non-empty value.
///
/// Field names may be dotted paths into nested objects (`patient.id`).
/// All missing fields are reported, in the order they were declared.
pub fn validate<S: AsRef<str>>(payload: &Payload, required: &[S]) -> Result<()> {
    let missing: Vec<&str> = required
        .iter()
        .map(AsRef::as_ref)
        .filter(|field| lookup(payload, field).is_none_or(is_empty))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "missing required field(s): {}",
            missing.join(", ")
        )))
    }
}

fn lookup<'a>(payload: &'a Payload, field: &str) -> Option<&'a Value> {
    let mut segments = field.split('.');
    let mut current = payload.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
