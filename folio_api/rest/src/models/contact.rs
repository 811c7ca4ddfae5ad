use anyhow::anyhow;
use folio_models::contact::ContactSubmissionRequest;
use serde_json::Value;

/// Reads a contact form submission from an arbitrary JSON value.
///
/// The value must be an object or an array. An array has no named fields and
/// is read like an empty object. Fields are read leniently: strings are taken
/// as they are, numbers and booleans are converted to text and anything else
/// (including a missing field) becomes the empty string.
pub fn contact_submission_from_json(value: Value) -> anyhow::Result<ContactSubmissionRequest> {
    let mut fields = match value {
        Value::Object(fields) => fields,
        Value::Array(_) => Default::default(),
        _ => return Err(anyhow!("request body is not a JSON object")),
    };

    let mut field = |name: &str| match fields.remove(name) {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    };

    Ok(ContactSubmissionRequest {
        name: field("name"),
        email: field("email"),
        message: field("message"),
    })
}
