pub type AnyJson = serde_json::Value;

/// An ordered JSON object.
pub type JsonObject = serde_json::Map<String, AnyJson>;

/// Returns `Some` only for non-empty strings.
pub(crate) fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}
