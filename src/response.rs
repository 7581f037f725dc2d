//! Response classification and key search.

use serde_json::Value;

/// Normalized result of a successful call.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// The response had no body.
    NoContent,
    /// A JSON document, or the array of values found for the search keys.
    Document(Value),
    /// A body that is not JSON, unmodified.
    Text(String),
}

impl Outcome {
    pub fn is_no_content(&self) -> bool {
        matches!(self, Self::NoContent)
    }

    pub fn as_document(&self) -> Option<&Value> {
        match self {
            Self::Document(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_document(self) -> Option<Value> {
        match self {
            Self::Document(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Collapses the outcome into a single JSON value: `true` for no content,
    /// the document itself, or a JSON string holding the text.
    pub fn into_value(self) -> Value {
        match self {
            Self::NoContent => Value::Bool(true),
            Self::Document(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }
}

/// Classifies a response body.
///
/// Empty bodies are [`Outcome::NoContent`]. JSON bodies are returned whole,
/// or reduced to the values found for `search_keys`. Anything else is
/// returned as text.
pub fn normalize<S: AsRef<str>>(body: &[u8], search_keys: &[S]) -> Outcome {
    if body.is_empty() {
        return Outcome::NoContent;
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(document) if search_keys.is_empty() => Outcome::Document(document),
        Ok(document) => Outcome::Document(Value::Array(lookup_all(&document, search_keys))),
        Err(_) => Outcome::Text(String::from_utf8_lossy(body).into_owned()),
    }
}

/// Values of every member named after one of `keys`, in key order.
pub fn lookup_all<S: AsRef<str>>(document: &Value, keys: &[S]) -> Vec<Value> {
    let mut found = Vec::new();
    for key in keys {
        lookup(key.as_ref(), document, &mut found);
    }
    found
}

/// Collects the values of members named `key` at any depth.
///
/// Matched values are searched too, so nested occurrences of the same key
/// follow their parent.
pub fn lookup(key: &str, document: &Value, found: &mut Vec<Value>) {
    match document {
        Value::Object(map) => {
            for (name, value) in map {
                if name == key {
                    found.push(value.clone());
                }
                lookup(key, value, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                lookup(key, item, found);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{lookup_all, normalize, Outcome};

    const NO_KEYS: &[&str] = &[];

    #[test]
    fn empty_body_is_no_content() {
        assert_eq!(normalize(b"", NO_KEYS), Outcome::NoContent);
        assert_eq!(normalize(b"", &["id"]), Outcome::NoContent);
    }

    #[test]
    fn empty_object_is_returned_whole() {
        assert_eq!(normalize(b"{}", NO_KEYS), Outcome::Document(json!({})));
    }

    #[test]
    fn nested_key_is_found() {
        assert_eq!(
            normalize(br#"{"a": {"b": 1}}"#, &["b"]),
            Outcome::Document(json!([1]))
        );
    }

    #[test]
    fn plain_text_is_unchanged() {
        assert_eq!(normalize(b"plain", NO_KEYS), Outcome::Text("plain".to_owned()));
        assert_eq!(
            normalize(b"not {json", &["a"]),
            Outcome::Text("not {json".to_owned())
        );
    }

    #[test]
    fn search_traverses_arrays_and_keeps_key_order() {
        let doc = json!({
            "items": [
                {"id": 1, "name": "a", "tags": [{"id": 10}]},
                {"id": 2, "name": "b"}
            ],
            "meta": {"name": "page"}
        });
        assert_eq!(
            lookup_all(&doc, &["name", "id"]),
            vec![json!("a"), json!("b"), json!("page"), json!(1), json!(10), json!(2)]
        );
    }

    #[test]
    fn matched_values_are_searched_too() {
        let doc = json!({"node": {"node": {"node": 3}}});
        assert_eq!(
            lookup_all(&doc, &["node"]),
            vec![
                json!({"node": {"node": 3}}),
                json!({"node": 3}),
                json!(3)
            ]
        );
    }

    #[test]
    fn missing_keys_yield_empty_array() {
        assert_eq!(
            normalize(br#"[{"x": 1}]"#, &["y"]),
            Outcome::Document(json!([]))
        );
    }

    #[test]
    fn into_value_collapses_variants() {
        assert_eq!(Outcome::NoContent.into_value(), json!(true));
        assert_eq!(Outcome::Text("t".into()).into_value(), json!("t"));
        assert_eq!(Outcome::Document(json!({"k": 1})).into_value(), json!({"k": 1}));
    }
}
