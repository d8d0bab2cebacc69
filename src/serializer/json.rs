use crate::request::ApiRequest;
use crate::response::ApiResponse;
use crate::serializer::{Payload, Serializer};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

const INDENT: &[u8] = b"    ";

/// Encodes the payload as the JSON response body. Pretty-printed unless the request
/// asks for `compact`.
#[derive(Clone, Debug)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    pub fn new(request: &ApiRequest) -> Self {
        JsonSerializer {
            pretty: !request.query_flag("compact"),
        }
    }

    pub fn pretty_print(&mut self) -> &mut Self {
        self.pretty = true;
        self
    }

    pub fn compact_print(&mut self) -> &mut Self {
        self.pretty = false;
        self
    }

    pub fn is_pretty(&self) -> bool {
        self.pretty
    }

    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, serde_json::Error> {
        if !self.pretty {
            return serde_json::to_string(value);
        }
        let mut buf = Vec::with_capacity(128);
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
        value.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| serde::ser::Error::custom(e.to_string()))
    }

    fn to_value(payload: &Payload) -> Option<Result<Value, serde_json::Error>> {
        match payload {
            Payload::Empty => None,
            Payload::Value(v) if !(v.is_object() || v.is_array()) => None,
            Payload::Value(v) => Some(Ok(v.clone())),
            Payload::Model(m) => Some(m.to_record().map(Value::Object)),
            Payload::Collection(models) => Some(
                models
                    .iter()
                    .map(|m| m.to_record().map(Value::Object))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
            ),
        }
    }
}

impl Serializer for JsonSerializer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn serialize(&self, payload: Payload, response: &mut ApiResponse) -> Payload {
        let Some(value) = Self::to_value(&payload) else {
            return payload;
        };
        match value.and_then(|v| self.encode(&v)) {
            Ok(body) => {
                response.set_content_type("application/json").set_body(body);
            }
            Err(e) => {
                tracing::error!(error = %e, "unable to encode response as JSON");
            }
        }
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Unencodable;
    use serde_json::json;

    fn nested() -> Value {
        json!({
            "answer": 42,
            "nested": {
                "id": 10,
                "name": "John Appleseed"
            }
        })
    }

    #[test]
    fn compact_flag_on_request() {
        let serializer = JsonSerializer::new(&ApiRequest::new("/").with_query("compact", "true"));
        assert!(!serializer.is_pretty());

        let mut serializer = JsonSerializer::new(&ApiRequest::new("/"));
        assert!(serializer.is_pretty());
        serializer.compact_print();
        assert!(!serializer.is_pretty());
        serializer.pretty_print();
        assert!(serializer.is_pretty());
    }

    #[test]
    fn pretty_prints_by_default() {
        let serializer = JsonSerializer::new(&ApiRequest::new("/"));
        let mut res = ApiResponse::new();

        let out = serializer.serialize(Payload::Value(json!("blah")), &mut res);
        assert_eq!(out.as_value(), Some(&json!("blah")));
        assert_eq!(res.body(), None);

        serializer.serialize(Payload::Value(nested()), &mut res);
        assert_eq!(res.content_type(), Some("application/json"));
        let expected = "{\n    \"answer\": 42,\n    \"nested\": {\n        \"id\": 10,\n        \"name\": \"John Appleseed\"\n    }\n}";
        assert_eq!(res.body(), Some(expected));
    }

    #[test]
    fn compact_output() {
        let mut serializer = JsonSerializer::new(&ApiRequest::new("/"));
        serializer.compact_print();
        let mut res = ApiResponse::new();
        serializer.serialize(Payload::Value(nested()), &mut res);
        assert_eq!(
            res.body(),
            Some(r#"{"answer":42,"nested":{"id":10,"name":"John Appleseed"}}"#)
        );
    }

    #[test]
    fn encoding_failure_is_logged_not_raised() {
        let serializer = JsonSerializer::new(&ApiRequest::new("/"));
        let mut res = ApiResponse::new();
        let out = serializer.serialize(Payload::model(Unencodable::default()), &mut res);
        assert!(matches!(out, Payload::Model(_)));
        assert_eq!(res.body(), None);
        assert_eq!(res.content_type(), None);
    }

    #[test]
    fn empty_payload_leaves_body_unset() {
        let serializer = JsonSerializer::new(&ApiRequest::new("/"));
        let mut res = ApiResponse::new();
        assert!(matches!(serializer.serialize(Payload::Empty, &mut res), Payload::Empty));
        assert_eq!(res.body(), None);
    }
}
