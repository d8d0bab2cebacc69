use crate::response::ApiResponse;
use crate::serializer::{Payload, Serializer};

/// Runs serializers in order, each fed the previous one's output.
#[derive(Default)]
pub struct ChainedSerializer {
    serializers: Vec<Box<dyn Serializer>>,
}

impl ChainedSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, serializer: impl Serializer + 'static) -> Self {
        self.serializers.push(Box::new(serializer));
        self
    }

    pub fn serializers(&self) -> &[Box<dyn Serializer>] {
        &self.serializers
    }
}

impl Serializer for ChainedSerializer {
    fn name(&self) -> &'static str {
        "chained"
    }

    fn serialize(&self, payload: Payload, response: &mut ApiResponse) -> Payload {
        self.serializers
            .iter()
            .fold(payload, |acc, s| s.serialize(acc, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    struct Wrap(&'static str);

    impl Serializer for Wrap {
        fn name(&self) -> &'static str {
            "wrap"
        }

        fn serialize(&self, payload: Payload, _response: &mut ApiResponse) -> Payload {
            match payload {
                Payload::Value(v) => {
                    let mut map = serde_json::Map::new();
                    map.insert(self.0.to_string(), v);
                    Payload::Value(Value::Object(map))
                }
                other => other,
            }
        }
    }

    #[test]
    fn runs_in_order() {
        let chain = ChainedSerializer::new().add(Wrap("inner")).add(Wrap("outer"));
        assert_eq!(chain.serializers().len(), 2);
        let mut res = ApiResponse::new();
        let out = chain.serialize(Payload::Value(Value::from(1)), &mut res);
        assert_eq!(out.as_value(), Some(&json!({ "outer": { "inner": 1 } })));
    }
}
