use crate::request::ApiRequest;
use crate::response::ApiResponse;
use crate::serializer::{Payload, SerializableModel, Serializer};
use serde_json::Value;

/// Renders models into plain JSON objects, honouring `exclude` and `include`
/// (for hidden properties) query lists.
#[derive(Clone, Debug, Default)]
pub struct ModelSerializer {
    exclude: Vec<String>,
    include: Vec<String>,
}

impl ModelSerializer {
    pub fn new(request: &ApiRequest) -> Self {
        ModelSerializer {
            exclude: request.query_list("exclude"),
            include: request.query_list("include"),
        }
    }

    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    pub fn include(&self) -> &[String] {
        &self.include
    }

    fn render(&self, model: &dyn SerializableModel) -> Result<Value, serde_json::Error> {
        let hidden = model.hidden_properties();
        let mut record = model.to_record()?;
        record.retain(|key, _| {
            let concealed = hidden.contains(&key.as_str()) && !self.include.iter().any(|i| i == key);
            !concealed && !self.exclude.iter().any(|e| e == key)
        });
        Ok(Value::Object(record))
    }
}

impl Serializer for ModelSerializer {
    fn name(&self) -> &'static str {
        "model"
    }

    fn serialize(&self, payload: Payload, _response: &mut ApiResponse) -> Payload {
        match payload {
            Payload::Model(model) => match self.render(&*model) {
                Ok(v) => Payload::Value(v),
                Err(e) => {
                    tracing::debug!(model = model.model_name(), error = %e, "model not rendered");
                    Payload::Model(model)
                }
            },
            Payload::Collection(models) => {
                let rendered: Result<Vec<Value>, _> = models.iter().map(|m| self.render(&**m)).collect();
                match rendered {
                    Ok(values) => Payload::Value(Value::Array(values)),
                    Err(e) => {
                        tracing::debug!(error = %e, "collection not rendered");
                        Payload::Collection(models)
                    }
                }
            }
            other => other,
        }
    }
}
