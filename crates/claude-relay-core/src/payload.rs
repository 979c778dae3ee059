use claude_relay_common::DEFAULT_MAX_TOKENS;
use serde::Serialize;
use serde_json::{Map, Value};

/// Body accepted on `POST /api/analyze`.
///
/// None of the fields is type-checked here: whatever the caller sent is
/// forwarded and the upstream decides whether it is valid. Fields other than
/// these three are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboundRequest {
    pub model: Option<Value>,
    pub max_tokens: Option<Value>,
    pub messages: Option<Value>,
}

/// Body sent to the upstream messages endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpstreamMessagesBody {
    pub model: Value,
    pub max_tokens: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Value>,
}

impl InboundRequest {
    /// Fails only when `body` is not JSON. A JSON document that is not an
    /// object carries none of the fields.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        Ok(Self::from_value(serde_json::from_slice(body)?))
    }

    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self::default();
        };
        Self {
            model: take_present(&mut fields, "model"),
            max_tokens: take_present(&mut fields, "max_tokens"),
            messages: take_present(&mut fields, "messages"),
        }
    }

    /// Fills in defaults. `null`, `false`, `""` and `0` count as missing;
    /// anything else is forwarded as sent.
    pub fn into_upstream(self, default_model: &str) -> UpstreamMessagesBody {
        UpstreamMessagesBody {
            model: self
                .model
                .filter(is_truthy)
                .unwrap_or_else(|| Value::from(default_model)),
            max_tokens: self
                .max_tokens
                .filter(is_truthy)
                .unwrap_or_else(|| Value::from(DEFAULT_MAX_TOKENS)),
            messages: self.messages,
        }
    }
}

fn take_present(fields: &mut Map<String, Value>, key: &str) -> Option<Value> {
    fields.remove(key).filter(|value| !value.is_null())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
