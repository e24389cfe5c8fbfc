// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Wire codecs for the distributed backend.
//!
//! A process crosses the wire lossily: only `{id, parentId, input}` are
//! serialized and context is intentionally dropped. Values and rejection
//! reasons travel in an envelope that distinguishes "no value" from a value
//! that is present but null.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::CodecError;
use crate::task::Process;

/// Lossy wire form of a [`Process`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireProcess {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_id: Option<Uuid>,
    pub input: Value,
}

/// Value envelope: `has_value: false` means no value at all, as opposed to a
/// present null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    has_value: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    value: Option<Value>,
}

pub fn encode_process(process: &Process) -> Result<String, CodecError> {
    let wire = WireProcess {
        id: process.id(),
        parent_id: process.parent_id(),
        input: process.input().clone(),
    };
    serde_json::to_string(&wire).map_err(|error| CodecError::Encode {
        what: "process",
        message: error.to_string(),
    })
}

pub fn decode_process(payload: &str) -> Result<WireProcess, CodecError> {
    serde_json::from_str(payload).map_err(|error| CodecError::Decode {
        what: "process",
        message: error.to_string(),
    })
}

pub fn encode_value(value: Option<&Value>) -> Result<String, CodecError> {
    let envelope = Envelope {
        has_value: value.is_some(),
        value: value.cloned(),
    };
    serde_json::to_string(&envelope).map_err(|error| CodecError::Encode {
        what: "value",
        message: error.to_string(),
    })
}

pub fn decode_value(payload: &str) -> Result<Option<Value>, CodecError> {
    let envelope: Envelope = serde_json::from_str(payload).map_err(|error| CodecError::Decode {
        what: "value",
        message: error.to_string(),
    })?;
    if envelope.has_value {
        // A present-but-null value still counts as present.
        Ok(Some(envelope.value.unwrap_or(Value::Null)))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Definition, Spec};
    use crate::validation::any;
    use serde_json::json;

    #[test]
    fn process_serializes_exactly_id_parent_input() {
        let definition = Definition::new(Spec::new("add", any(), any()));
        let process = definition.call(json!([1, 2]));

        let payload = encode_process(&process).unwrap();
        let raw: Value = serde_json::from_str(&payload).unwrap();
        let object = raw.as_object().unwrap();
        assert_eq!(object.len(), 2); // no parent, no context on the wire
        assert!(object.contains_key("id"));
        assert_eq!(object.get("input"), Some(&json!([1, 2])));

        let wire = decode_process(&payload).unwrap();
        assert_eq!(wire.id, process.id());
        assert_eq!(wire.parent_id, None);
        assert_eq!(wire.input, json!([1, 2]));
    }

    #[test]
    fn envelope_distinguishes_absent_from_null() {
        let absent = encode_value(None).unwrap();
        let null = encode_value(Some(&Value::Null)).unwrap();
        assert_ne!(absent, null);

        assert_eq!(decode_value(&absent).unwrap(), None);
        assert_eq!(decode_value(&null).unwrap(), Some(Value::Null));
        let three = encode_value(Some(&json!(3))).unwrap();
        assert_eq!(decode_value(&three).unwrap(), Some(json!(3)));
    }
}
