//! JSON encoding of the envelope.
//!
//! The payload body is kept as a raw `serde_json::Value` only while decoding
//! the envelope; it is turned into the typed variant right away using the
//! `type` discriminant.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{ExpansionState, MediaObject, ObjectKind, Payload};

impl Serialize for ObjectKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ObjectKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_blank(value: &&str) -> bool {
    value.is_empty()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeOut<'a> {
    #[serde(skip_serializing_if = "is_blank")]
    uri: &'a str,
    #[serde(rename = "type")]
    kind: ObjectKind,
    #[serde(skip_serializing_if = "is_blank")]
    provider: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires: Option<&'a DateTime<Utc>>,
    #[serde(rename = "lastMod", skip_serializing_if = "Option::is_none")]
    last_modified: Option<&'a DateTime<Utc>>,
    object: &'a Payload,
    #[serde(skip_serializing_if = "is_false")]
    expanding: bool,
    #[serde(skip_serializing_if = "is_false")]
    expanded: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeIn {
    #[serde(default)]
    uri: String,
    #[serde(rename = "type")]
    kind: ObjectKind,
    #[serde(default)]
    provider: String,
    #[serde(default)]
    expires: Option<DateTime<Utc>>,
    #[serde(default, rename = "lastMod")]
    last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    object: serde_json::Value,
    #[serde(default)]
    expanding: bool,
    #[serde(default)]
    expanded: bool,
}

impl Serialize for MediaObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (expanding, expanded) = self.state.flags();
        EnvelopeOut {
            uri: &self.uri,
            kind: self.kind(),
            provider: &self.provider,
            expires: self.expires.as_ref(),
            last_modified: self.last_modified.as_ref(),
            object: &self.payload,
            expanding,
            expanded,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MediaObject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let envelope = EnvelopeIn::deserialize(deserializer)?;
        let payload = Payload::from_value(envelope.kind, envelope.object).map_err(|e| {
            D::Error::custom(format!("invalid {} payload: {e}", envelope.kind))
        })?;
        Ok(MediaObject {
            uri: envelope.uri,
            provider: envelope.provider,
            expires: envelope.expires,
            last_modified: envelope.last_modified,
            payload,
            state: ExpansionState::from_flags(envelope.expanding, envelope.expanded),
        })
    }
}
