//! JSON encoding of request bodies and decoding of response bodies.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::http::Body;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Settings for the serde_json codec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonCodec {
    /// Emit indented JSON.
    pub pretty: bool,
    /// Decode an empty (or whitespace-only) body as JSON `null`, so targets
    /// like `Option<T>` or `()` accept `204 No Content`.
    pub empty_body_as_null: bool,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn empty_body_as_null(mut self, enabled: bool) -> Self {
        self.empty_body_as_null = enabled;
        self
    }

    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Body, serde_json::Error> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(Body::new(bytes).with_content_type(JSON_CONTENT_TYPE))
    }

    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, serde_json::Error> {
        if self.empty_body_as_null && bytes.iter().all(u8::is_ascii_whitespace) {
            return serde_json::from_slice(b"null");
        }
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Entity {
        id: u32,
    }

    #[test]
    fn encode_sets_json_content_type() {
        let body = JsonCodec::new().encode(&Entity { id: 1 }).unwrap();
        assert_eq!(body.content.as_ref(), br#"{"id":1}"#);
        assert_eq!(body.content_type.as_deref(), Some(JSON_CONTENT_TYPE));
    }

    #[test]
    fn pretty_encoding_is_indented() {
        let body = JsonCodec::new().pretty(true).encode(&Entity { id: 1 }).unwrap();
        assert_eq!(body.content.as_ref(), b"{\n  \"id\": 1\n}");
    }

    #[test]
    fn empty_body_fails_by_default() {
        let codec = JsonCodec::new();
        assert!(codec.decode::<Option<Entity>>(b"").is_err());
    }

    #[test]
    fn empty_body_as_null_when_enabled() {
        let codec = JsonCodec::new().empty_body_as_null(true);
        assert_eq!(codec.decode::<Option<Entity>>(b" \n").unwrap(), None);
        assert_eq!(
            codec.decode::<Option<Entity>>(br#"{"id":3}"#).unwrap(),
            Some(Entity { id: 3 })
        );
    }
}
