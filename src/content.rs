//! Injectable tag content and its two-field wire form.
//!
//! Every value crossing the channel is a map `{contentType, contentValue}`.
//! Decoding also accepts the generic `image` tag, whose concrete variant is
//! inferred from the value's syntax.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire key holding the content type tag.
pub const CONTENT_TYPE_KEY: &str = "contentType";

/// Wire key holding the content value.
pub const CONTENT_VALUE_KEY: &str = "contentValue";

/// Generic image tag accepted on decode only; never produced by encode.
pub const GENERIC_IMAGE_TAG: &str = "image";

/// The five concrete content type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Text,
    ImageBase64,
    ImageFile,
    ImageAsset,
    ImageUrl,
}

impl ContentType {
    pub const ALL: [ContentType; 5] = [
        ContentType::Text,
        ContentType::ImageBase64,
        ContentType::ImageFile,
        ContentType::ImageAsset,
        ContentType::ImageUrl,
    ];

    /// Wire tag for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::ImageBase64 => "image_base64",
            ContentType::ImageFile => "image_file",
            ContentType::ImageAsset => "image_asset",
            ContentType::ImageUrl => "image_url",
        }
    }

    /// Parse one of the five concrete wire tags. The generic `image` tag is
    /// not a concrete type and yields `None` here.
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content injected into a tag slot of an animation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Content {
    /// Plain text drawn into the slot.
    Text(String),
    /// Base64 image data, optionally prefixed with `data:image/...;base64,`
    /// or `base64:`.
    ImageBase64(String),
    /// Filesystem path: absolute, `file://` URL, or relative to app storage.
    ImageFile(String),
    /// Path relative to the bundled asset root.
    ImageAsset(String),
    /// Remote http/https image.
    ImageUrl(String),
}

impl Content {
    pub fn text(value: impl Into<String>) -> Self {
        Content::Text(value.into())
    }

    pub fn from_parts(content_type: ContentType, value: String) -> Self {
        match content_type {
            ContentType::Text => Content::Text(value),
            ContentType::ImageBase64 => Content::ImageBase64(value),
            ContentType::ImageFile => Content::ImageFile(value),
            ContentType::ImageAsset => Content::ImageAsset(value),
            ContentType::ImageUrl => Content::ImageUrl(value),
        }
    }

    /// Infer the concrete image variant from the value's syntax.
    ///
    /// `http://`/`https://` is a URL, `data:image/` is base64, `assets/` is a
    /// bundled asset, anything else is a file path. A real file path that
    /// starts with `assets/` is read as an asset; callers that care must send
    /// the concrete tag.
    pub fn infer_image(value: String) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            Content::ImageUrl(value)
        } else if value.starts_with("data:image/") {
            Content::ImageBase64(value)
        } else if value.starts_with("assets/") {
            Content::ImageAsset(value)
        } else {
            Content::ImageFile(value)
        }
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            Content::Text(_) => ContentType::Text,
            Content::ImageBase64(_) => ContentType::ImageBase64,
            Content::ImageFile(_) => ContentType::ImageFile,
            Content::ImageAsset(_) => ContentType::ImageAsset,
            Content::ImageUrl(_) => ContentType::ImageUrl,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Content::Text(v)
            | Content::ImageBase64(v)
            | Content::ImageFile(v)
            | Content::ImageAsset(v)
            | Content::ImageUrl(v) => v,
        }
    }

    pub fn to_wire(&self) -> WireContent {
        WireContent {
            content_type: self.content_type().as_str().to_string(),
            content_value: self.value().to_string(),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(2);
        map.insert(
            CONTENT_TYPE_KEY.to_string(),
            Value::String(self.content_type().as_str().to_string()),
        );
        map.insert(
            CONTENT_VALUE_KEY.to_string(),
            Value::String(self.value().to_string()),
        );
        Value::Object(map)
    }

    /// Decode a single wire map.
    pub fn from_value(value: &Value) -> Result<Self, ContentError> {
        let content_type = string_field(value, CONTENT_TYPE_KEY)?;
        let content_value = string_field(value, CONTENT_VALUE_KEY)?;
        WireContent {
            content_type: content_type.to_string(),
            content_value: content_value.to_string(),
        }
        .try_into()
    }
}

fn string_field<'a>(value: &'a Value, key: &'static str) -> Result<&'a str, ContentError> {
    value
        .get(key)
        .and_then(Value::as_str)
        .ok_or(ContentError::MissingField(key))
}

/// Typed view of the two-field wire map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireContent {
    pub content_type: String,
    pub content_value: String,
}

impl From<&Content> for WireContent {
    fn from(content: &Content) -> Self {
        content.to_wire()
    }
}

impl TryFrom<WireContent> for Content {
    type Error = ContentError;

    fn try_from(wire: WireContent) -> Result<Self, Self::Error> {
        if wire.content_type == GENERIC_IMAGE_TAG {
            return Ok(Content::infer_image(wire.content_value));
        }
        match ContentType::parse(&wire.content_type) {
            Some(content_type) => Ok(Content::from_parts(content_type, wire.content_value)),
            None => Err(ContentError::UnknownContentType(wire.content_type)),
        }
    }
}

/// Encode a tag→content mapping element-wise.
pub fn encode_batch(contents: &HashMap<String, Content>) -> Value {
    let map: Map<String, Value> = contents
        .iter()
        .map(|(tag, content)| (tag.clone(), content.to_value()))
        .collect();
    Value::Object(map)
}

/// Decode a tag→wire mapping. Fails on the first bad element and returns
/// nothing decoded so far.
pub fn decode_batch(value: &Value) -> Result<HashMap<String, Content>, ContentError> {
    let map = value.as_object().ok_or(ContentError::NotAMapping)?;
    map.iter()
        .map(|(tag, item)| {
            Content::from_value(item)
                .map(|content| (tag.clone(), content))
                .map_err(|e| {
                    log::warn!("Rejecting content batch, tag '{}' is malformed: {}", tag, e);
                    e
                })
        })
        .collect()
}

/// Errors decoding content from its wire form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    #[error("unknown content type '{0}'")]
    UnknownContentType(String),

    #[error("missing or non-string field '{0}'")]
    MissingField(&'static str),

    #[error("content batch is not a mapping")]
    NotAMapping,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn all_variants() -> Vec<Content> {
        vec![
            Content::Text("Hello".into()),
            Content::ImageBase64("data:image/png;base64,iVBORw0KGgo=".into()),
            Content::ImageFile("/sdcard/avatar.png".into()),
            Content::ImageAsset("assets/images/head.png".into()),
            Content::ImageUrl("https://cdn.example.com/a.png".into()),
        ]
    }

    #[test]
    fn test_every_variant_survives_wire_form() {
        for content in all_variants() {
            let decoded = Content::from_value(&content.to_value()).unwrap();
            assert_eq!(decoded, content);
        }
    }

    #[test]
    fn test_wire_form_has_exactly_two_fields() {
        let value = Content::ImageUrl("https://x/y.png".into()).to_value();
        assert_eq!(
            value,
            json!({"contentType": "image_url", "contentValue": "https://x/y.png"})
        );
    }

    #[test]
    fn test_wire_content_serde_uses_camel_case() {
        let wire = Content::Text("hi".into()).to_wire();
        let value = serde_json::to_value(&wire).unwrap();
        assert_eq!(value, json!({"contentType": "text", "contentValue": "hi"}));
        let back: WireContent = serde_json::from_value(value).unwrap();
        assert_eq!(back, wire);
    }

    #[test]
    fn test_generic_image_tag_infers_variant() {
        let cases = [
            ("https://x/y.png", Content::ImageUrl("https://x/y.png".into())),
            ("http://x/y.png", Content::ImageUrl("http://x/y.png".into())),
            ("assets/a.png", Content::ImageAsset("assets/a.png".into())),
            (
                "data:image/png;base64,AAA",
                Content::ImageBase64("data:image/png;base64,AAA".into()),
            ),
            ("anything/else.png", Content::ImageFile("anything/else.png".into())),
        ];
        for (value, expected) in cases {
            let decoded =
                Content::from_value(&json!({"contentType": "image", "contentValue": value}))
                    .unwrap();
            assert_eq!(decoded, expected, "value: {}", value);
        }
    }

    #[test]
    fn test_unknown_content_type_rejected() {
        let result = Content::from_value(&json!({"contentType": "video", "contentValue": "x"}));
        assert_eq!(
            result,
            Err(ContentError::UnknownContentType("video".to_string()))
        );
    }

    #[test]
    fn test_missing_or_non_string_fields_rejected() {
        assert_eq!(
            Content::from_value(&json!({"contentValue": "x"})),
            Err(ContentError::MissingField(CONTENT_TYPE_KEY))
        );
        assert_eq!(
            Content::from_value(&json!({"contentType": "text"})),
            Err(ContentError::MissingField(CONTENT_VALUE_KEY))
        );
        assert_eq!(
            Content::from_value(&json!({"contentType": "text", "contentValue": 7})),
            Err(ContentError::MissingField(CONTENT_VALUE_KEY))
        );
        assert_eq!(
            Content::from_value(&json!("text")),
            Err(ContentError::MissingField(CONTENT_TYPE_KEY))
        );
    }

    #[test]
    fn test_batch_decode_is_atomic() {
        let value = json!({
            "name": {"contentType": "text", "contentValue": "Alice"},
            "bad": {"contentType": "sticker", "contentValue": "x"},
        });
        assert!(matches!(
            decode_batch(&value),
            Err(ContentError::UnknownContentType(_))
        ));
    }

    #[test]
    fn test_batch_encode_then_decode() {
        let mut contents = HashMap::new();
        contents.insert("name".to_string(), Content::Text("Alice".into()));
        contents.insert("avatar".to_string(), Content::ImageAsset("assets/a.png".into()));
        let decoded = decode_batch(&encode_batch(&contents)).unwrap();
        assert_eq!(decoded, contents);
    }

    #[test]
    fn test_batch_decode_requires_mapping() {
        assert_eq!(decode_batch(&json!([1, 2])), Err(ContentError::NotAMapping));
        assert!(decode_batch(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn test_content_type_parse_rejects_generic_tag() {
        assert_eq!(ContentType::parse("image"), None);
        assert_eq!(ContentType::parse("image_file"), Some(ContentType::ImageFile));
    }
}
