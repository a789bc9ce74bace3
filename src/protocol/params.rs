//! Initial parameters handed to a peer when its view is created.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::ScaleType;
use crate::content::{self, Content, ContentError};

/// View-creation parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreationParams {
    pub scale_type: ScaleType,
    /// Same meaning as the `setLoop` count.
    pub repeat: i32,
    pub mute: bool,
    pub tag_contents: Option<HashMap<String, Content>>,
}

impl CreationParams {
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("scaleType".into(), Value::from(self.scale_type.as_str()));
        map.insert("repeat".into(), Value::from(self.repeat));
        map.insert("mute".into(), Value::from(self.mute));
        if let Some(contents) = &self.tag_contents {
            map.insert("tagContents".into(), content::encode_batch(contents));
        }
        Value::Object(map)
    }

    /// Decode a creation payload. Missing or mistyped scalar keys take their
    /// defaults; malformed tag contents fail the whole payload.
    pub fn from_value(value: &Value) -> Result<Self, ContentError> {
        let scale_type = value
            .get("scaleType")
            .and_then(Value::as_str)
            .map(ScaleType::from_wire)
            .unwrap_or_default();
        let repeat = value
            .get("repeat")
            .and_then(Value::as_i64)
            .and_then(|r| i32::try_from(r).ok())
            .unwrap_or(0);
        let mute = value.get("mute").and_then(Value::as_bool).unwrap_or(false);
        let tag_contents = match value.get("tagContents") {
            Some(contents) if !contents.is_null() => Some(content::decode_batch(contents)?),
            _ => None,
        };
        Ok(Self {
            scale_type,
            repeat,
            mute,
            tag_contents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_for_empty_payload() {
        let params = CreationParams::from_value(&json!({})).unwrap();
        assert_eq!(params, CreationParams::default());
        assert_eq!(params.scale_type, ScaleType::FitCenter);
        assert_eq!(params.repeat, 0);
        assert!(!params.mute);
    }

    #[test]
    fn test_full_payload() {
        let params = CreationParams::from_value(&json!({
            "scaleType": "centerCrop",
            "repeat": -1,
            "mute": true,
            "tagContents": {
                "avatar": {"contentType": "image", "contentValue": "https://x/y.png"}
            }
        }))
        .unwrap();
        assert_eq!(params.scale_type, ScaleType::CenterCrop);
        assert_eq!(params.repeat, -1);
        assert!(params.mute);
        let contents = params.tag_contents.unwrap();
        assert_eq!(contents["avatar"], Content::ImageUrl("https://x/y.png".into()));
    }

    #[test]
    fn test_encoded_params_decode_back() {
        let mut contents = HashMap::new();
        contents.insert("name".to_string(), Content::Text("Ann".into()));
        let params = CreationParams {
            scale_type: ScaleType::FitXY,
            repeat: 2,
            mute: true,
            tag_contents: Some(contents),
        };
        assert_eq!(CreationParams::from_value(&params.to_value()).unwrap(), params);
    }

    #[test]
    fn test_bad_tag_contents_fail() {
        let result = CreationParams::from_value(&json!({
            "tagContents": {"a": {"contentType": "text"}}
        }));
        assert!(result.is_err());
    }
}
