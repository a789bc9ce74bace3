//! Metadata describing a loaded animation.

use serde::{Deserialize, Serialize};

/// Orientation declared by the animation file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    None,
    Portrait,
    Landscape,
}

/// Rectangle inside the video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// Read-only metadata reported once per play on config-ready, and on some
/// platforms again with render events.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimationConfig {
    pub width: i32,
    pub height: i32,
    pub fps: i32,
    pub total_frames: i32,
    /// The file carries separate alpha and RGB regions.
    pub is_mix: bool,
    pub orientation: Orientation,
    pub video_width: i32,
    pub video_height: i32,
    pub alpha_region: Region,
    pub rgb_region: Region,
    pub format_version: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decodes_camel_case_map() {
        let config: AnimationConfig = serde_json::from_value(json!({
            "width": 750,
            "height": 1334,
            "fps": 25,
            "totalFrames": 100,
            "isMix": true,
            "orientation": "portrait",
            "videoWidth": 1136,
            "videoHeight": 1344,
            "alphaRegion": {"x": 752, "y": 0, "w": 375, "h": 667},
            "rgbRegion": {"x": 0, "y": 0, "w": 750, "h": 1334},
            "formatVersion": 2
        }))
        .unwrap();
        assert_eq!(config.total_frames, 100);
        assert!(config.is_mix);
        assert_eq!(config.orientation, Orientation::Portrait);
        assert_eq!(config.alpha_region.x, 752);
        assert_eq!(config.rgb_region.h, 1334);
    }

    #[test]
    fn test_missing_fields_default() {
        let config: AnimationConfig = serde_json::from_value(json!({"fps": 0})).unwrap();
        assert_eq!(config.orientation, Orientation::None);
        assert_eq!(config.total_frames, 0);
    }
}
