//! CLI enum types for content kinds.

use clap::ValueEnum;

use vap_bridge::content::{Content, ContentType};

/// Content type accepted by `content encode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ContentKind {
    Text,
    ImageBase64,
    ImageFile,
    ImageAsset,
    ImageUrl,
    /// Infer the image variant from the value
    Image,
}

impl ContentKind {
    fn content_type(self) -> Option<ContentType> {
        match self {
            ContentKind::Text => Some(ContentType::Text),
            ContentKind::ImageBase64 => Some(ContentType::ImageBase64),
            ContentKind::ImageFile => Some(ContentType::ImageFile),
            ContentKind::ImageAsset => Some(ContentType::ImageAsset),
            ContentKind::ImageUrl => Some(ContentType::ImageUrl),
            ContentKind::Image => None,
        }
    }

    pub fn to_content(self, value: String) -> Content {
        match self.content_type() {
            Some(content_type) => Content::from_parts(content_type, value),
            None => Content::infer_image(value),
        }
    }
}
