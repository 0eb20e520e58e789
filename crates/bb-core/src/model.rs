use serde::{Deserialize, Serialize};

/// Unified model type definition shared across the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageModel {
    #[serde(rename = "models/gemini-2.5-flash-image")]
    NanoBanana,
    #[serde(rename = "models/gemini-3-pro-image-preview")]
    NanoBananaPro,
}

impl ImageModel {
    /// Model name for display
    pub fn name(&self) -> &str {
        match self {
            Self::NanoBanana => "Nano Banana",
            Self::NanoBananaPro => "Nano Banana Pro",
        }
    }

    /// Model ID for API communication
    pub fn id(&self) -> &str {
        match self {
            Self::NanoBanana => "models/gemini-2.5-flash-image",
            Self::NanoBananaPro => "models/gemini-3-pro-image-preview",
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        match self {
            Self::NanoBanana => "Gemini 2.5 Flash Image - fast, good for batches",
            Self::NanoBananaPro => "Gemini 3 Pro Image Preview - slower, higher quality",
        }
    }

    /// Parse a model identifier as sent by clients. The `models/` prefix is
    /// optional; anything unrecognized falls back to the default model.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        let Some(raw) = value else {
            return Self::default();
        };
        let raw = raw.trim();
        let raw = raw.strip_prefix("models/").unwrap_or(raw);
        match raw {
            "gemini-2.5-flash-image" => Self::NanoBanana,
            "gemini-3-pro-image-preview" => Self::NanoBananaPro,
            _ => Self::default(),
        }
    }

    /// All available models
    pub fn all() -> [ImageModel; 2] {
        [Self::NanoBanana, Self::NanoBananaPro]
    }
}

impl Default for ImageModel {
    fn default() -> Self {
        Self::NanoBanana
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_ids() {
        assert_eq!(ImageModel::NanoBanana.id(), "models/gemini-2.5-flash-image");
        assert_eq!(
            ImageModel::NanoBananaPro.id(),
            "models/gemini-3-pro-image-preview"
        );
    }

    #[test]
    fn test_parse_accepts_prefix_and_bare_names() {
        assert_eq!(
            ImageModel::parse_or_default(Some("models/gemini-2.5-flash-image")),
            ImageModel::NanoBanana
        );
        assert_eq!(
            ImageModel::parse_or_default(Some("gemini-3-pro-image-preview")),
            ImageModel::NanoBananaPro
        );
    }

    #[test]
    fn test_parse_falls_back_to_default() {
        assert_eq!(ImageModel::parse_or_default(None), ImageModel::NanoBanana);
        assert_eq!(
            ImageModel::parse_or_default(Some("dall-e-3")),
            ImageModel::NanoBanana
        );
    }

    #[test]
    fn test_serde_uses_api_id() {
        let json = serde_json::to_string(&ImageModel::NanoBanana).unwrap();
        assert_eq!(json, "\"models/gemini-2.5-flash-image\"");
    }

    #[test]
    fn test_all_models() {
        assert_eq!(ImageModel::all().len(), 2);
    }
}
