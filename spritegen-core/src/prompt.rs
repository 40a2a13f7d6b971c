use crate::GenerationRequest;

/// Positive and negative prompt for a single generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub positive: String,
    pub negative: String,
}

impl PromptPair {
    /// First `max_chars` characters of the positive prompt, for log lines.
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.positive.char_indices().nth(max_chars) {
            Some((end, _)) => &self.positive[..end],
            None => &self.positive,
        }
    }
}

/// The fixed phrases wrapped around a request for one checkpoint family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub style_phrases: &'static [&'static str],
    pub negative: &'static str,
}

impl PromptTemplate {
    pub const SD15: Self = Self {
        style_phrases: &[
            "crisp clean pixels",
            "16-bit retro game graphics",
            "side view",
            "game sprite",
            "vibrant colors",
            "high detail pixel art",
        ],
        negative: "blurry, low quality, 3d render, realistic, photograph, \
                   smooth gradients, anti-aliased, watermark, text",
    };

    pub const SDXL: Self = Self {
        style_phrases: &[
            "crisp clean pixels",
            "16-bit retro game graphics",
            "side view",
            "transparent background",
            "sprite sheet ready",
            "vibrant colors",
            "high detail",
        ],
        negative: "blurry, low quality, 3d render, realistic, photograph, \
                   smooth gradients, anti-aliased",
    };

    pub fn build(&self, request: &GenerationRequest) -> PromptPair {
        let positive = format!(
            "pixel art sprite, {}, {} style, {}",
            request.description,
            request.game_style,
            self.style_phrases.join(", ")
        );
        PromptPair {
            positive,
            negative: self.negative.to_string(),
        }
    }
}
