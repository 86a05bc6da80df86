use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// How a card was produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    /// An exact answer.
    #[default]
    Success,
    /// A fuzzy match was accepted below the exact score.
    Guess,
    /// Nothing answered the query, or dispatch failed.
    Failed,
}

/// Binary attachment of a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardImage {
    pub bytes: Bytes,
    pub content_type: String,
}

impl CardImage {
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    /// Guesses the content type from the leading magic bytes.
    pub fn sniffed(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let content_type = sniff_content_type(&bytes);
        Self {
            bytes,
            content_type: content_type.to_string(),
        }
    }
}

fn sniff_content_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else {
        "application/octet-stream"
    }
}

/// Response payload handed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Card {
    pub text: String,
    pub images: Vec<CardImage>,
    pub status: CardStatus,
}

impl Card {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn image(bytes: impl Into<Bytes>) -> Self {
        Self {
            images: vec![CardImage::sniffed(bytes)],
            ..Self::default()
        }
    }

    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            images: Vec::new(),
            status: CardStatus::Failed,
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: CardImage) -> Self {
        self.images.push(image);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: CardStatus) -> Self {
        self.status = status;
        self
    }

    /// The first attached image, if any.
    pub fn first_image(&self) -> Option<&CardImage> {
        self.images.first()
    }

    /// A card with neither text nor images counts as no result.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.images.is_empty()
    }

    /// Appends another card: texts are joined with a newline and images
    /// keep their order. A guess anywhere makes the merged card a guess.
    pub fn merge(&mut self, other: Card) {
        if !other.text.is_empty() {
            if !self.text.is_empty() {
                self.text.push('\n');
            }
            self.text.push_str(&other.text);
        }
        self.images.extend(other.images);
        if other.status == CardStatus::Guess && self.status == CardStatus::Success {
            self.status = CardStatus::Guess;
        }
    }
}
