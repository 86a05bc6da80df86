//! Format-aware re-encoding of image bytes.
//!
//! Animated GIFs keep their frames and timing but every frame is composited
//! over an opaque background, since downstream clients render alpha poorly.
//! Everything else is normalized to PNG.

use crate::error::{ResourceError, ResourceResult};
use bytes::Bytes;
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::{AnimationDecoder, DynamicImage, Frame, Rgba, RgbaImage, imageops};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Image encodings the cache knows about, in probing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceFormat {
    Gif,
    Png,
    Jpg,
}

impl ResourceFormat {
    pub const PROBE_ORDER: [ResourceFormat; 3] =
        [ResourceFormat::Gif, ResourceFormat::Png, ResourceFormat::Jpg];

    pub const fn extension(self) -> &'static str {
        match self {
            ResourceFormat::Gif => "gif",
            ResourceFormat::Png => "png",
            ResourceFormat::Jpg => "jpg",
        }
    }

    pub const fn content_type(self) -> &'static str {
        match self {
            ResourceFormat::Gif => "image/gif",
            ResourceFormat::Png => "image/png",
            ResourceFormat::Jpg => "image/jpeg",
        }
    }

    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            image::ImageFormat::Gif => Some(ResourceFormat::Gif),
            image::ImageFormat::Png => Some(ResourceFormat::Png),
            image::ImageFormat::Jpeg => Some(ResourceFormat::Jpg),
            _ => None,
        }
    }
}

/// Opaque background color used when flattening transparency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Background(pub [u8; 3]);

impl Default for Background {
    fn default() -> Self {
        Self([240, 240, 240])
    }
}

impl Background {
    fn pixel(self) -> Rgba<u8> {
        let [r, g, b] = self.0;
        Rgba([r, g, b, 255])
    }
}

/// Re-encodes fetched bytes into their canonical cached form.
pub fn canonicalize(bytes: &[u8], background: Background) -> ResourceResult<(ResourceFormat, Bytes)> {
    match ResourceFormat::sniff(bytes) {
        Some(ResourceFormat::Gif) => Ok((ResourceFormat::Gif, flatten_gif(bytes, background)?)),
        Some(_) => Ok((ResourceFormat::Png, to_png(&image::load_from_memory(bytes)?)?)),
        None => Err(ResourceError::Decode("unrecognized image format".to_string())),
    }
}

/// Composites every GIF frame over `background`, preserving delays and
/// looping forever.
pub fn flatten_gif(bytes: &[u8], background: Background) -> ResourceResult<Bytes> {
    let decoder = GifDecoder::new(Cursor::new(bytes))?;
    let frames = decoder.into_frames().collect_frames()?;
    if frames.is_empty() {
        return Err(ResourceError::Decode("gif has no frames".to_string()));
    }

    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut out);
        encoder.set_repeat(Repeat::Infinite)?;
        for frame in frames {
            let (left, top, delay) = (frame.left(), frame.top(), frame.delay());
            let buffer = frame.into_buffer();
            let mut canvas = RgbaImage::from_pixel(buffer.width(), buffer.height(), background.pixel());
            imageops::overlay(&mut canvas, &buffer, 0, 0);
            encoder.encode_frame(Frame::from_parts(canvas, left, top, delay))?;
        }
    }
    Ok(Bytes::from(out))
}

/// Composites a still image over `background` and returns PNG bytes.
pub fn flatten_still(bytes: &[u8], background: Background) -> ResourceResult<Bytes> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    let mut canvas = RgbaImage::from_pixel(image.width(), image.height(), background.pixel());
    imageops::overlay(&mut canvas, &image, 0, 0);
    to_png(&DynamicImage::ImageRgba8(canvas))
}

fn to_png(image: &DynamicImage) -> ResourceResult<Bytes> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, image::ImageFormat::Png)?;
    Ok(Bytes::from(out.into_inner()))
}
