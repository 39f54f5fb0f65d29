use serde::{Deserialize, Serialize};

use crate::tier::Tier;

/// Row-major H x W x 3 channel data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PixelBuffer {
    /// Linear channel values, nominally in `0.0..=1.0`.
    F32(Vec<f32>),
    U8(Vec<u8>),
}

impl PixelBuffer {
    pub fn len(&self) -> usize {
        match self {
            PixelBuffer::F32(v) => v.len(),
            PixelBuffer::U8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A rendered RGB image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub pixels: PixelBuffer,
}

impl Image {
    pub const CHANNELS: usize = 3;

    pub fn new(width: u32, height: u32, pixels: PixelBuffer) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// A black `f32` image sized for `tier`. Empty if the tier's buffer
    /// length does not fit in `usize`.
    pub fn blank_for(tier: &Tier) -> Self {
        let len = Self::expected_len(tier.width, tier.height).unwrap_or(0);
        Self::new(tier.width, tier.height, PixelBuffer::F32(vec![0.0; len]))
    }

    /// Buffer length for a `width` x `height` image, `None` on overflow.
    pub fn expected_len(width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(Self::CHANNELS)
    }

    /// Check that this image is what a render of `tier` should have produced.
    /// Returns `(expected, actual)` descriptions on mismatch.
    pub fn validate_for(&self, tier: &Tier) -> Result<(), (String, String)> {
        let Some(expected_len) = Self::expected_len(tier.width, tier.height) else {
            return Err((
                format!("{}x{}x3 (buffer length overflows)", tier.width, tier.height),
                format!("{}x{}x3 ({} values)", self.width, self.height, self.pixels.len()),
            ));
        };
        if self.width != tier.width
            || self.height != tier.height
            || self.pixels.len() != expected_len
        {
            return Err((
                format!("{}x{}x3 ({} values)", tier.width, tier.height, expected_len),
                format!(
                    "{}x{}x3 ({} values)",
                    self.width,
                    self.height,
                    self.pixels.len()
                ),
            ));
        }
        Ok(())
    }
}
