//! Working frame buffer: RGBA pixel storage sized from the host resolution.

use thiserror::Error;

/// Bytes per RGBA pixel.
pub const RGBA_CHANNELS: usize = 4;

/// Largest accepted frame, in pixels (8K UHD).
pub const MAX_FRAME_PIXELS: u64 = 7680 * 4320;

#[derive(Error, Debug, PartialEq)]
pub enum FrameError {
    #[error("frame {width}x{height} exceeds {max} pixels", max = MAX_FRAME_PIXELS)]
    TooLarge { width: u32, height: u32 },
}

/// Fixed-size RGBA buffer the host copies each frame into.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; rgba_len(width, height)],
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Reallocate for new dimensions. Contents are zeroed.
    ///
    /// Oversized dimensions are rejected and the buffer is left as it was.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), FrameError> {
        if u64::from(width) * u64::from(height) > MAX_FRAME_PIXELS {
            return Err(FrameError::TooLarge { width, height });
        }
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(rgba_len(width, height), 0);
        Ok(())
    }

    /// Copy incoming pixels into the buffer, returning the number of bytes written.
    ///
    /// Bytes past the end of the buffer are dropped; a short input leaves the tail
    /// of the previous frame in place.
    pub fn copy_from(&mut self, pixels: &[u8]) -> usize {
        let n = pixels.len().min(self.data.len());
        self.data[..n].copy_from_slice(&pixels[..n]);
        if pixels.len() != self.data.len() && !pixels.is_empty() {
            tracing::warn!(
                expected = self.data.len(),
                actual = pixels.len(),
                "frame size does not match resolution"
            );
        }
        n
    }

    /// Sample one RGB pixel, or `None` outside the frame.
    pub fn rgb_at(&self, x: i64, y: i64) -> Option<[u8; 3]> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * RGBA_CHANNELS;
        self.data.get(i..i + 3).map(|p| [p[0], p[1], p[2]])
    }
}

fn rgba_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * RGBA_CHANNELS
}
