use crate::foundation::error::{LiikeError, LiikeResult};

/// Raw RGBA8 frame, row-major, `width * height * 4` bytes with no padding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Whether color channels are premultiplied by alpha.
    pub premultiplied: bool,
}

impl FrameBuffer {
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; Self::byte_len(width, height)],
            premultiplied: true,
        }
    }

    pub fn from_premul(width: u32, height: u32, data: Vec<u8>) -> LiikeResult<Self> {
        if data.len() != Self::byte_len(width, height) {
            return Err(LiikeError::validation(format!(
                "frame data is {} bytes, expected {} for {width}x{height}",
                data.len(),
                Self::byte_len(width, height)
            )));
        }
        Ok(Self {
            width,
            height,
            data,
            premultiplied: true,
        })
    }

    pub fn byte_len(width: u32, height: u32) -> usize {
        (width as usize) * (height as usize) * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Largest per-channel difference to `other`; `None` when sizes differ.
    pub fn max_channel_diff(&self, other: &Self) -> Option<u8> {
        if self.width != other.width || self.height != other.height {
            return None;
        }
        self.data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a.abs_diff(*b))
            .max()
            .or(Some(0))
    }

    /// Copy with straight (non-premultiplied) alpha.
    pub fn to_straight(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        if self.premultiplied {
            crate::foundation::math::unpremultiply_rgba8_in_place(&mut out);
        }
        out
    }
}
