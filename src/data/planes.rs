// ============================================================
// Layer 4 — Image Planes
// ============================================================
// Decoded images are stored channel-first (CHW) as f32 with
// the raw 0..255 pixel values. No normalisation is applied:
// the high-pass filters downstream only look at local
// differences, and the truncation threshold is tuned for
// this range.
//
// Rotations turn counter-clockwise: after one quarter turn the
// last column becomes the first row. Flips mirror the row axis.

use anyhow::{Context, Result};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct Planes {
    channels: usize,
    height:   usize,
    width:    usize,
    data:     Vec<f32>,
}

impl Planes {
    pub fn new(channels: usize, height: usize, width: usize, data: Vec<f32>) -> Self {
        assert_eq!(
            data.len(),
            channels * height * width,
            "plane data does not match {channels}x{height}x{width}"
        );
        Self { channels, height, width, data }
    }

    /// Decode any format the `image` crate understands into 3 RGB planes.
    pub fn open(path: &Path) -> Result<Self> {
        let rgb = image::open(path)
            .with_context(|| format!("Cannot decode image '{}'", path.display()))?
            .to_rgb8();
        Ok(Self::from_rgb(&rgb))
    }

    /// Interleaved HWC bytes → planar CHW floats
    pub fn from_rgb(rgb: &image::RgbImage) -> Self {
        let (width, height) = rgb.dimensions();
        let (width, height) = (width as usize, height as usize);
        let raw  = rgb.as_raw();
        let area = width * height;

        let mut data = vec![0.0f32; 3 * area];
        for (pixel, rgb) in raw.chunks_exact(3).enumerate() {
            for (c, &value) in rgb.iter().enumerate() {
                data[c * area + pixel] = value as f32;
            }
        }
        Self::new(3, height, width, data)
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn at(&self, c: usize, y: usize, x: usize) -> f32 {
        self.data[(c * self.height + y) * self.width + x]
    }

    /// Rotate each plane by `k` quarter turns counter-clockwise.
    /// Odd `k` swaps height and width.
    pub fn rot90(&self, k: usize) -> Self {
        let (h, w) = (self.height, self.width);
        let k = k % 4;
        if k == 0 {
            return self.clone();
        }

        let (out_h, out_w) = if k % 2 == 1 { (w, h) } else { (h, w) };
        let mut data = Vec::with_capacity(self.data.len());
        for c in 0..self.channels {
            for r in 0..out_h {
                for col in 0..out_w {
                    let value = match k {
                        1 => self.at(c, col, w - 1 - r),
                        2 => self.at(c, h - 1 - r, w - 1 - col),
                        _ => self.at(c, h - 1 - col, r),
                    };
                    data.push(value);
                }
            }
        }
        Self::new(self.channels, out_h, out_w, data)
    }

    /// Mirror the row axis (top row becomes bottom row).
    pub fn flip_rows(&self) -> Self {
        let row = self.width;
        let mut data = Vec::with_capacity(self.data.len());
        for c in 0..self.channels {
            for r in (0..self.height).rev() {
                let start = (c * self.height + r) * row;
                data.extend_from_slice(&self.data[start..start + row]);
            }
        }
        Self::new(self.channels, self.height, self.width, data)
    }
}
