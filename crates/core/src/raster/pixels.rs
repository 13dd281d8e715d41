//! Interleaved 8-bit image buffer tagged with its channel layout.

use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};
use ndarray::{Array3, ArrayView3};

use crate::error::{Error, Result};

/// Channel layout of a [`PixelBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Gray,
    GrayAlpha,
    Rgb,
    Rgba,
}

impl PixelLayout {
    pub fn channels(self) -> usize {
        match self {
            PixelLayout::Gray => 1,
            PixelLayout::GrayAlpha => 2,
            PixelLayout::Rgb => 3,
            PixelLayout::Rgba => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, PixelLayout::GrayAlpha | PixelLayout::Rgba)
    }

    /// Number of colour channels, excluding alpha
    pub fn color_channels(self) -> usize {
        if self.has_alpha() {
            self.channels() - 1
        } else {
            self.channels()
        }
    }

    /// Layout for a given band count: 1 gray, 2 gray+alpha, 3 RGB, 4 RGBA.
    pub fn from_channels(channels: usize) -> Result<Self> {
        match channels {
            1 => Ok(PixelLayout::Gray),
            2 => Ok(PixelLayout::GrayAlpha),
            3 => Ok(PixelLayout::Rgb),
            4 => Ok(PixelLayout::Rgba),
            n => Err(Error::UnsupportedDataType(format!(
                "{} channels (expected 1 to 4)",
                n
            ))),
        }
    }

    fn without_alpha(self) -> Self {
        match self {
            PixelLayout::GrayAlpha => PixelLayout::Gray,
            PixelLayout::Rgba => PixelLayout::Rgb,
            other => other,
        }
    }
}

/// Row-major interleaved `u8` pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    layout: PixelLayout,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Zero-filled buffer
    pub fn new(width: usize, height: usize, layout: PixelLayout) -> Self {
        Self {
            width,
            height,
            layout,
            data: vec![0; width * height * layout.channels()],
        }
    }

    pub fn from_raw(width: usize, height: usize, layout: PixelLayout, data: Vec<u8>) -> Result<Self> {
        if data.len() != width * height * layout.channels() {
            return Err(Error::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            layout,
            data,
        })
    }

    /// RGB images stay RGB; every other colour type is converted to RGBA.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let (width, height) = (image.width() as usize, image.height() as usize);
        match image {
            DynamicImage::ImageRgb8(rgb) => Self {
                width,
                height,
                layout: PixelLayout::Rgb,
                data: rgb.into_raw(),
            },
            other => Self {
                width,
                height,
                layout: PixelLayout::Rgba,
                data: other.to_rgba8().into_raw(),
            },
        }
    }

    /// Build from a `(band, row, col)` array; the band count picks the layout.
    pub fn from_bands(bands: ArrayView3<'_, u8>) -> Result<Self> {
        let (channels, height, width) = bands.dim();
        let layout = PixelLayout::from_channels(channels)?;
        let mut data = Vec::with_capacity(channels * height * width);
        for row in 0..height {
            for col in 0..width {
                for band in 0..channels {
                    data.push(bands[(band, row, col)]);
                }
            }
        }
        Self::from_raw(width, height, layout, data)
    }

    /// De-interleave into a `(band, row, col)` array.
    pub fn to_bands(&self) -> Array3<u8> {
        let channels = self.layout.channels();
        Array3::from_shape_fn((channels, self.height, self.width), |(band, row, col)| {
            self.data[(row * self.width + col) * channels + band]
        })
    }

    pub fn to_dynamic(&self) -> Result<DynamicImage> {
        let (w, h) = (self.width as u32, self.height as u32);
        let data = self.data.clone();
        let image = match self.layout {
            PixelLayout::Gray => GrayImage::from_raw(w, h, data).map(DynamicImage::ImageLuma8),
            PixelLayout::GrayAlpha => {
                GrayAlphaImage::from_raw(w, h, data).map(DynamicImage::ImageLumaA8)
            }
            PixelLayout::Rgb => RgbImage::from_raw(w, h, data).map(DynamicImage::ImageRgb8),
            PixelLayout::Rgba => RgbaImage::from_raw(w, h, data).map(DynamicImage::ImageRgba8),
        };
        image.ok_or(Error::InvalidDimensions {
            width: self.width,
            height: self.height,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    pub fn has_alpha(&self) -> bool {
        self.layout.has_alpha()
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Channel values of one pixel
    pub fn pixel(&self, x: usize, y: usize) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let c = self.channels();
        let start = (y * self.width + x) * c;
        Some(&self.data[start..start + c])
    }

    /// Copy `other` with its upper-left corner at `(x, y)`, clipping at the
    /// buffer edges. `other` is converted to this buffer's layout first.
    pub fn paste(&mut self, other: &PixelBuffer, x: i64, y: i64) {
        let converted;
        let src = if other.layout == self.layout {
            other
        } else {
            converted = other.convert(self.layout);
            &converted
        };

        let c = self.channels();
        let col_start = x.max(0);
        let col_end = (x + src.width as i64).min(self.width as i64);
        if col_start >= col_end {
            return;
        }
        let span = (col_end - col_start) as usize * c;

        for src_row in 0..src.height {
            let dst_row = y + src_row as i64;
            if dst_row < 0 || dst_row >= self.height as i64 {
                continue;
            }
            let src_off = (src_row * src.width + (col_start - x) as usize) * c;
            let dst_off = (dst_row as usize * self.width + col_start as usize) * c;
            self.data[dst_off..dst_off + span].copy_from_slice(&src.data[src_off..src_off + span]);
        }
    }

    /// Cut out a `width x height` window at `(x, y)`. Parts of the window
    /// outside the buffer are zero.
    pub fn crop(&self, x: i64, y: i64, width: usize, height: usize) -> PixelBuffer {
        let mut out = PixelBuffer::new(width, height, self.layout);
        out.paste(self, -x, -y);
        out
    }

    /// `(min, max)` of one channel, `None` for an empty buffer or an
    /// out-of-range channel.
    pub fn channel_extrema(&self, channel: usize) -> Option<(u8, u8)> {
        let c = self.channels();
        if channel >= c || self.data.is_empty() {
            return None;
        }
        let values = self.data.iter().skip(channel).step_by(c);
        Some(values.fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v))))
    }

    fn channel_is_zero(&self, channel: usize) -> bool {
        matches!(self.channel_extrema(channel), Some((0, 0)))
    }

    /// A tile with nothing to show: fully transparent (RGBA), or black in
    /// every colour channel.
    pub fn is_empty(&self) -> bool {
        if self.data.is_empty() {
            return true;
        }
        match self.layout {
            PixelLayout::Gray | PixelLayout::GrayAlpha => self.channel_is_zero(0),
            PixelLayout::Rgb => (0..3).all(|c| self.channel_is_zero(c)),
            PixelLayout::Rgba => self.channel_is_zero(3) || (0..3).all(|c| self.channel_is_zero(c)),
        }
    }

    /// True when there is no alpha channel or every alpha value is 255.
    pub fn is_fully_opaque(&self) -> bool {
        if !self.has_alpha() {
            return true;
        }
        let alpha = self.channels() - 1;
        matches!(self.channel_extrema(alpha), Some((255, 255)) | None)
    }

    pub fn drop_alpha(&self) -> PixelBuffer {
        self.convert(self.layout.without_alpha())
    }

    /// Convert to another layout. Gray expands by replication, colour
    /// reduces to ITU-R 601-2 luma, added alpha is opaque.
    pub fn convert(&self, layout: PixelLayout) -> PixelBuffer {
        if layout == self.layout {
            return self.clone();
        }

        let src_c = self.channels();
        let src_color = self.layout.color_channels();
        let mut out = Vec::with_capacity(self.width * self.height * layout.channels());

        for px in self.data.chunks_exact(src_c) {
            let (r, g, b) = if src_color == 1 {
                (px[0], px[0], px[0])
            } else {
                (px[0], px[1], px[2])
            };
            let alpha = if self.layout.has_alpha() { px[src_c - 1] } else { 255 };

            match layout {
                PixelLayout::Gray => out.push(luma(r, g, b)),
                PixelLayout::GrayAlpha => out.extend_from_slice(&[luma(r, g, b), alpha]),
                PixelLayout::Rgb => out.extend_from_slice(&[r, g, b]),
                PixelLayout::Rgba => out.extend_from_slice(&[r, g, b, alpha]),
            }
        }

        PixelBuffer {
            width: self.width,
            height: self.height,
            layout,
            data: out,
        }
    }
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    if r == g && g == b {
        return r;
    }
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114 + 500) / 1000) as u8
}
