//! Pixel-based spectrogram rendering
//!
//! Frames render into an owned RGBA buffer (`Canvas`), one frame per pixel
//! column, frequency bins stacked bottom-to-top. The terminal backend
//! converts the canvas to half-block cells at draw time.

pub mod ramp;

pub use ramp::ColorRamp;

use tracing::debug;

use crate::frames::{FrameStore, FrequencyFrame};

/// Owned RGBA pixel buffer, 4 bytes per pixel.
pub struct Canvas {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: vec![0u8; width * height * 4],
            width,
            height,
        }
    }

    /// Resize the canvas, reallocating only when the buffer is too small.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        let needed = width * height * 4;
        if self.data.len() < needed {
            self.data.resize(needed, 0);
        }
    }

    /// Clear the visible region to opaque black.
    pub fn clear(&mut self) {
        let len = self.width * self.height * 4;
        for px in self.data[..len].chunks_exact_mut(4) {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            px[3] = 255;
        }
    }

    #[inline]
    pub fn put_pixel(&mut self, x: usize, y: usize, (r, g, b): (u8, u8, u8)) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y * self.width + x) * 4;
        self.data[idx] = r;
        self.data[idx + 1] = g;
        self.data[idx + 2] = b;
        self.data[idx + 3] = 255;
    }

    #[inline]
    pub fn get_pixel(&self, x: usize, y: usize) -> (u8, u8, u8) {
        if x >= self.width || y >= self.height {
            return (0, 0, 0);
        }
        let idx = (y * self.width + x) * 4;
        (self.data[idx], self.data[idx + 1], self.data[idx + 2])
    }

    /// Shift the raster left by `columns` pixels, row by row. The vacated
    /// columns on the right keep their previous contents and are expected to
    /// be repainted by the caller.
    pub fn shift_left(&mut self, columns: usize) {
        if columns == 0 || columns >= self.width {
            return;
        }
        let row_bytes = self.width * 4;
        let shift_bytes = columns * 4;
        for row in 0..self.height {
            let start = row * row_bytes;
            self.data[start..start + row_bytes].copy_within(shift_bytes.., 0);
        }
    }
}

/// Pixel geometry derived from the analysis configuration: which bin range
/// is visible and how many columns fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportGeometry {
    pub width: usize,
    pub min_bin: usize,
    pub max_bin: usize,
}

impl ViewportGeometry {
    /// `bin = floor(freq / (sample_rate / fft_size))`, clamped to the
    /// analyser's bin count.
    pub fn new(
        width: usize,
        fft_size: usize,
        sample_rate: u32,
        min_frequency: f64,
        max_frequency: f64,
    ) -> Self {
        let bin_width = sample_rate as f64 / fft_size as f64;
        let bin_count = fft_size / 2;
        let min_bin = ((min_frequency / bin_width).floor() as usize).min(bin_count - 1);
        let max_bin = ((max_frequency / bin_width).floor() as usize).clamp(min_bin + 1, bin_count);
        Self {
            width,
            min_bin,
            max_bin,
        }
    }

    pub fn height(&self) -> usize {
        self.max_bin - self.min_bin
    }
}

/// Maps a contiguous range of the frame store onto canvas columns.
///
/// Two paint paths: `render_live` shifts the raster one column left and
/// paints only the newest frame; `render_range` repaints the whole visible
/// range after a scrub jump or a geometry change.
pub struct Viewport {
    pub geometry: ViewportGeometry,
    pub ramp: ColorRamp,
    in_flight: bool,
}

impl Viewport {
    pub fn new(geometry: ViewportGeometry, ramp: ColorRamp) -> Self {
        Self {
            geometry,
            ramp,
            in_flight: false,
        }
    }

    /// Swap geometry after an analysis-parameter change. The caller is
    /// expected to resize the canvas and re-render the visible range.
    pub fn set_geometry(&mut self, geometry: ViewportGeometry) {
        self.geometry = geometry;
    }

    /// Append the newest frame as the rightmost column, scrolling the
    /// existing raster left by one. O(canvas) copy, no store traversal.
    pub fn render_live(&mut self, canvas: &mut Canvas, frame: &FrequencyFrame) {
        if self.in_flight {
            debug!("render already in flight, dropping live column");
            return;
        }
        self.in_flight = true;
        canvas.shift_left(1);
        let right_edge = canvas.width.saturating_sub(1);
        self.paint_column(canvas, right_edge, frame);
        self.in_flight = false;
    }

    /// Repaint the columns for store indices `[start, end)`, clamped to
    /// `[0, store.len())`. A request wider than the available history renders
    /// only the available prefix. Returns false when the request was dropped
    /// because another render was in flight.
    pub fn render_range(
        &mut self,
        canvas: &mut Canvas,
        store: &FrameStore,
        start: usize,
        end: usize,
    ) -> bool {
        if self.in_flight {
            debug!("render already in flight, dropping range request");
            return false;
        }
        self.in_flight = true;

        let end = end.min(store.len());
        let start = start.min(end);

        canvas.clear();
        for (column, index) in (start..end).enumerate() {
            // indices are in-range by construction
            if let Ok(frame) = store.get(index) {
                self.paint_column(canvas, column, frame);
            }
        }

        self.in_flight = false;
        true
    }

    fn paint_column(&self, canvas: &mut Canvas, x: usize, frame: &FrequencyFrame) {
        let geo = &self.geometry;
        let height = geo.height();
        for bin in geo.min_bin..geo.max_bin {
            let raw = frame.get(bin).copied().unwrap_or(0);
            let v = raw as f32 / 255.0;
            let y = height - 1 - (bin - geo.min_bin);
            canvas.put_pixel(x, y, self.ramp.color_for(v));
        }
    }
}
