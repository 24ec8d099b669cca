// src/layout.rs
//! Packed texture addressing: one column per vertex, one row per baked frame.
//! Clips are stacked top to bottom in selection order with no gaps.

/// RGBA8.
pub const BYTES_PER_PIXEL: usize = 4;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextureLayout {
    width: u32,
    height: u32,
    total_pixels: usize,
    /// First row of each clip slot, in selection order.
    start_rows: Vec<u32>,
}

impl TextureLayout {
    /// Allocate rows for clips with the given bake frame counts.
    pub fn allocate<I>(vertex_count: usize, frame_counts: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        let width = vertex_count as u32;
        let mut start_rows = Vec::new();
        let mut row = 0u32;
        let mut total_pixels = 0usize;

        for frames in frame_counts {
            start_rows.push(row);
            row += frames;
            total_pixels += frames as usize * vertex_count;
        }

        Self { width, height: row, total_pixels, start_rows }
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }
    pub fn vertex_count(&self) -> usize { self.width as usize }
    pub fn clip_count(&self) -> usize { self.start_rows.len() }
    pub fn is_empty(&self) -> bool { self.height == 0 || self.width == 0 }

    /// Pixels actually occupied by baked frames.
    pub fn total_pixels(&self) -> usize { self.total_pixels }

    /// Pixels in the full `width x height` raster.
    pub fn texture_pixels(&self) -> usize { self.width as usize * self.height as usize }

    /// Size of one RGBA8 texture with this layout.
    pub fn estimated_bytes(&self) -> usize { self.texture_pixels() * BYTES_PER_PIXEL }

    pub fn start_row(&self, slot: usize) -> Option<u32> {
        self.start_rows.get(slot).copied()
    }

    pub fn start_rows(&self) -> &[u32] { &self.start_rows }

    /// Linear pixel index of `vertex` in `frame` of the clip starting at `start_row`.
    #[inline]
    pub fn pixel_index(&self, start_row: u32, frame: u32, vertex: usize) -> usize {
        let width = self.width as usize;
        start_row as usize * width + frame as usize * width + vertex
    }

    /// Same as `pixel_index`, addressed by clip slot.
    pub fn slot_pixel_index(&self, slot: usize, frame: u32, vertex: usize) -> Option<usize> {
        self.start_row(slot).map(|row| self.pixel_index(row, frame, vertex))
    }
}
