//! A wrapper around the 64x32 monochrome framebuffer plus a dirty flag the
//! rendering collaborator polls to know when to redraw
use std::ops::Index;

pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 32;

pub struct Graphics {
    buffer: [bool; WIDTH * HEIGHT],
    dirty: bool, // set whenever the buffer changes, cleared by the renderer
}

impl Graphics {
    pub fn new() -> Self {
        Graphics {
            buffer: [false; WIDTH * HEIGHT],
            dirty: false,
        }
    }

    pub fn len(&self) -> usize {
        WIDTH * HEIGHT
    }

    /// Always false, the framebuffer has a fixed size
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Given x and y coordinate for a pixel in the buffer, return the corresponding
    /// index of that pixel in the buffer. Coordinates wrap around the screen edges
    pub fn get_graphics_idx(x: u8, y: u8) -> usize {
        let column = x as usize % WIDTH;
        let row = y as usize % HEIGHT;

        row * WIDTH + column
    }

    /// Return whether the pixel at the (wrapped) coordinate is set
    pub fn pixel(&self, x: u8, y: u8) -> bool {
        self.buffer[Self::get_graphics_idx(x, y)]
    }

    /// XOR `value` onto the pixel at the (wrapped) coordinate. Returns true if
    /// a pixel went from set to clear, which is what the draw op reports in VF
    pub fn xor_set(&mut self, x: u8, y: u8, value: bool) -> bool {
        if !value {
            return false;
        }

        let idx = Self::get_graphics_idx(x, y);
        let was_set = self.buffer[idx];
        self.buffer[idx] = !was_set;
        self.dirty = true;

        was_set
    }

    pub fn clear(&mut self) {
        self.buffer = [false; WIDTH * HEIGHT];
        self.dirty = true;
    }

    /// Row-major view of the whole framebuffer
    pub fn pixels(&self) -> &[bool] {
        &self.buffer
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

impl Default for Graphics {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<usize> for Graphics {
    type Output = bool;

    #[inline]
    fn index(&self, idx: usize) -> &Self::Output {
        &self.buffer[idx]
    }
}
