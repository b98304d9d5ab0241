/// Monochrome framebuffer, one byte per pixel, row-major.
///
/// Pixels only ever hold 0 (background) or 1 (foreground).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Framebuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw pixel values, `width * height` of them.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Get the state of a pixel (true = on, false = off).
    ///
    /// Panics if the coordinate is outside the framebuffer.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of range");
        self.pixels[y * self.width + x] != 0
    }

    /// Iterates over the rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.pixels.chunks_exact(self.width)
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|&p| p == 0)
    }

    pub(crate) fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Flips a pixel and returns its previous value.
    pub(crate) fn toggle(&mut self, x: usize, y: usize) -> u8 {
        let pixel = &mut self.pixels[y * self.width + x];
        let prior = *pixel;
        *pixel ^= 1;
        prior
    }

    #[cfg(test)]
    pub(crate) fn fill(&mut self) {
        self.pixels.fill(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_reports_prior_value() {
        let mut fb = Framebuffer::new(4, 2);

        assert_eq!(fb.toggle(3, 1), 0);
        assert!(fb.pixel(3, 1));
        assert_eq!(fb.toggle(3, 1), 1);
        assert!(!fb.pixel(3, 1));
        assert!(fb.is_blank());
    }

    #[test]
    fn rows_are_width_sized() {
        let mut fb = Framebuffer::new(3, 2);
        fb.toggle(0, 1);

        let rows: Vec<&[u8]> = fb.rows().collect();
        assert_eq!(rows, vec![&[0, 0, 0][..], &[1, 0, 0][..]]);
    }

    #[test]
    fn clear_blanks_everything() {
        let mut fb = Framebuffer::new(8, 8);
        fb.fill();
        assert!(!fb.is_blank());

        fb.clear();
        assert!(fb.is_blank());
    }
}
