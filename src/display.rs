// display size, in pixels
pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// Monochrome 64x32 framebuffer.
///
/// Only CLS and DRW write to it; everything else reads.
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    pixels: [bool; DISPLAY_WIDTH * DISPLAY_HEIGHT],
}

impl Framebuffer {
    pub fn new() -> Self {
        Framebuffer {
            pixels: [false; DISPLAY_WIDTH * DISPLAY_HEIGHT],
        }
    }

    /// Turn every pixel off.
    pub fn clear(&mut self) {
        self.pixels.fill(false);
    }

    /// State of the pixel at (x, y). Coordinates outside the display wrap.
    pub fn get_pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[index(x, y)]
    }

    /// All pixels, row by row.
    pub fn pixels(&self) -> &[bool] {
        &self.pixels
    }

    /// XOR a sprite onto the display with its top-left corner at (x, y).
    ///
    /// Each byte of `rows` is one 8-pixel row, most significant bit first.
    /// Every pixel wraps on both axes independently. Returns `true` if any
    /// pixel was switched off.
    pub fn draw_sprite(&mut self, x: u8, y: u8, rows: &[u8]) -> bool {
        let mut collision = false;

        for (row, bits) in rows.iter().enumerate() {
            for col in 0..8 {
                if bits & (0x80 >> col) == 0 {
                    continue;
                }

                let pixel = &mut self.pixels[index(x as usize + col, y as usize + row)];
                collision |= *pixel;
                *pixel ^= true;
            }
        }

        collision
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in self.pixels.chunks(DISPLAY_WIDTH) {
            let line: String = line.iter().map(|&p| if p { '#' } else { '.' }).collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[inline(always)]
fn index(x: usize, y: usize) -> usize {
    (y % DISPLAY_HEIGHT) * DISPLAY_WIDTH + (x % DISPLAY_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_set(fb: &Framebuffer) -> usize {
        fb.pixels().iter().filter(|&&p| p).count()
    }

    #[test]
    fn test_draw_and_erase() {
        let mut fb = Framebuffer::new();
        let sprite = [0xFFu8; 5];

        assert!(!fb.draw_sprite(0, 0, &sprite));
        assert_eq!(count_set(&fb), 40);
        for y in 0..5 {
            for x in 0..8 {
                assert!(fb.get_pixel(x, y));
            }
        }

        assert!(fb.draw_sprite(0, 0, &sprite));
        assert_eq!(count_set(&fb), 0);
    }

    #[test]
    fn test_msb_first() {
        let mut fb = Framebuffer::new();
        fb.draw_sprite(10, 3, &[0b1000_0001]);

        assert!(fb.get_pixel(10, 3));
        assert!(!fb.get_pixel(11, 3));
        assert!(fb.get_pixel(17, 3));
        assert_eq!(count_set(&fb), 2);
    }

    #[test]
    fn test_wrap_horizontal() {
        let mut fb = Framebuffer::new();
        fb.draw_sprite(60, 0, &[0xFF]);

        for x in 60..64 {
            assert!(fb.get_pixel(x, 0));
        }
        for x in 0..4 {
            assert!(fb.get_pixel(x, 0));
        }
        assert!(!fb.get_pixel(4, 0));
        assert!(!fb.get_pixel(59, 0));
        assert_eq!(count_set(&fb), 8);
    }

    #[test]
    fn test_wrap_vertical() {
        let mut fb = Framebuffer::new();
        fb.draw_sprite(0, 30, &[0x80, 0x80, 0x80, 0x80]);

        assert!(fb.get_pixel(0, 30));
        assert!(fb.get_pixel(0, 31));
        assert!(fb.get_pixel(0, 0));
        assert!(fb.get_pixel(0, 1));
        assert!(!fb.get_pixel(0, 2));
        assert_eq!(count_set(&fb), 4);
    }

    #[test]
    fn test_wrap_axes_independent() {
        // bottom-right corner: each axis wraps on its own
        let mut fb = Framebuffer::new();
        fb.draw_sprite(63, 31, &[0xC0, 0xC0]);

        assert!(fb.get_pixel(63, 31));
        assert!(fb.get_pixel(0, 31));
        assert!(fb.get_pixel(63, 0));
        assert!(fb.get_pixel(0, 0));
        assert_eq!(count_set(&fb), 4);
    }

    #[test]
    fn test_partial_collision() {
        let mut fb = Framebuffer::new();
        fb.draw_sprite(0, 0, &[0xF0]);

        // overlapping one pixel is enough to flag the collision
        assert!(fb.draw_sprite(3, 0, &[0x80]));
        assert!(!fb.get_pixel(3, 0));
        assert_eq!(count_set(&fb), 3);

        // drawing on empty pixels doesn't
        assert!(!fb.draw_sprite(20, 20, &[0xFF]));
    }

    #[test]
    fn test_clear() {
        let mut fb = Framebuffer::new();
        fb.draw_sprite(5, 5, &[0xFF; 15]);
        assert_ne!(count_set(&fb), 0);

        fb.clear();
        assert_eq!(count_set(&fb), 0);
    }
}
