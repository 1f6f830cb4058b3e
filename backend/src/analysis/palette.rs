//! False-colour palette for the pseudo-thermal rendering.
//!
//! The lookup table is the tabulated "inferno" colour map (black through
//! purple and orange to pale yellow), sampled once per gray level.

use colorous::{Gradient, INFERNO};
use image::{GrayImage, Rgb, RgbImage};

pub struct Palette {
    lut: [[u8; 3]; 256],
}

impl Palette {
    pub fn inferno() -> Self {
        Self::from_gradient(INFERNO)
    }

    fn from_gradient(gradient: Gradient) -> Self {
        let mut lut = [[0u8; 3]; 256];
        for (level, entry) in lut.iter_mut().enumerate() {
            let colour = gradient.eval_rational(level, 256);
            *entry = [colour.r, colour.g, colour.b];
        }
        Self { lut }
    }

    pub fn color(&self, level: u8) -> [u8; 3] {
        self.lut[level as usize]
    }

    pub fn apply(&self, gray: &GrayImage) -> RgbImage {
        let (width, height) = gray.dimensions();
        RgbImage::from_fn(width, height, |x, y| Rgb(self.color(gray.get_pixel(x, y)[0])))
    }
}
