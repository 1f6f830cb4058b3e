//! Contrast-limited adaptive histogram equalisation.
//!
//! The image is split into a grid of tiles. Each tile gets its own equalisation
//! lookup table built from a clipped histogram, and every output pixel blends
//! the tables of the four nearest tile centres bilinearly.

use image::GrayImage;

use super::config::EnhancementConfig;

const BINS: usize = 256;

pub fn equalize_adaptive(gray: &GrayImage, config: &EnhancementConfig) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }

    let tiles_x = config.tile_grid[0].clamp(1, width) as usize;
    let tiles_y = config.tile_grid[1].clamp(1, height) as usize;
    let tile_w = width as f32 / tiles_x as f32;
    let tile_h = height as f32 / tiles_y as f32;

    let mut histograms = vec![[0u32; BINS]; tiles_x * tiles_y];
    let mut areas = vec![0u32; tiles_x * tiles_y];
    for (x, y, pixel) in gray.enumerate_pixels() {
        let tx = ((x as f32 / tile_w) as usize).min(tiles_x - 1);
        let ty = ((y as f32 / tile_h) as usize).min(tiles_y - 1);
        histograms[ty * tiles_x + tx][pixel[0] as usize] += 1;
        areas[ty * tiles_x + tx] += 1;
    }

    let luts: Vec<[u8; BINS]> = histograms
        .iter_mut()
        .zip(&areas)
        .map(|(hist, &area)| {
            clip_histogram(hist, clip_limit(config.clip_limit, area));
            build_lut(hist, area)
        })
        .collect();

    let mut out = GrayImage::new(width, height);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let value = gray.get_pixel(x, y)[0] as usize;

        let txf = x as f32 / tile_w - 0.5;
        let tx1 = txf.floor() as isize;
        let xa = txf - tx1 as f32;
        let tx2 = ((tx1 + 1) as usize).min(tiles_x - 1);
        let tx1 = tx1.max(0) as usize;

        let tyf = y as f32 / tile_h - 0.5;
        let ty1 = tyf.floor() as isize;
        let ya = tyf - ty1 as f32;
        let ty2 = ((ty1 + 1) as usize).min(tiles_y - 1);
        let ty1 = ty1.max(0) as usize;

        let lut = |tx: usize, ty: usize| luts[ty * tiles_x + tx][value] as f32;
        let top = lut(tx1, ty1) * (1.0 - xa) + lut(tx2, ty1) * xa;
        let bottom = lut(tx1, ty2) * (1.0 - xa) + lut(tx2, ty2) * xa;
        let blended = top * (1.0 - ya) + bottom * ya;

        pixel[0] = blended.round().clamp(0.0, 255.0) as u8;
    }
    out
}

fn clip_limit(clip: f32, area: u32) -> u32 {
    ((clip * area as f32 / BINS as f32) as u32).max(1)
}

/// Caps every bin at `limit` and spreads the excess back evenly.
fn clip_histogram(hist: &mut [u32; BINS], limit: u32) {
    let mut clipped = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            clipped += *bin - limit;
            *bin = limit;
        }
    }

    let batch = clipped / BINS as u32;
    let mut residual = clipped as usize % BINS;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (BINS / residual).max(1);
        let mut i = 0;
        while i < BINS && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }
}

fn build_lut(hist: &[u32; BINS], area: u32) -> [u8; BINS] {
    let mut lut = [0u8; BINS];
    if area == 0 {
        return lut;
    }
    let scale = (BINS - 1) as f32 / area as f32;
    let mut sum = 0u32;
    for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
        sum += count;
        *entry = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}
