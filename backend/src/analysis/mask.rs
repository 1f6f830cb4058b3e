use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use ndarray::Array2;

/// Binary pixel mask indexed `[row, column]`; 1 marks a flagged pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiseaseMask {
    cells: Array2<u8>,
}

impl DiseaseMask {
    pub fn from_array(cells: Array2<u8>) -> Self {
        Self {
            cells: cells.mapv(|v| u8::from(v > 0)),
        }
    }

    /// Flags every sample strictly greater than `threshold`.
    pub fn threshold(gray: &GrayImage, threshold: u8) -> Self {
        let (width, height) = gray.dimensions();
        Self::from_array(Array2::from_shape_fn(
            (height as usize, width as usize),
            |(row, col)| u8::from(gray.get_pixel(col as u32, row as u32)[0] > threshold),
        ))
    }

    /// (height, width)
    pub fn shape(&self) -> (usize, usize) {
        self.cells.dim()
    }

    pub fn pixel_count(&self) -> usize {
        self.cells.len()
    }

    pub fn flagged_count(&self) -> usize {
        self.cells.iter().filter(|&&v| v > 0).count()
    }

    pub fn is_flagged(&self, row: usize, col: usize) -> bool {
        self.cells[[row, col]] > 0
    }

    /// Reads a mask back from an image; any non-zero sample is flagged.
    pub fn from_image(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self::from_array(Array2::from_shape_fn(
            (height as usize, width as usize),
            |(row, col)| image.get_pixel(col as u32, row as u32)[0],
        ))
    }

    /// Morphological closing with a square `kernel`x`kernel` structuring element.
    /// Samples outside the image never contribute to either pass.
    pub fn close(&self, kernel: usize) -> Self {
        let radius = u8::try_from(kernel / 2).unwrap_or(u8::MAX);
        Self::from_image(&morphology::close(&self.to_image(), Norm::LInf, radius))
    }

    /// Renders the mask as a black/white image (flagged pixels are 255).
    pub fn to_image(&self) -> GrayImage {
        let (rows, cols) = self.shape();
        GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
            Luma([if self.is_flagged(y as usize, x as usize) { 255 } else { 0 }])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn threshold_is_strictly_greater() {
        let gray = GrayImage::from_fn(3, 1, |x, _| Luma([[164, 165, 166][x as usize]]));
        let mask = DiseaseMask::threshold(&gray, 165);
        assert_eq!(mask.flagged_count(), 1);
        assert!(mask.is_flagged(0, 2));
    }

    #[test]
    fn closing_fills_small_holes() {
        let mut cells = Array2::from_elem((9, 9), 1u8);
        cells[[4, 4]] = 0;
        cells[[4, 5]] = 0;
        let closed = DiseaseMask::from_array(cells).close(5);
        assert_eq!(closed.flagged_count(), 81);
    }

    #[test]
    fn closing_keeps_isolated_pixel_and_empty_mask() {
        let mut cells = Array2::zeros((10, 10));
        cells[[5, 5]] = 1;
        let closed = DiseaseMask::from_array(cells).close(5);
        assert_eq!(closed.flagged_count(), 1);
        assert!(closed.is_flagged(5, 5));

        let empty = DiseaseMask::from_array(Array2::zeros((4, 4))).close(5);
        assert_eq!(empty.flagged_count(), 0);
    }

    #[test]
    fn closing_bridges_narrow_gap_between_blocks() {
        let cells = array![
            [1, 1, 0, 1, 1],
            [1, 1, 0, 1, 1],
            [1, 1, 0, 1, 1],
        ];
        let closed = DiseaseMask::from_array(cells).close(3);
        assert_eq!(closed.flagged_count(), 15);
    }

    #[test]
    fn closing_reaches_image_border() {
        let mut cells = Array2::from_elem((6, 6), 1u8);
        cells[[0, 0]] = 0;
        cells[[0, 1]] = 0;
        let closed = DiseaseMask::from_array(cells).close(5);
        assert_eq!(closed.flagged_count(), 36);
    }

    #[test]
    fn image_round_trip_keeps_flags() {
        let mask = DiseaseMask::from_array(array![[0, 1, 0], [1, 1, 0]]);
        assert_eq!(DiseaseMask::from_image(&mask.to_image()), mask);
    }

    #[test]
    fn from_array_normalises_to_binary() {
        let mask = DiseaseMask::from_array(array![[0, 255], [7, 0]]);
        assert_eq!(mask.flagged_count(), 2);
        assert_eq!(mask.to_image().get_pixel(0, 1)[0], 255);
        assert_eq!(mask.shape(), (2, 2));
    }
}
