#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Image could not be decoded: {0}")]
    ImageDecode(String),
    #[error("Mask shape {mask_height}x{mask_width} does not match image shape {height}x{width}")]
    ShapeMismatch {
        height: usize,
        width: usize,
        mask_height: usize,
        mask_width: usize,
    },
    #[error("Empty image provided")]
    EmptyImage,
    #[error("Image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}
