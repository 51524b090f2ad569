//! Aspect-preserving resize to a fixed width

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Dimensions of a `width` x `height` picture scaled to `target_width`
///
/// `new_height = target_width * height / width` with integer division,
/// never below 1. The product is computed in 64 bits.
pub fn target_dimensions(width: u32, height: u32, target_width: u32) -> (u32, u32) {
    if width == 0 {
        return (target_width, 1);
    }
    let new_height = u64::from(target_width) * u64::from(height) / u64::from(width);
    let new_height = u32::try_from(new_height).unwrap_or(u32::MAX).max(1);
    (target_width, new_height)
}

/// Scales `img` to `target_width` using bilinear (triangle) filtering
pub fn resize_to_width(img: &DynamicImage, target_width: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    let (new_width, new_height) = target_dimensions(width, height, target_width);
    img.resize_exact(new_width, new_height, FilterType::Triangle)
}
