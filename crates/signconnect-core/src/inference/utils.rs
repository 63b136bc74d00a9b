//! Shared inference utilities.

// Allow common ML code patterns
#![allow(clippy::cast_possible_truncation)]

use image::RgbImage;

/// Sigmoid activation function.
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Resizes a square RGB image to `size` x `size` and flattens it to NHWC
/// floats in `[0, 1]`, the input layout of the MediaPipe graphs.
pub fn square_to_input(square: &RgbImage, size: usize) -> Vec<f32> {
    let side = size as u32;
    let resized =
        image::imageops::resize(square, side, side, image::imageops::FilterType::Triangle);

    resized
        .pixels()
        .flat_map(|p| p.0.map(|c| f32::from(c) / 255.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.999);
        assert!(sigmoid(-10.0) < 0.001);
    }

    #[test]
    fn test_square_to_input_is_nhwc_unit_range() {
        let mut square = RgbImage::new(4, 4);
        for p in square.pixels_mut() {
            *p = Rgb([255, 0, 51]);
        }

        let input = square_to_input(&square, 2);
        assert_eq!(input.len(), 2 * 2 * 3);
        // Channels are interleaved per pixel
        assert!((input[0] - 1.0).abs() < 1e-6);
        assert!(input[1].abs() < 1e-6);
        assert!((input[2] - 0.2).abs() < 1e-6);
        assert!((input[3] - 1.0).abs() < 1e-6);
    }
}
