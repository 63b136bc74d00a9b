//! Synthetic image and hand builders for testing.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use signconnect_core::domain::{DetectedHand, Handedness, Landmark, LANDMARKS_PER_HAND};
use signconnect_core::ports::LabeledImage;

/// Builder for creating synthetic test images.
///
/// The images carry no real hands; pair them with a mock detector such as
/// `MockHandDetector::color_coded`.
pub struct SyntheticImageBuilder;

impl SyntheticImageBuilder {
    // === Decoded Images ===

    /// Creates a single-colour RGB image.
    #[must_use]
    pub fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    /// Creates a black frame (no hand under the colour-coded detector).
    #[must_use]
    pub fn blank(width: u32, height: u32) -> DynamicImage {
        Self::solid(width, height, [0, 0, 0])
    }

    /// Creates an image whose left half is black and right half is `color`.
    ///
    /// Useful for checking that frames are mirrored before detection.
    #[must_use]
    pub fn split(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgb([0, 0, 0])
            } else {
                Rgb(color)
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    /// Wraps an image as a corpus sample.
    #[must_use]
    pub fn labeled(label: &str, index: usize, image: DynamicImage) -> LabeledImage {
        LabeledImage {
            label: label.to_string(),
            path: format!("synthetic://{label}/{index}.png"),
            image,
        }
    }

    // === Encoded Bytes ===

    /// Encodes an image as PNG bytes.
    ///
    /// # Panics
    ///
    /// Panics if encoding fails, which does not happen for in-memory RGB images.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
        Self::encode(image, ImageFormat::Png).expect("PNG encoding")
    }

    /// Encodes an image as JPEG bytes.
    ///
    /// # Panics
    ///
    /// Panics if encoding fails, which does not happen for in-memory RGB images.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn jpeg_bytes(image: &DynamicImage) -> Vec<u8> {
        Self::encode(&DynamicImage::ImageRgb8(image.to_rgb8()), ImageFormat::Jpeg)
            .expect("JPEG encoding")
    }

    fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        image
            .write_to(&mut buf, format)
            .with_context(|| format!("Failed to encode {format:?}"))?;
        Ok(buf.into_inner())
    }

    /// Bytes that no decoder accepts.
    #[must_use]
    pub fn garbage_bytes() -> Vec<u8> {
        b"\x00\x01definitely not an image\xff".to_vec()
    }

    // === On-disk Corpora ===

    /// Writes `<root>/<label>/<label>_<i>.png` for every `(label, count, color)`.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or file cannot be written.
    pub fn write_corpus(root: &Path, classes: &[(&str, usize, [u8; 3])]) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for &(label, count, color) in classes {
            let dir = root.join(label);
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            for i in 0..count {
                let path = dir.join(format!("{label}_{i}.png"));
                Self::solid(16, 16, color)
                    .save(&path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                written.push(path);
            }
        }
        Ok(written)
    }
}

/// Builder for [`DetectedHand`] values.
///
/// Landmarks are laid out on a small fan around an anchor point so that no
/// two landmarks coincide.
#[derive(Debug, Clone)]
pub struct HandBuilder {
    handedness: Handedness,
    x: f32,
    y: f32,
    depth: f32,
    score: f32,
    overrides: Vec<(usize, Landmark)>,
}

impl HandBuilder {
    #[must_use]
    pub fn left() -> Self {
        Self::new(Handedness::Left)
    }

    #[must_use]
    pub fn right() -> Self {
        Self::new(Handedness::Right)
    }

    fn new(handedness: Handedness) -> Self {
        Self {
            handedness,
            x: 0.5,
            y: 0.5,
            depth: 0.0,
            score: 0.95,
            overrides: Vec::new(),
        }
    }

    /// Sets the wrist position.
    #[must_use]
    pub const fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Sets the depth of every landmark.
    #[must_use]
    pub const fn depth(mut self, z: f32) -> Self {
        self.depth = z;
        self
    }

    #[must_use]
    pub const fn score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    /// Replaces one landmark.
    #[must_use]
    pub fn landmark(mut self, index: usize, landmark: Landmark) -> Self {
        self.overrides.push((index, landmark));
        self
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn build(self) -> DetectedHand {
        let mut landmarks = [Landmark::default(); LANDMARKS_PER_HAND];
        for (i, lm) in landmarks.iter_mut().enumerate() {
            // Wrist at the anchor, then five fingers of four joints each
            let finger = i.saturating_sub(1) / 4;
            let joint = if i == 0 { 0 } else { (i - 1) % 4 + 1 };
            *lm = Landmark::new(
                self.x + (finger as f32 - 2.0) * 0.02,
                self.y - joint as f32 * 0.03,
                self.depth,
            );
        }
        for (index, landmark) in self.overrides {
            if let Some(slot) = landmarks.get_mut(index) {
                *slot = landmark;
            }
        }

        DetectedHand {
            landmarks,
            handedness: self.handedness,
            score: self.score,
        }
    }
}
