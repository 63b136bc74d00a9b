//! Corpus source port for labeled training images.

use image::DynamicImage;

/// One training image and the label of the folder it came from.
#[derive(Debug, Clone)]
pub struct LabeledImage {
    /// Sign label (name of the class folder).
    pub label: String,
    /// Path of the image, for logging.
    pub path: String,
    /// Decoded image data.
    pub image: DynamicImage,
}

/// Port for enumerating a labeled image corpus.
pub trait CorpusSource: Send + Sync {
    /// Returns an iterator over the corpus images.
    ///
    /// # Errors
    ///
    /// Individual items may be errors if an image fails to load; the training
    /// pipeline logs and skips them.
    fn samples(&self) -> Box<dyn Iterator<Item = anyhow::Result<LabeledImage>> + Send + '_>;

    /// Returns the total number of candidate images, if known.
    fn count_hint(&self) -> Option<usize>;
}
