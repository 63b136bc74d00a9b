//! Hand landmarks and the fixed-layout keypoint vector fed to the classifier.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Landmarks per detected hand.
pub const LANDMARKS_PER_HAND: usize = 21;

/// Values per landmark (x, y, z).
pub const COORDS_PER_LANDMARK: usize = 3;

/// Values occupied by one hand in a [`KeypointVector`].
pub const HAND_SLOT_LEN: usize = LANDMARKS_PER_HAND * COORDS_PER_LANDMARK;

/// Total length of a [`KeypointVector`] (left slot + right slot).
pub const KEYPOINT_VECTOR_LEN: usize = 2 * HAND_SLOT_LEN;

/// Which of the subject's hands a detection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
    /// Subject's left hand, packed into `[0, 63)`.
    Left,
    /// Subject's right hand, packed into `[63, 126)`.
    Right,
}

impl Handedness {
    /// Returns the index range this hand occupies in a [`KeypointVector`].
    #[must_use]
    pub const fn slot(self) -> std::ops::Range<usize> {
        match self {
            Self::Left => 0..HAND_SLOT_LEN,
            Self::Right => HAND_SLOT_LEN..KEYPOINT_VECTOR_LEN,
        }
    }

    /// Returns the label the hand-tracking models use for this hand.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "Left",
            Self::Right => "Right",
        }
    }
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single normalized hand landmark.
///
/// `x` and `y` are normalized to the image width and height. `z` is depth
/// relative to the wrist, on roughly the same scale as `x`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// One hand found in a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedHand {
    /// The 21 hand landmarks, wrist first.
    pub landmarks: [Landmark; LANDMARKS_PER_HAND],
    /// Handedness reported by the detector.
    pub handedness: Handedness,
    /// Detector confidence for this hand (0.0 to 1.0).
    pub score: f32,
}

impl DetectedHand {
    #[must_use]
    pub const fn new(landmarks: [Landmark; LANDMARKS_PER_HAND], handedness: Handedness) -> Self {
        Self {
            landmarks,
            handedness,
            score: 1.0,
        }
    }

    /// Flattens the landmarks in point-major order: `x0, y0, z0, x1, ...`.
    #[must_use]
    pub fn flatten(&self) -> [f32; HAND_SLOT_LEN] {
        let mut out = [0.0; HAND_SLOT_LEN];
        for (chunk, lm) in out
            .chunks_exact_mut(COORDS_PER_LANDMARK)
            .zip(self.landmarks.iter())
        {
            chunk.copy_from_slice(&[lm.x, lm.y, lm.z]);
        }
        out
    }
}

/// Fixed-length hand pose descriptor.
///
/// Layout: `[0, 63)` left hand, `[63, 126)` right hand, each as 21 landmarks
/// flattened point-major. A hand that was not detected leaves its slot zero,
/// so an all-zero vector means no hand was found.
#[derive(Clone, Copy, PartialEq)]
pub struct KeypointVector([f32; KEYPOINT_VECTOR_LEN]);

impl KeypointVector {
    /// Returns the all-zero ("no hand") vector.
    #[must_use]
    pub const fn zeros() -> Self {
        Self([0.0; KEYPOINT_VECTOR_LEN])
    }

    /// Builds a vector from a slice, returning `None` unless it has exactly
    /// [`KEYPOINT_VECTOR_LEN`] values.
    #[must_use]
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        <[f32; KEYPOINT_VECTOR_LEN]>::try_from(values).ok().map(Self)
    }

    /// Returns true if no hand contributed to this vector.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }

    /// Returns the 63 values of one hand slot.
    #[must_use]
    pub fn hand(&self, handedness: Handedness) -> &[f32] {
        &self.0[handedness.slot()]
    }

    /// Returns true if the given hand slot holds any non-zero value.
    #[must_use]
    pub fn has_hand(&self, handedness: Handedness) -> bool {
        self.hand(handedness).iter().any(|v| *v != 0.0)
    }

    #[must_use]
    pub const fn as_array(&self) -> &[f32; KEYPOINT_VECTOR_LEN] {
        &self.0
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    fn write_hand(&mut self, hand: &DetectedHand) {
        self.0[hand.handedness.slot()].copy_from_slice(&hand.flatten());
    }
}

impl Default for KeypointVector {
    fn default() -> Self {
        Self::zeros()
    }
}

impl fmt::Debug for KeypointVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeypointVector")
            .field("left", &self.has_hand(Handedness::Left))
            .field("right", &self.has_hand(Handedness::Right))
            .finish()
    }
}

impl AsRef<[f32]> for KeypointVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// Result of packing detected hands into a [`KeypointVector`].
#[derive(Debug, Clone, PartialEq)]
pub struct Packed {
    /// The packed vector.
    pub vector: KeypointVector,
    /// Hands whose slot was already written by an earlier detection
    /// (`BothHandsSameLabel`). The later detection wins.
    pub collisions: Vec<Handedness>,
}

impl Packed {
    /// Returns true if two detections reported the same handedness.
    #[must_use]
    pub fn has_collision(&self) -> bool {
        !self.collisions.is_empty()
    }
}

/// Packs detected hands into a [`KeypointVector`].
///
/// Each hand lands in the slot of its reported handedness regardless of
/// detection order. If two hands report the same handedness the last one
/// overwrites the first and the collision is recorded on the result.
///
/// This is the only implementation of the slot rule; training and serving
/// both go through it.
#[must_use]
pub fn pack(hands: &[DetectedHand]) -> Packed {
    let mut vector = KeypointVector::zeros();
    let mut seen_left = false;
    let mut seen_right = false;
    let mut collisions = Vec::new();

    for hand in hands {
        let seen = match hand.handedness {
            Handedness::Left => &mut seen_left,
            Handedness::Right => &mut seen_right,
        };
        if *seen {
            collisions.push(hand.handedness);
        }
        *seen = true;
        vector.write_hand(hand);
    }

    Packed { vector, collisions }
}
