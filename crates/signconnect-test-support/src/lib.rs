//! Test support utilities for signconnect.
//!
//! Provides mocks, synthetic image builders, and utilities for testing
//! the recognition and training pipelines.
//!
//! # Example
//!
//! ```
//! use signconnect_test_support::{HandBuilder, MockHandDetector, SyntheticImageBuilder};
//!
//! // Encoded frame the service can decode
//! let frame = SyntheticImageBuilder::png_bytes(&SyntheticImageBuilder::solid(32, 32, [200, 40, 0]));
//!
//! // Detector that always reports one right hand
//! let detector = MockHandDetector::fixed(vec![HandBuilder::right().at(0.4, 0.6).build()]);
//! # let _ = (frame, detector);
//! ```

mod builders;
mod mocks;

pub use builders::{HandBuilder, SyntheticImageBuilder};
pub use mocks::{MockHandDetector, MockProgressSink, MockResultOutput, MockSignClassifier};
