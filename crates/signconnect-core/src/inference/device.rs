//! Device selection for training and inference.

use candle_core::Device;
use tracing::info;

/// Returns the best available device.
///
/// Tries Metal, then CUDA, when the matching cargo feature is enabled and
/// falls back to CPU. Training and serving both call this, so a model is
/// fitted and served on the same kind of device by default.
#[must_use]
pub fn get_device() -> Device {
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => {
                info!("Using Metal device");
                return device;
            }
            Err(e) => tracing::debug!("Metal unavailable: {e}"),
        }
    }

    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(device) => {
                info!("Using CUDA device");
                return device;
            }
            Err(e) => tracing::debug!("CUDA unavailable: {e}"),
        }
    }

    info!("Using CPU device");
    Device::Cpu
}
