//! Resample-then-register convenience pipeline.

use voxreg_core::filter::resample_to_size;
use voxreg_core::image::Volume;
use crate::error::Result;
use crate::registration::{RegistrationConfig, RegistrationEngine, RegistrationOutcome};

/// Bring `moving` onto the voxel count of `reference`, then register it.
///
/// `moving` is first resampled to the reference size, keeping its own
/// physical extent, origin and direction. The resampled volume is then
/// registered against `reference`, so the aligned volume in the outcome
/// lies on the reference grid.
pub fn align_to_reference(
    moving: &Volume,
    reference: &Volume,
    config: RegistrationConfig,
) -> Result<RegistrationOutcome> {
    align_with_engine(moving, reference, &RegistrationEngine::new(config))
}

/// [`align_to_reference`] with a preconfigured engine, so callbacks and
/// cancellation carry over.
pub fn align_with_engine(
    moving: &Volume,
    reference: &Volume,
    engine: &RegistrationEngine,
) -> Result<RegistrationOutcome> {
    let resized = if moving.size() == reference.size() {
        moving.clone()
    } else {
        tracing::info!(
            "Resampling moving image from {:?} to reference size {:?}",
            moving.size(),
            reference.size()
        );
        resample_to_size(moving, reference.size())?
    };
    engine.register(&resized, reference)
}
