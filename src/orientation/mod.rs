mod euler;
mod fusion;

pub use euler::EulerXyz;
pub use fusion::{OrientationFusion, OrientationState};
