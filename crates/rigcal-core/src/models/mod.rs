//! Camera model building blocks.
//!
//! Every rig camera is a [`PinholeCamera`]: [`Pinhole`] projection, then
//! [`BrownConrady5`] distortion, then [`FxFyCxCySkew`] intrinsics.
//! [`CameraParams`] is its serializable form.

mod camera;
mod distortion;
mod params;

pub use camera::*;
pub use distortion::*;
pub use params::*;
