//! Tracks a constellation of orbiting objects relative to a moving observer
//! and renders them as a globe view or an AR viewfinder overlay.

pub mod config;
pub mod hud;
pub mod orientation;
pub mod propagation;
pub mod pubsub;
pub mod readiness;
pub mod scene;
pub mod sensor;
pub mod transform;
pub mod view;
