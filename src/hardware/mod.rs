//! Acquisition-side abstractions of the ADC/DAC pair
mod adc;
pub mod capture;
mod clock;
pub mod design_parameters;

pub use adc::*;
pub use capture::{
    Capture, CaptureController, CaptureMode, CaptureState, CaptureStats, CaptureStrategy,
    DoubleBuffered, Instant, OneShot,
};
pub use clock::*;
