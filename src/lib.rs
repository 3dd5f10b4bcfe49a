#![cfg_attr(not(test), no_std)]

pub mod analyzer;
pub mod command;
pub mod hardware;
pub mod instrument;
pub mod settings;

#[cfg(test)]
pub mod testing;

pub use analyzer::{Analyzer, AnalyzerConfig, HarmonicComponent, WaveformInfo, WaveformType};
pub use instrument::{Instrument, QueryKind, Report};
pub use settings::Settings;
