//! Run-time settings
//!
//! Settings are exchanged as JSON. Missing fields take their defaults, so a partial document
//! only overrides what it names.
use fugit::MillisDurationU32;
use serde::{Deserialize, Serialize};
use signal_generator::{AdcSync, Generator};

use crate::analyzer::{Analyzer, AnalyzerConfig};
use crate::hardware::design_parameters::CAPTURE_TIMEOUT;
use crate::hardware::{CaptureController, CaptureMode};
use crate::instrument::Instrument;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid settings document")]
    JsonDe(serde_json_core::de::Error),
    #[error("Settings buffer too small")]
    JsonSer(serde_json_core::ser::Error),
    #[error(transparent)]
    Dac(#[from] signal_generator::Error),
}

impl From<serde_json_core::de::Error> for Error {
    fn from(e: serde_json_core::de::Error) -> Self {
        Self::JsonDe(e)
    }
}

impl From<serde_json_core::ser::Error> for Error {
    fn from(e: serde_json_core::ser::Error) -> Self {
        Self::JsonSer(e)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Capture strategy.
    pub capture: CaptureMode,

    /// Time to wait for a capture completion in milliseconds.
    pub capture_timeout_ms: u32,

    /// Analysis thresholds.
    pub analyzer: AnalyzerConfig,

    /// DAC output waveform.
    pub dac: signal_generator::Config,

    /// ADC sample clock synchronization.
    pub adc_sync: AdcSync,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            capture: CaptureMode::default(),
            capture_timeout_ms: CAPTURE_TIMEOUT.ticks(),
            analyzer: AnalyzerConfig::default(),
            dac: signal_generator::Config::default(),
            adc_sync: AdcSync::default(),
        }
    }
}

impl Settings {
    pub fn from_json(data: &[u8]) -> Result<Self, Error> {
        let (settings, _) = serde_json_core::from_slice::<Self>(data)?;
        log::info!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    /// Serialize into `buffer`, returning the number of bytes written.
    pub fn to_json(&self, buffer: &mut [u8]) -> Result<usize, Error> {
        Ok(serde_json_core::to_slice(self, buffer)?)
    }

    pub fn capture_timeout(&self) -> MillisDurationU32 {
        MillisDurationU32::from_ticks(self.capture_timeout_ms)
    }

    /// Construct the instrument described by the settings.
    pub fn build(&self) -> Result<Instrument<CaptureMode, Generator>, Error> {
        let dac = Generator::new(self.dac, self.adc_sync)?;
        let capture = CaptureController::with_timeout(self.capture, self.capture_timeout());
        Ok(Instrument::new(capture, Analyzer::new(self.analyzer), dac))
    }
}
