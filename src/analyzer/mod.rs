//! Waveform analysis of captured sample blocks
//!
//! A block passes through amplitude statistics, the spectrum, classification and, for
//! periodic waveforms, phase and harmonic extraction. The [Analyzer] owns the spectrum scratch
//! so that no allocation happens per block.
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::hardware::design_parameters::{
    DC_DOMINANCE_RATIO, HARMONIC_FLOOR, NOISE_FLOOR, SAMPLE_BUFFER_SIZE,
};
use crate::hardware::SampleBlock;

pub mod classify;
pub mod frequency_map;
pub mod measure;
pub mod spectrum;

pub use classify::{classify, Classification, Fundamental};
pub use frequency_map::{map_fft_to_input, map_input_to_fft};

use spectrum::Spectrum;

#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The samples do not form exactly one block.
    #[error("Invalid block length")]
    InvalidLength,
}

/// Classified waveform shape.
///
/// The numeric codes are part of the reporting interface.
#[repr(u8)]
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    IntoPrimitive,
    TryFromPrimitive,
    strum::AsRefStr,
    strum::Display,
)]
pub enum WaveformType {
    #[strum(serialize = "DC")]
    Dc = 0,
    Sine = 1,
    Square = 2,
    Triangle = 3,
    #[default]
    Unknown = 255,
}

impl WaveformType {
    /// Whether phase and harmonics are meaningful for this shape.
    pub fn is_periodic(&self) -> bool {
        matches!(self, Self::Sine | Self::Square | Self::Triangle)
    }
}

/// Analysis thresholds.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Fundamental amplitudes below this classify as [WaveformType::Unknown].
    pub noise_floor: f32,
    /// DC magnitude exceeding the fundamental by this factor classifies as [WaveformType::Dc].
    pub dc_ratio: f32,
    /// Harmonics below this fraction of the fundamental are reported as absent.
    pub harmonic_floor: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            noise_floor: NOISE_FLOOR,
            dc_ratio: DC_DOMINANCE_RATIO,
            harmonic_floor: HARMONIC_FLOOR,
        }
    }
}

/// A harmonic of the fundamental. All zero if the harmonic is absent.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct HarmonicComponent {
    /// Input-domain frequency in Hz.
    pub frequency: f32,
    /// Unnormalized spectral magnitude.
    pub amplitude: f32,
    /// Phase relative to the fundamental, `(-pi, pi]`.
    pub phase: f32,
    /// Amplitude relative to the fundamental.
    pub relative_amplitude: f32,
}

/// The result of analyzing one block.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct WaveformInfo {
    pub waveform_type: WaveformType,
    /// Input-domain frequency in Hz.
    pub frequency: f32,
    /// Peak to peak voltage.
    pub vpp: f32,
    /// Mean voltage.
    pub mean: f32,
    /// RMS voltage, including the mean.
    pub rms: f32,
    /// Spectral phase of the fundamental bin in radians, `(-pi, pi]`.
    pub phase: f32,
    pub third_harmonic: HarmonicComponent,
    pub fifth_harmonic: HarmonicComponent,
}

pub struct Analyzer {
    spectrum: Spectrum<SAMPLE_BUFFER_SIZE>,
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            spectrum: Spectrum::default(),
            config,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: AnalyzerConfig) {
        self.config = config;
    }

    /// The spectrum of the most recently analyzed block.
    pub fn spectrum(&self) -> &Spectrum<SAMPLE_BUFFER_SIZE> {
        &self.spectrum
    }

    /// Analyze a block sampled at `sample_rate` Hz.
    ///
    /// # Note
    /// A non-positive sample rate reports zero frequencies.
    pub fn analyze(&mut self, block: &SampleBlock, sample_rate: f32) -> WaveformInfo {
        let levels = measure::levels(block);
        self.spectrum.compute(block);
        let class = classify(&self.spectrum, &self.config, sample_rate);

        let mut info = WaveformInfo {
            waveform_type: class.waveform_type,
            frequency: class.frequency,
            vpp: levels.vpp,
            mean: levels.mean,
            rms: levels.rms,
            ..Default::default()
        };

        match class.fundamental {
            Some(fundamental) if class.waveform_type.is_periodic() && class.frequency > 0.0 => {
                info.phase = self.spectrum.phase(fundamental.index);
                [info.third_harmonic, info.fifth_harmonic] = measure::harmonics(
                    &self.spectrum,
                    fundamental,
                    sample_rate,
                    self.config.harmonic_floor,
                );
            }
            _ => log::trace!("No harmonics for {}", class.waveform_type),
        }

        info
    }

    /// Analyze a block of arbitrary length.
    ///
    /// # Returns
    /// [Error::InvalidLength] unless the slice holds exactly one block.
    pub fn analyze_slice(
        &mut self,
        samples: &[u16],
        sample_rate: f32,
    ) -> Result<WaveformInfo, Error> {
        let block: &SampleBlock = samples.try_into().map_err(|_| Error::InvalidLength)?;
        Ok(self.analyze(block, sample_rate))
    }

    /// Phase of `b` relative to `a` at the input frequency `frequency`, in `(-pi, pi]`.
    ///
    /// Both blocks are assumed to be sampled simultaneously at `sample_rate`.
    pub fn phase_difference(
        &mut self,
        a: &SampleBlock,
        b: &SampleBlock,
        frequency: f32,
        sample_rate: f32,
    ) -> Option<f32> {
        let fft_hz = map_input_to_fft(frequency);
        self.spectrum.compute(a);
        let phase_a = measure::spectral_phase(&self.spectrum, fft_hz, sample_rate)?;
        self.spectrum.compute(b);
        let phase_b = measure::spectral_phase(&self.spectrum, fft_hz, sample_rate)?;
        Some(measure::phase_difference(phase_b, phase_a))
    }
}
