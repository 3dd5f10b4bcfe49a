#![no_std]

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// The number of DAC codes making up one waveform period.
pub const WAVEFORM_SAMPLES: usize = 256;

/// The largest 12-bit DAC code.
pub const DAC_MAX_CODE: u16 = 4095;

/// The DAC reference voltage in millivolts.
pub const DAC_VREF_MV: u16 = 3300;

/// The largest peak amplitude the DAC can produce around mid-scale.
pub const MAX_AMPLITUDE_MV: u16 = DAC_VREF_MV / 2;

/// Types of signals that can be generated.
#[repr(u8)]
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    IntoPrimitive,
    TryFromPrimitive,
)]
pub enum Signal {
    Sine = 0,
    Square = 1,
    Triangle = 2,
}

impl Signal {
    /// Map a phase (full `i32` range is one turn) to a full-scale sample.
    #[inline]
    fn map(&self, x: i32) -> i32 {
        match self {
            Self::Sine => idsp::cossin(x).1,
            Self::Square => {
                if x.is_negative() {
                    -i32::MAX
                } else {
                    i32::MAX
                }
            }
            Self::Triangle => {
                i32::MIN.wrapping_add(x.saturating_abs().wrapping_shl(1))
            }
        }
    }
}

/// Represents the errors that can occur when attempting to configure the signal generator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The provided frequency is out-of-range.
    #[error("Invalid frequency")]
    Frequency,
    /// The ADC sampling multiplier must be non-zero.
    #[error("Invalid sampling multiplier")]
    Multiplier,
    /// The signal code does not name a waveform.
    #[error("Invalid signal type")]
    Signal,
}

impl From<num_enum::TryFromPrimitiveError<Signal>> for Error {
    fn from(_: num_enum::TryFromPrimitiveError<Signal>) -> Self {
        Self::Signal
    }
}

/// Basic configuration for a generated signal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The signal type that should be generated. See [Signal] variants.
    pub signal: Signal,

    /// The frequency of the generated signal in Hertz.
    pub frequency: u32,

    /// The peak amplitude of the output signal in millivolts, limited to [MAX_AMPLITUDE_MV].
    pub amplitude: u16,

    /// Swing between 0 V and twice the amplitude instead of around mid-scale.
    pub zero_based: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            signal: Signal::Sine,
            frequency: 1000,
            amplitude: 1000,
            zero_based: false,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), Error> {
        if self.frequency == 0 {
            return Err(Error::Frequency);
        }
        Ok(())
    }

    /// The configuration with the amplitude clamped to what the DAC can output.
    pub fn clamped(self) -> Self {
        Self {
            amplitude: self.amplitude.min(MAX_AMPLITUDE_MV),
            ..self
        }
    }

    /// Synthesize one period of DAC codes.
    pub fn build(&self) -> Result<Table, Error> {
        self.validate()?;

        // Peak amplitude in DAC codes relative to mid-scale.
        let amp = self.clamped().amplitude as f32 / MAX_AMPLITUDE_MV as f32
            * (DAC_MAX_CODE as f32 / 2.0);
        let mid = DAC_MAX_CODE as f32 / 2.0;

        let mut codes = [0; WAVEFORM_SAMPLES];
        for (i, code) in codes.iter_mut().enumerate() {
            let phase = (((i as u64) << 32) / WAVEFORM_SAMPLES as u64) as u32;
            let x = self.signal.map(phase as i32) as f32 / i32::MAX as f32;
            let value = if self.zero_based {
                (x + 1.0) * amp
            } else {
                mid + x * amp
            };
            *code = (value as i32).clamp(0, DAC_MAX_CODE as i32) as u16;
        }

        Ok(Table(codes))
    }
}

/// ADC sample clock synchronization to the DAC update rate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdcSync {
    /// Derive the ADC sample clock from the DAC update rate.
    pub enabled: bool,

    /// ADC samples per DAC update.
    pub multiplier: u8,
}

impl Default for AdcSync {
    fn default() -> Self {
        Self {
            enabled: true,
            multiplier: 1,
        }
    }
}

/// One period of DAC codes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table([u16; WAVEFORM_SAMPLES]);

impl Table {
    pub fn codes(&self) -> &[u16; WAVEFORM_SAMPLES] {
        &self.0
    }
}

/// The DAC output stage: the active waveform table and the ADC clock derived from it.
#[derive(Clone, Debug)]
pub struct Generator {
    config: Config,
    sync: AdcSync,
    table: Table,
    index: usize,
}

impl Generator {
    /// Construct a new signal generator with some specific config.
    ///
    /// # Args
    /// * `config` - The waveform to output.
    /// * `sync` - The ADC sample clock synchronization.
    pub fn new(config: Config, sync: AdcSync) -> Result<Self, Error> {
        if sync.multiplier == 0 {
            return Err(Error::Multiplier);
        }
        let config = config.clamped();
        Ok(Self {
            table: config.build()?,
            config,
            sync,
            index: 0,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sync(&self) -> &AdcSync {
        &self.sync
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Replace the output waveform.
    ///
    /// # Note
    /// Output restarts at the beginning of the new period, as a DMA restart would.
    /// The amplitude is clamped to [MAX_AMPLITUDE_MV].
    pub fn update_waveform(&mut self, config: Config) -> Result<(), Error> {
        let config = config.clamped();
        self.table = config.build()?;
        self.config = config;
        self.index = 0;
        log::info!("DAC: {:?} {} Hz {} mV", config.signal, config.frequency, config.amplitude);
        Ok(())
    }

    pub fn set_signal(&mut self, signal: Signal) -> Result<(), Error> {
        self.update_waveform(Config {
            signal,
            ..self.config
        })
    }

    pub fn set_frequency(&mut self, frequency: u32) -> Result<(), Error> {
        self.update_waveform(Config {
            frequency,
            ..self.config
        })
    }

    pub fn set_amplitude(&mut self, amplitude: u16) -> Result<(), Error> {
        self.update_waveform(Config {
            amplitude,
            ..self.config
        })
    }

    pub fn set_sync(&mut self, sync: AdcSync) -> Result<(), Error> {
        if sync.multiplier == 0 {
            return Err(Error::Multiplier);
        }
        self.sync = sync;
        Ok(())
    }

    /// DAC codes output per second.
    pub fn update_frequency_hz(&self) -> u32 {
        self.config.frequency.saturating_mul(WAVEFORM_SAMPLES as u32)
    }

    /// The ADC sampling interval in microseconds, or zero if the ADC is not synchronized.
    pub fn adc_sampling_interval_us(&self) -> f32 {
        if !self.sync.enabled {
            return 0.0;
        }
        let rate = self.config.frequency as u64
            * WAVEFORM_SAMPLES as u64
            * self.sync.multiplier as u64;
        if rate == 0 {
            return 0.0;
        }
        1e6 / rate as f32
    }

    /// Generate a sequence of new DAC codes.
    ///
    /// # Args
    /// * `samples` - The location to store generated values into.
    pub fn generate(&mut self, samples: &mut [u16]) {
        for (sample, code) in samples.iter_mut().zip(self.by_ref()) {
            *sample = code;
        }
    }

    /// Fill `samples` with what a synchronized ADC records of the output.
    ///
    /// Every DAC code is held for `multiplier` ADC samples.
    pub fn capture(&mut self, samples: &mut [u16]) {
        let hold = self.sync.multiplier as usize;
        for chunk in samples.chunks_mut(hold) {
            let code = self.table.0[self.index];
            self.index = (self.index + 1) % WAVEFORM_SAMPLES;
            chunk.fill(code);
        }
    }
}

impl Iterator for Generator {
    type Item = u16;

    #[inline]
    fn next(&mut self) -> Option<u16> {
        let code = self.table.0[self.index];
        self.index = (self.index + 1) % WAVEFORM_SAMPLES;
        Some(code)
    }
}
