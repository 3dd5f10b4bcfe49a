use signal_generator::{Generator, MAX_AMPLITUDE_MV};

/// Source of the ADC sampling rate.
///
/// The sample rate is derived from the configured interval, so a stopped or unsynchronized
/// clock (interval of zero) yields a rate of zero and all derived frequencies become zero.
pub trait SampleClock {
    /// The configured ADC sampling interval in microseconds.
    fn configured_sample_interval_us(&self) -> f64;

    /// The DAC update frequency in Hertz, informational only.
    fn current_update_frequency_hz(&self) -> u32;

    /// The ADC sampling rate in Hertz.
    fn sample_rate(&self) -> f32 {
        let interval = self.configured_sample_interval_us();
        if interval.is_finite() && interval > 0.0 {
            (1e6 / interval) as f32
        } else {
            0.0
        }
    }
}

impl SampleClock for Generator {
    fn configured_sample_interval_us(&self) -> f64 {
        self.adc_sampling_interval_us() as f64
    }

    fn current_update_frequency_hz(&self) -> u32 {
        self.update_frequency_hz()
    }
}

/// An output whose peak amplitude can be adjusted while running.
pub trait AmplitudeControl {
    /// Set the peak output amplitude in millivolts.
    fn set_peak_amplitude_mv(&mut self, millivolts: u16);
}

impl AmplitudeControl for Generator {
    /// Out-of-range values are clamped. An unchanged amplitude keeps the waveform running.
    fn set_peak_amplitude_mv(&mut self, millivolts: u16) {
        let millivolts = millivolts.min(MAX_AMPLITUDE_MV);
        if self.config().amplitude == millivolts {
            return;
        }
        if let Err(e) = self.set_amplitude(millivolts) {
            log::warn!("Failed to set DAC amplitude: {e}");
        }
    }
}

/// A free running sample clock not tied to the DAC.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FixedClock {
    pub interval_us: f64,
}

impl SampleClock for FixedClock {
    fn configured_sample_interval_us(&self) -> f64 {
        self.interval_us
    }

    fn current_update_frequency_hz(&self) -> u32 {
        0
    }
}

impl AmplitudeControl for FixedClock {
    /// There is no output to adjust.
    fn set_peak_amplitude_mv(&mut self, _millivolts: u16) {}
}
