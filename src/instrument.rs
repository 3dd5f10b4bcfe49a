//! The acquisition and analysis loop
//!
//! An [Instrument] ties a [CaptureController], the [Analyzer] and a [SampleClock] together.
//! Requests for analysis are latched and served by the next block consumed in [Instrument::poll].
//! Blocks consumed without a pending request only re-arm the capture. A block scanned with the
//! reference channel sets the output amplitude, the reference voltage being the new
//! peak-to-peak voltage.
use serde::{Deserialize, Serialize};

use crate::analyzer::{Analyzer, WaveformInfo};
use crate::hardware::capture::Error;
use crate::hardware::{
    AmplitudeControl, CaptureController, CaptureState, CaptureStrategy, Instant, SampleClock,
};

/// What a requested report should contain.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::AsRefStr,
)]
pub enum QueryKind {
    #[strum(serialize = "ALL")]
    All,
    #[strum(serialize = "TYPE")]
    Type,
    #[strum(serialize = "FREQ")]
    Frequency,
    #[strum(serialize = "AMP")]
    Vpp,
}

/// An analysis result together with the request that caused it.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    pub query: QueryKind,
    /// Generation of the analyzed block.
    pub generation: u32,
    /// ADC sample rate the block was analyzed at.
    pub sample_rate: f32,
    /// DAC update frequency at the time of analysis.
    pub update_frequency: u32,
    pub info: WaveformInfo,
}

pub struct Instrument<S, C> {
    capture: CaptureController<S>,
    analyzer: Analyzer,
    clock: C,
    request: Option<QueryKind>,
    report: Option<Report>,
}

impl<S: CaptureStrategy, C: SampleClock + AmplitudeControl> Instrument<S, C> {
    pub fn new(capture: CaptureController<S>, analyzer: Analyzer, clock: C) -> Self {
        Self {
            capture,
            analyzer,
            clock,
            request: None,
            report: None,
        }
    }

    pub fn capture(&mut self) -> &mut CaptureController<S> {
        &mut self.capture
    }

    pub fn analyzer(&mut self) -> &mut Analyzer {
        &mut self.analyzer
    }

    pub fn clock(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Start acquiring if idle.
    pub fn start(&mut self) -> Result<(), Error> {
        match self.capture.state() {
            CaptureState::Idle => self.capture.start_capture(),
            _ => Ok(()),
        }
    }

    /// Request an analysis of the next consumed block. A newer request replaces a pending one.
    pub fn request_analysis(&mut self, query: QueryKind) {
        if let Some(pending) = self.request.replace(query) {
            log::debug!("Replacing pending {} request", pending.as_ref());
        }
    }

    pub fn pending_request(&self) -> Option<QueryKind> {
        self.request
    }

    /// Service the capture.
    ///
    /// # Args
    /// * `now` - The current time for the capture watchdog.
    ///
    /// # Returns
    /// Whether a block was consumed.
    pub fn poll(&mut self, now: Instant) -> Result<bool, Error> {
        self.capture.check_timeout(now)?;

        let Some(block) = self.capture.take_ready_block() else {
            return Ok(false);
        };

        if let Some(reference) = block.reference() {
            let millivolts = f32::from(reference) * 1000.0 / 2.0;
            self.clock.set_peak_amplitude_mv(millivolts as u16);
        }

        if let Some(query) = self.request.take() {
            let sample_rate = self.clock.sample_rate();
            let info = self.analyzer.analyze(block.samples(), sample_rate);
            log::info!("{} {:.1} Hz {:.3} Vpp", info.waveform_type, info.frequency, info.vpp);
            self.report = Some(Report {
                query,
                generation: block.generation(),
                sample_rate,
                update_frequency: self.clock.current_update_frequency_hz(),
                info,
            });
        }

        Ok(true)
    }

    /// Take the latest analysis report.
    pub fn take_report(&mut self) -> Option<Report> {
        self.report.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{AnalyzerConfig, WaveformType};
    use crate::hardware::{FixedClock, OneShot};
    use crate::testing::*;

    fn instrument() -> Instrument<OneShot, FixedClock> {
        Instrument::new(
            CaptureController::new(OneShot),
            Analyzer::new(AnalyzerConfig::default()),
            FixedClock {
                interval_us: 9.765625,
            },
        )
    }

    fn acquire(instrument: &mut Instrument<OneShot, FixedClock>) {
        let block = sine_block(10.0, 1000.0, 2048.0, 0.0);
        if let Some(target) = instrument.capture().dma_target() {
            target.copy_from_slice(&block);
        }
        instrument.capture().on_capture_complete();
    }

    #[test]
    fn serves_request() {
        let mut instrument = instrument();
        instrument.start().unwrap();
        assert!(!instrument.poll(Instant::from_ticks(0)).unwrap());

        instrument.request_analysis(QueryKind::Type);
        instrument.request_analysis(QueryKind::Frequency);
        acquire(&mut instrument);
        assert!(instrument.poll(Instant::from_ticks(1)).unwrap());
        assert_eq!(instrument.pending_request(), None);

        let report = instrument.take_report().unwrap();
        assert_eq!(report.query, QueryKind::Frequency);
        assert_eq!(report.generation, 1);
        assert_eq!(report.sample_rate, 102_400.0);
        assert_eq!(report.info.waveform_type, WaveformType::Sine);
        assert!(isclose(report.info.frequency, 1000.0, 1e-6, 0.0));
        assert!(instrument.take_report().is_none());
    }

    #[test]
    fn unrequested_blocks_rearm() {
        let mut instrument = instrument();
        instrument.start().unwrap();
        acquire(&mut instrument);
        assert!(instrument.poll(Instant::from_ticks(0)).unwrap());
        assert!(instrument.take_report().is_none());
        assert_eq!(instrument.capture().state(), CaptureState::Capturing);
        instrument.start().unwrap();
    }

    #[test]
    fn timeout_reported() {
        let mut instrument = instrument();
        instrument.start().unwrap();
        instrument.poll(Instant::from_ticks(0)).unwrap();
        assert_eq!(instrument.poll(Instant::from_ticks(10_000)), Err(Error::CaptureTimeout));
        assert_eq!(instrument.capture().state(), CaptureState::Idle);
        instrument.start().unwrap();
        assert_eq!(instrument.capture().state(), CaptureState::Capturing);
    }

    #[test]
    fn query_names() {
        assert_eq!("ALL".parse::<QueryKind>(), Ok(QueryKind::All));
        assert_eq!("AMP".parse::<QueryKind>(), Ok(QueryKind::Vpp));
        assert!("VPP".parse::<QueryKind>().is_err());
        assert_eq!(QueryKind::Frequency.as_ref(), "FREQ");
    }
}
