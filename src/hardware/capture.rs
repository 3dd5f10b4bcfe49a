//! Capture buffer ownership handoff between the ADC DMA and the analysis task
//!
//! # Design
//!
//! Two sample blocks are owned by the [CaptureController]. At any time at most one of them is
//! the DMA target (the block being written by the producer), and a block is only ever handed to
//! the consumer after the producer has signaled completion for it. The ready flag of a block is
//! published after its contents and generation stamp are final, and it is revoked before the
//! producer is pointed at that block again. A consumer therefore never observes a block that is
//! still being written.
//!
//! ## Strategies
//!
//! Two capture strategies are provided behind [CaptureStrategy]:
//!
//! * [OneShot]: The producer stops after every completed block. Taking the block re-arms the
//!   producer into the other buffer.
//! * [DoubleBuffered]: The producer keeps running and alternates between both blocks. If the
//!   consumer has not taken a completed block by the time the producer needs it again, that
//!   block is dropped (its ready flag revoked) and the drop is counted. The consumer always
//!   sees the most recent completed block.
//!
//! ## Reference channel
//!
//! A producer scanning a reference input alongside the signal completes with
//! [CaptureController::on_reference_capture_complete]. The mean reference code travels with the
//! block and is available from [Capture::reference].
//!
//! ## Timeouts
//!
//! While a block is being acquired, a watchdog is armed at the first
//! [CaptureController::check_timeout] call. If no completion arrives within the configured
//! timeout, the capture is aborted and the controller returns to [CaptureState::Idle].
use fugit::{MillisDurationU32, TimerInstantU32};
use serde::{Deserialize, Serialize};

use super::adc::{AdcCode, SampleBlock};
use super::design_parameters::{CAPTURE_TIMEOUT, SAMPLE_BUFFER_SIZE};

/// Millisecond timestamps used by the capture watchdog.
pub type Instant = TimerInstantU32<1000>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A capture is in flight or a completed block has not been consumed.
    #[error("Capture hardware busy")]
    HardwareBusy,
    /// No completion was signaled within the timeout.
    #[error("Capture timed out")]
    CaptureTimeout,
}

/// Externally visible state of the capture.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum CaptureState {
    Idle,
    Capturing,
    Ready,
}

/// Decides where the producer goes after completing a block.
pub trait CaptureStrategy {
    /// The block index the producer continues with after `completed`, if any.
    fn next_target(&self, completed: usize) -> Option<usize>;

    /// Whether consuming a block re-arms a stopped producer.
    fn rearm_on_take(&self) -> bool;
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct OneShot;

impl CaptureStrategy for OneShot {
    fn next_target(&self, _completed: usize) -> Option<usize> {
        None
    }

    fn rearm_on_take(&self) -> bool {
        true
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DoubleBuffered;

impl CaptureStrategy for DoubleBuffered {
    fn next_target(&self, completed: usize) -> Option<usize> {
        Some(completed ^ 1)
    }

    fn rearm_on_take(&self) -> bool {
        false
    }
}

/// Run-time selectable capture strategy.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureMode {
    #[default]
    OneShot,
    DoubleBuffered,
}

impl CaptureStrategy for CaptureMode {
    fn next_target(&self, completed: usize) -> Option<usize> {
        match self {
            Self::OneShot => OneShot.next_target(completed),
            Self::DoubleBuffered => DoubleBuffered.next_target(completed),
        }
    }

    fn rearm_on_take(&self) -> bool {
        match self {
            Self::OneShot => OneShot.rearm_on_take(),
            Self::DoubleBuffered => DoubleBuffered.rearm_on_take(),
        }
    }
}

/// Event counters of the capture.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    /// Blocks completed by the producer.
    pub completed: u32,
    /// Completed blocks overwritten before being consumed.
    pub dropped: u32,
    /// Completion signals received while no capture was in flight.
    pub spurious: u32,
    /// Captures aborted by the watchdog.
    pub timeouts: u32,
}

struct Slot {
    samples: SampleBlock,
    reference: Option<AdcCode>,
    generation: u32,
    ready: bool,
}

impl Slot {
    const fn new() -> Self {
        Self {
            samples: [0; SAMPLE_BUFFER_SIZE],
            reference: None,
            generation: 0,
            ready: false,
        }
    }
}

/// A completed block lent to the consumer.
///
/// The controller is borrowed for the lifetime of the view, so the producer cannot be pointed at
/// the block while it is being read.
#[derive(Copy, Clone, Debug)]
pub struct Capture<'a> {
    samples: &'a SampleBlock,
    reference: Option<AdcCode>,
    generation: u32,
}

impl<'a> Capture<'a> {
    pub fn samples(&self) -> &'a SampleBlock {
        self.samples
    }

    /// The completion count at which this block was published.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// The mean reference channel code scanned with this block, if any.
    pub fn reference(&self) -> Option<AdcCode> {
        self.reference
    }
}

impl core::ops::Deref for Capture<'_> {
    type Target = SampleBlock;

    fn deref(&self) -> &SampleBlock {
        self.samples
    }
}

pub struct CaptureController<S> {
    slots: [Slot; 2],
    // The block currently written by the producer.
    target: Option<usize>,
    // The block the next start acquires into.
    next: usize,
    armed: bool,
    generation: u32,
    watchdog: Option<Instant>,
    timeout: MillisDurationU32,
    stats: CaptureStats,
    strategy: S,
}

impl<S: CaptureStrategy> CaptureController<S> {
    pub fn new(strategy: S) -> Self {
        Self::with_timeout(strategy, CAPTURE_TIMEOUT)
    }

    pub fn with_timeout(strategy: S, timeout: MillisDurationU32) -> Self {
        Self {
            slots: [Slot::new(), Slot::new()],
            target: None,
            next: 0,
            armed: false,
            generation: 0,
            watchdog: None,
            timeout,
            stats: CaptureStats::default(),
            strategy,
        }
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    /// The number of completions seen so far.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn set_timeout(&mut self, timeout: MillisDurationU32) {
        self.timeout = timeout;
    }

    pub fn state(&self) -> CaptureState {
        if self.slots.iter().any(|slot| slot.ready) {
            CaptureState::Ready
        } else if self.target.is_some() {
            CaptureState::Capturing
        } else {
            CaptureState::Idle
        }
    }

    /// Arm the producer.
    ///
    /// # Returns
    /// [Error::HardwareBusy] if a capture is in flight or a completed block awaits consumption.
    pub fn start_capture(&mut self) -> Result<(), Error> {
        if self.state() != CaptureState::Idle {
            return Err(Error::HardwareBusy);
        }
        self.target = Some(self.next);
        self.armed = true;
        self.watchdog = None;
        log::debug!("Capture started into block {}", self.next);
        Ok(())
    }

    /// Stop the producer. A block already completed stays available.
    pub fn stop(&mut self) {
        self.target = None;
        self.armed = false;
        self.watchdog = None;
    }

    /// The block the producer currently writes into, if any.
    pub fn dma_target(&mut self) -> Option<&mut SampleBlock> {
        let index = self.target?;
        Some(&mut self.slots[index].samples)
    }

    /// Signal that the producer has filled the current target block.
    ///
    /// # Returns
    /// False if no capture was in flight. The signal is then ignored.
    pub fn on_capture_complete(&mut self) -> bool {
        self.complete(None)
    }

    /// Signal completion of a block scanned together with the reference channel.
    ///
    /// # Args
    /// * `reference` - The mean reference code of the scan.
    pub fn on_reference_capture_complete(&mut self, reference: AdcCode) -> bool {
        self.complete(Some(reference))
    }

    fn complete(&mut self, reference: Option<AdcCode>) -> bool {
        let Some(completed) = self.target else {
            self.stats.spurious = self.stats.spurious.wrapping_add(1);
            log::warn!("Ignoring completion without capture in flight");
            return false;
        };

        let next = self.strategy.next_target(completed);
        if let Some(next) = next {
            let slot = &mut self.slots[next];
            if slot.ready {
                // The producer is about to overwrite an unconsumed block.
                slot.ready = false;
                self.stats.dropped = self.stats.dropped.wrapping_add(1);
                log::trace!("Dropping unconsumed block {}", slot.generation);
            }
        }

        self.generation = self.generation.wrapping_add(1);
        let slot = &mut self.slots[completed];
        slot.generation = self.generation;
        slot.reference = reference;
        slot.ready = true;

        self.target = next;
        self.next = completed ^ 1;
        self.watchdog = None;
        self.stats.completed = self.stats.completed.wrapping_add(1);
        true
    }

    /// Hand the completed block to the consumer.
    ///
    /// Returns `None` if no block is ready, in particular on a second call for the same block.
    pub fn take_ready_block(&mut self) -> Option<Capture<'_>> {
        let index = self.slots.iter().position(|slot| slot.ready)?;
        self.slots[index].ready = false;

        if self.target.is_none() && self.armed && self.strategy.rearm_on_take() {
            let next = index ^ 1;
            self.target = Some(next);
            self.next = next;
            self.watchdog = None;
        }

        let slot = &self.slots[index];
        Some(Capture {
            samples: &slot.samples,
            reference: slot.reference,
            generation: slot.generation,
        })
    }

    /// Check the in-flight capture against the timeout.
    ///
    /// # Args
    /// * `now` - The current time.
    pub fn check_timeout(&mut self, now: Instant) -> Result<(), Error> {
        if self.target.is_none() {
            self.watchdog = None;
            return Ok(());
        }

        let since = *self.watchdog.get_or_insert(now);
        match now.checked_duration_since(since) {
            Some(elapsed) if elapsed > self.timeout => {
                self.stop();
                self.stats.timeouts = self.stats.timeouts.wrapping_add(1);
                log::warn!("Capture timed out after {} ms", elapsed.to_millis());
                Err(Error::CaptureTimeout)
            }
            _ => Ok(()),
        }
    }
}
