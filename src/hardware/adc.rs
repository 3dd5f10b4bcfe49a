///! ADC sample representation
///!
///! # Design
///!
///! The converter delivers unsigned 12-bit codes into a DMA buffer of [SAMPLE_BUFFER_SIZE]
///! samples. Codes are kept raw in the capture buffers and only scaled to volts when analyzed.
///!
///! When a reference input is scanned together with the signal, the DMA buffer holds both
///! channels interleaved, reference first. [deinterleave] splits such a scan into the signal
///! block and the mean reference code.
use super::design_parameters::{ADC_FULL_SCALE, ADC_VREF, SAMPLE_BUFFER_SIZE};

/// One capture block of raw ADC codes.
pub type SampleBlock = [u16; SAMPLE_BUFFER_SIZE];

/// A two channel scan: reference codes at even, signal codes at odd indices.
pub type InterleavedBlock = [u16; 2 * SAMPLE_BUFFER_SIZE];

/// A type representing an ADC sample.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AdcCode(pub u16);

impl From<AdcCode> for f32 {
    /// Convert raw ADC codes to voltage levels.
    ///
    /// # Note
    /// This does not account for any gain or offset of the analog input stage.
    fn from(code: AdcCode) -> f32 {
        code.0 as f32 * ADC_VREF / ADC_FULL_SCALE as f32
    }
}

/// Split an interleaved scan.
///
/// # Args
/// * `scan` - The raw two channel scan.
/// * `signal` - Receives the signal channel.
///
/// # Returns
/// The mean code of the reference channel.
pub fn deinterleave(scan: &InterleavedBlock, signal: &mut SampleBlock) -> AdcCode {
    let mut sum = 0u32;
    for (pair, sample) in scan.chunks_exact(2).zip(signal.iter_mut()) {
        sum += pair[0] as u32;
        *sample = pair[1];
    }
    AdcCode((sum / SAMPLE_BUFFER_SIZE as u32) as u16)
}
