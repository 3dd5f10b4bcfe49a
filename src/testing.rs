use core::f64::consts::PI;

use crate::hardware::design_parameters::SAMPLE_BUFFER_SIZE;
use crate::hardware::SampleBlock;

pub fn isclose(a: f32, b: f32, rtol: f32, atol: f32) -> bool {
    (a - b).abs() <= a.abs().max(b.abs()) * rtol + atol
}

/// Quantized sum of `(cycles per block, amplitude, phase)` tones around `offset`, in ADC codes.
pub fn tones(offset: f64, tones: &[(f64, f64, f64)]) -> SampleBlock {
    let mut block = [0; SAMPLE_BUFFER_SIZE];
    for (i, x) in block.iter_mut().enumerate() {
        let t = i as f64 / SAMPLE_BUFFER_SIZE as f64;
        let v = offset
            + tones
                .iter()
                .map(|(cycles, amplitude, phase)| {
                    amplitude * (2.0 * PI * cycles * t + phase).sin()
                })
                .sum::<f64>();
        *x = v.round().clamp(0.0, 4095.0) as u16;
    }
    block
}

pub fn sine_block(cycles: f64, amplitude: f64, offset: f64, phase: f64) -> SampleBlock {
    tones(offset, &[(cycles, amplitude, phase)])
}

/// 50% duty square wave, high first.
pub fn square_block(cycles: usize, low: u16, high: u16) -> SampleBlock {
    let period = SAMPLE_BUFFER_SIZE / cycles;
    let mut block = [0; SAMPLE_BUFFER_SIZE];
    for (i, x) in block.iter_mut().enumerate() {
        *x = if i % period < period / 2 { high } else { low };
    }
    block
}

/// Symmetric triangle wave rising from `low` first.
pub fn triangle_block(cycles: usize, low: u16, high: u16) -> SampleBlock {
    let period = SAMPLE_BUFFER_SIZE / cycles;
    let span = (high - low) as f64;
    let mut block = [0; SAMPLE_BUFFER_SIZE];
    for (i, x) in block.iter_mut().enumerate() {
        let t = (i % period) as f64 / period as f64;
        let v = if t < 0.5 {
            low as f64 + span * 2.0 * t
        } else {
            high as f64 - span * (2.0 * t - 1.0)
        };
        *x = v.round() as u16;
    }
    block
}
