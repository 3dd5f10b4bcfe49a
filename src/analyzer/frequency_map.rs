//! Piecewise-linear map between input frequency and the frequency observed in the spectrum
//!
//! The sample clock cannot follow the DAC update rate over the full output range, so higher
//! input frequencies alias into the spectrum at a fixed integer multiple per segment. Every
//! segment is `(upper input frequency, multiplier)`: an input up to the bound is observed at
//! `input * multiplier`. Inputs above the last bound use [OVERFLOW_MULTIPLIER].

/// `(upper input frequency in Hz, multiplier)` per segment, in increasing order.
pub const BREAKPOINTS: [(f32, f32); 12] = [
    (2600.0, 1.0),
    (6100.0, 2.0),
    (8100.0, 3.0),
    (11_100.0, 4.0),
    (14_100.0, 5.0),
    (17_100.0, 6.0),
    (19_600.0, 7.0),
    (21_600.0, 8.0),
    (25_100.0, 9.0),
    (26_600.0, 10.0),
    (29_600.0, 11.0),
    (32_100.0, 12.0),
];

/// The multiplier beyond the last segment.
pub const OVERFLOW_MULTIPLIER: f32 = BREAKPOINTS[BREAKPOINTS.len() - 1].1 + 1.0;

/// The frequency at which an input tone shows up in the spectrum.
pub fn map_input_to_fft(input_hz: f32) -> f32 {
    let multiplier = BREAKPOINTS
        .iter()
        .find(|(bound, _)| input_hz <= *bound)
        .map_or(OVERFLOW_MULTIPLIER, |(_, multiplier)| *multiplier);
    input_hz * multiplier
}

/// The input frequency producing a spectral peak at `fft_hz`.
///
/// Segments are matched by their observed upper bound `bound * multiplier`.
pub fn map_fft_to_input(fft_hz: f32) -> f32 {
    let multiplier = BREAKPOINTS
        .iter()
        .find(|(bound, multiplier)| fft_hz <= bound * multiplier)
        .map_or(OVERFLOW_MULTIPLIER, |(_, multiplier)| *multiplier);
    fft_hz / multiplier
}
