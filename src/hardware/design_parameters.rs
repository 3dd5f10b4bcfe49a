use fugit::MillisDurationU32;

/// The ADC reference voltage in volts.
pub const ADC_VREF: f32 = 3.3;

/// The number of ADC codes spanning the reference voltage (12-bit converter).
pub const ADC_FULL_SCALE: u32 = 1 << 12;

// The capture block size. Spectral analysis requires a power of two.
pub const SAMPLE_BUFFER_SIZE_LOG2: u8 = 10;
pub const SAMPLE_BUFFER_SIZE: usize = 1 << SAMPLE_BUFFER_SIZE_LOG2;

/// The default time to wait for a capture completion signal.
pub const CAPTURE_TIMEOUT: MillisDurationU32 = MillisDurationU32::from_ticks(500);

/// Fundamental amplitudes (volts, unnormalized spectrum) below this are considered noise.
pub const NOISE_FLOOR: f32 = 5.0;

/// A DC bin exceeding the fundamental by this factor makes the signal DC.
pub const DC_DOMINANCE_RATIO: f32 = 5.0;

/// Harmonic peaks below this fraction of the fundamental are discarded.
pub const HARMONIC_FLOOR: f32 = 0.05;
