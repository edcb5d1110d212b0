//! Tolerance constants for audio testing.

/// Floating point rounding errors (float WAV round trip, unity gain).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Gain and other simple sample math.
pub const DSP_EPSILON: f32 = 1e-4;

/// 16-bit quantization step size.
/// Use when reading fixtures written as 16-bit PCM.
pub const INT16_EPSILON: f32 = 1.0 / 32768.0;
