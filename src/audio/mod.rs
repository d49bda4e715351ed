//! Audio I/O and buffer arithmetic

pub mod mix;
pub mod wav;

pub use mix::{ensure_stereo, is_silent, sum_stems};
pub use wav::{
    probe_wav, read_wav, write_wav_atomic, EXPECTED_CHANNELS, EXPECTED_SAMPLE_RATE,
};
