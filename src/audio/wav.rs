//! WAV reading and atomic writing using hound
//!
//! Buffers are `frames × channels` arrays of f32. Integer input of any bit
//! depth is normalized to [-1.0, 1.0); output is always 32-bit float.

use crate::error::{AggregateError, Result};
use ndarray::Array2;
use std::path::Path;
use tracing::debug;

/// Sample rate every output file is expected to have
pub const EXPECTED_SAMPLE_RATE: u32 = 44_100;

/// Channel count every output file is expected to have
pub const EXPECTED_CHANNELS: u16 = 2;

/// Read a WAV file into a `frames × channels` buffer
///
/// Mono files come back as a single-column buffer.
pub fn read_wav(path: &Path) -> Result<(Array2<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|e| AggregateError::decode_error(path, format!("Failed to open WAV: {}", e)))?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(AggregateError::decode_error(path, "WAV header declares zero channels"));
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| AggregateError::decode_error(path, e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| AggregateError::decode_error(path, e.to_string()))?
        }
    };

    // A truncated final frame is dropped rather than rejected
    let frames = samples.len() / channels;
    let mut samples = samples;
    samples.truncate(frames * channels);

    let buffer = Array2::from_shape_vec((frames, channels), samples)
        .map_err(|e| AggregateError::decode_error(path, e.to_string()))?;

    debug!(
        "Read {} ({} frames, {} ch, {} Hz)",
        path.display(),
        frames,
        channels,
        spec.sample_rate
    );
    Ok((buffer, spec.sample_rate))
}

/// Read only the header of a WAV file: (sample rate, channels)
pub fn probe_wav(path: &Path) -> Result<(u32, u16)> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| AggregateError::decode_error(path, format!("Failed to open WAV: {}", e)))?;
    let spec = reader.spec();
    Ok((spec.sample_rate, spec.channels))
}

/// Write a buffer as 32-bit float WAV without ever exposing a partial file
///
/// Samples go to `<name>.wav.tmp` next to the destination, which is renamed
/// into place once the writer is finalized. Parent directories are created.
pub fn write_wav_atomic(path: &Path, buffer: &Array2<f32>, sample_rate: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| AggregateError::output_error(parent, e))?;
    }

    let temp_path = path.with_extension("wav.tmp");
    if let Err(e) = write_float_wav(&temp_path, buffer, sample_rate) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }

    std::fs::rename(&temp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        AggregateError::output_error(path, e)
    })?;

    debug!("Wrote {}", path.display());
    Ok(())
}

fn write_float_wav(path: &Path, buffer: &Array2<f32>, sample_rate: u32) -> Result<()> {
    let output_error = |reason: String| AggregateError::OutputError {
        path: path.to_path_buf(),
        reason,
    };

    let spec = hound::WavSpec {
        channels: buffer.ncols() as u16,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| output_error(format!("Failed to create WAV file: {}", e)))?;

    // Row-major iteration yields interleaved frames
    for sample in buffer.iter() {
        writer
            .write_sample(*sample)
            .map_err(|e| output_error(format!("Failed to write sample: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| output_error(format!("Failed to finalize WAV: {}", e)))
}
