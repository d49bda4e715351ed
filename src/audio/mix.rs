//! Channel normalization and stem summation

use crate::error::{AggregateError, Result};
use ndarray::{s, Array2};
use std::path::Path;

/// Bring a buffer to two channels
///
/// Mono is duplicated into both channels; stereo passes through.
pub fn ensure_stereo(buffer: Array2<f32>, path: &Path) -> Result<Array2<f32>> {
    match buffer.ncols() {
        2 => Ok(buffer),
        1 => Ok(Array2::from_shape_fn((buffer.nrows(), 2), |(i, _)| {
            buffer[[i, 0]]
        })),
        channels => Err(AggregateError::UnsupportedChannels {
            path: path.to_path_buf(),
            channels,
        }),
    }
}

/// Sum buffers sample-wise, zero-padding each to the longest
///
/// Inputs are never modified. A single input is returned as an owned copy.
pub fn sum_stems(buffers: &[Array2<f32>]) -> Result<Array2<f32>> {
    let first = buffers.first().ok_or(AggregateError::EmptySum)?;
    if buffers.len() == 1 {
        return Ok(first.clone());
    }

    let channels = first.ncols();
    if let Some(other) = buffers.iter().find(|b| b.ncols() != channels) {
        return Err(AggregateError::ChannelMismatch {
            left: channels,
            right: other.ncols(),
        });
    }

    let frames = buffers.iter().map(|b| b.nrows()).max().unwrap_or(0);
    let mut out = Array2::<f32>::zeros((frames, channels));
    for buffer in buffers {
        let mut head = out.slice_mut(s![..buffer.nrows(), ..]);
        head += buffer;
    }
    Ok(out)
}

/// True when every sample is exactly zero
pub fn is_silent(buffer: &Array2<f32>) -> bool {
    buffer.iter().all(|&s| s == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_pads_shorter_buffer() {
        let long = Array2::<f32>::ones((100, 2));
        let short = Array2::<f32>::ones((50, 2));

        let result = sum_stems(&[long.clone(), short.clone()]).unwrap();

        assert_eq!(result.dim(), (100, 2));
        assert!(result.slice(s![..50, ..]).iter().all(|&v| (v - 2.0).abs() < 1e-6));
        assert!(result.slice(s![50.., ..]).iter().all(|&v| (v - 1.0).abs() < 1e-6));
        // inputs untouched
        assert!(long.iter().all(|&v| v == 1.0));
        assert!(short.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_sum_single_is_independent_copy() {
        let input = Array2::<f32>::from_elem((10, 2), 0.8);
        let mut result = sum_stems(std::slice::from_ref(&input)).unwrap();
        result[[0, 0]] = 0.0;
        assert_eq!(input[[0, 0]], 0.8);
    }

    #[test]
    fn test_sum_empty_fails() {
        assert!(matches!(sum_stems(&[]), Err(AggregateError::EmptySum)));
    }

    #[test]
    fn test_sum_channel_mismatch() {
        let stereo = Array2::<f32>::zeros((4, 2));
        let mono = Array2::<f32>::zeros((4, 1));
        assert!(matches!(
            sum_stems(&[stereo, mono]),
            Err(AggregateError::ChannelMismatch { left: 2, right: 1 })
        ));
    }

    #[test]
    fn test_ensure_stereo() {
        let mono = Array2::from_shape_vec((3, 1), vec![0.1_f32, 0.2, 0.3]).unwrap();
        let stereo = ensure_stereo(mono, Path::new("m.wav")).unwrap();
        assert_eq!(stereo.dim(), (3, 2));
        assert_eq!(stereo[[2, 0]], stereo[[2, 1]]);

        let surround = Array2::<f32>::zeros((3, 6));
        assert!(matches!(
            ensure_stereo(surround, Path::new("s.wav")),
            Err(AggregateError::UnsupportedChannels { channels: 6, .. })
        ));
    }

    #[test]
    fn test_is_silent() {
        assert!(is_silent(&Array2::<f32>::zeros((10, 2))));
        let mut buf = Array2::<f32>::zeros((10, 2));
        buf[[9, 1]] = 1e-9;
        assert!(!is_silent(&buf));
    }
}
