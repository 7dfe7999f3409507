//! The single-keyframe extraction primitive.
//!
//! The orchestration layer treats extraction as opaque: given a video, a
//! timestamp and a destination, a [`FrameExtractor`] either leaves a
//! complete image at the destination or returns an error. [`FfmpegExtractor`]
//! is the production implementation; tests substitute their own.
//!
//! Implementations must never leave a partial file at the destination
//! itself, because success is later judged purely by its existence.
//! [`FfmpegExtractor`] encodes into [`staging_path`] and renames the
//! finished file into place.

use std::{fs, path::Path};

use ffmpeg_next::{
    codec::context::Context as CodecContext,
    format::Pixel,
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    Rational,
};
use image::{ImageFormat, RgbImage};

use crate::{error::StillcutError, plan::staging_path, timestamp::Timestamp};

/// Extracts one still image from a video.
///
/// Implementations must be [`Send`] and [`Sync`]: the pooled dispatcher
/// calls a shared extractor from several worker threads at once.
pub trait FrameExtractor: Send + Sync {
    /// Write the frame at `timestamp` of `video` to `destination`.
    ///
    /// # Errors
    ///
    /// Any error means no usable file was produced.
    fn extract(
        &self,
        video: &Path,
        timestamp: Timestamp,
        destination: &Path,
    ) -> Result<(), StillcutError>;
}

/// FFmpeg-backed extractor writing JPEG keyframes.
///
/// Every call opens its own demuxer and decoder, so concurrent calls share
/// nothing but the read-only source file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegExtractor {
    _private: (),
}

impl FfmpegExtractor {
    /// Initialise FFmpeg (idempotent) and create the extractor.
    ///
    /// # Errors
    ///
    /// Returns [`StillcutError::FfmpegError`] if the libraries fail to
    /// initialise.
    pub fn new() -> Result<Self, StillcutError> {
        ffmpeg_next::init()?;
        Ok(Self { _private: () })
    }
}

impl FrameExtractor for FfmpegExtractor {
    fn extract(
        &self,
        video: &Path,
        timestamp: Timestamp,
        destination: &Path,
    ) -> Result<(), StillcutError> {
        let image = decode_frame_at(video, timestamp)?;

        let staging = staging_path(destination);
        let written = image
            .save_with_format(&staging, ImageFormat::Jpeg)
            .map_err(StillcutError::from)
            .and_then(|()| fs::rename(&staging, destination).map_err(StillcutError::from));

        if written.is_err() {
            let _ = fs::remove_file(&staging);
        }
        written
    }
}

/// Decode the first frame whose presentation time is at or after `timestamp`.
fn decode_frame_at(video: &Path, timestamp: Timestamp) -> Result<RgbImage, StillcutError> {
    let mut input_context =
        ffmpeg_next::format::input(&video).map_err(|error| StillcutError::FileOpen {
            path: video.to_path_buf(),
            reason: error.to_string(),
        })?;

    let (stream_index, time_base, mut decoder) = {
        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(StillcutError::NoVideoStream)?;
        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        (stream.index(), stream.time_base(), decoder_context.decoder().video()?)
    };

    let width = decoder.width();
    let height = decoder.height();
    let mut scaler = ScalingContext::get(
        decoder.format(),
        width,
        height,
        Pixel::RGB24,
        width,
        height,
        ScalingFlags::BILINEAR,
    )?;

    // Container-level seek is in AV_TIME_BASE (microseconds); it lands on
    // the nearest keyframe at or before the target.
    let seek_position = i64::try_from(timestamp.as_duration().as_micros()).unwrap_or(i64::MAX);
    input_context.seek(seek_position, ..seek_position)?;

    let target_pts = to_stream_timestamp(timestamp, time_base);
    let mut decoded_frame = VideoFrame::empty();
    let mut rgb_frame = VideoFrame::empty();

    for (stream, packet) in input_context.packets() {
        if stream.index() != stream_index {
            continue;
        }
        decoder.send_packet(&packet)?;

        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            if decoded_frame.pts().unwrap_or(0) >= target_pts {
                scaler.run(&decoded_frame, &mut rgb_frame)?;
                return frame_to_image(&rgb_frame, width, height);
            }
        }
    }

    decoder.send_eof()?;
    while decoder.receive_frame(&mut decoded_frame).is_ok() {
        if decoded_frame.pts().unwrap_or(0) >= target_pts {
            scaler.run(&decoded_frame, &mut rgb_frame)?;
            return frame_to_image(&rgb_frame, width, height);
        }
    }

    Err(StillcutError::TimestampBeyondEnd(timestamp))
}

fn to_stream_timestamp(timestamp: Timestamp, time_base: Rational) -> i64 {
    let numerator = f64::from(time_base.numerator());
    let denominator = f64::from(time_base.denominator());
    if numerator == 0.0 {
        return 0;
    }
    (timestamp.as_secs_f64() * denominator / numerator) as i64
}

/// Copy an RGB24 frame into a tightly packed image, dropping row padding.
fn frame_to_image(rgb_frame: &VideoFrame, width: u32, height: u32) -> Result<RgbImage, StillcutError> {
    let stride = rgb_frame.stride(0);
    let row_bytes = width as usize * 3;
    let data = rgb_frame.data(0);

    let buffer = if stride == row_bytes {
        data[..row_bytes * height as usize].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_bytes]);
        }
        buffer
    };

    RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        StillcutError::VideoDecodeError(
            "Failed to construct RGB image from decoded frame data".to_string(),
        )
    })
}
