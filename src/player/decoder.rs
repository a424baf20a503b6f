//! File decoder, adapted from symphonia probe/decode plumbing to the
//! pull-based `read_frames(n)` / `seek(frame_index)` contract of §6's
//! external "File decoder" collaborator.
//!
//! Supported formats: MP3, FLAC, OGG Vorbis, WAV/PCM, AAC (in MP4
//! container), via symphonia's built-in codec/format registrations.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;

use crate::error::{Error, Result};

/// File decoder wrapping symphonia's probe/decode pipeline.
pub struct AudioDecoder {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: u16,
    frames_total: u64,
    time_base: Option<symphonia::core::units::TimeBase>,
    /// Interleaved samples decoded but not yet handed out by
    /// `read_frames`, carried across calls.
    carry: Vec<f32>,
}

impl AudioDecoder {
    /// Open a file by path, probing its format and locating the first
    /// audio track.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::FileNotFound(format!("{}: {}", path.display(), e)))?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension() {
            hint.with_extension(&ext.to_string_lossy());
        }

        let format_opts = FormatOptions {
            enable_gapless: true,
            ..Default::default()
        };
        let metadata_opts = MetadataOptions::default();

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &format_opts, &metadata_opts)
            .map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

        let reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::UnsupportedFormat("no audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| Error::Decode("unknown sample rate".to_string()))?;
        let channels = codec_params.channels.map(|c| c.count() as u16).unwrap_or(0);
        if channels == 0 {
            return Err(Error::UnsupportedFormat("zero channels".to_string()));
        }

        let time_base = codec_params.time_base;
        let frames_total = codec_params.n_frames.unwrap_or(0);

        let decoder_opts = DecoderOptions::default();
        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &decoder_opts)
            .map_err(|e| Error::Decode(e.to_string()))?;

        Ok(Self {
            reader,
            decoder,
            track_id,
            sample_rate,
            channels,
            frames_total,
            time_base,
            carry: Vec::new(),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Total frames, or 0 if the container didn't report one.
    pub fn frames_total(&self) -> u64 {
        self.frames_total
    }

    /// Seek to an absolute frame index in the file's own sample rate.
    pub fn seek(&mut self, frame_index: u64) -> Result<()> {
        let seconds = if self.sample_rate > 0 {
            frame_index as f64 / self.sample_rate as f64
        } else {
            0.0
        };
        let seek_to = SeekTo::Time {
            time: Time::from(seconds),
            track_id: Some(self.track_id),
        };
        self.reader
            .seek(SeekMode::Accurate, seek_to)
            .map_err(|e| Error::Decode(format!("seek failed: {e}")))?;
        self.decoder.reset();
        self.carry.clear();
        Ok(())
    }

    /// Read up to `frames` interleaved frames (each `channels()` samples
    /// wide). Returns fewer than requested only at end of stream; an
    /// empty result means EOF.
    pub fn read_frames(&mut self, frames: usize) -> Result<Vec<f32>> {
        let channels = self.channels as usize;
        let wanted_samples = frames * channels;

        while self.carry.len() < wanted_samples {
            match self.decode_next_packet()? {
                Some(mut samples) => self.carry.append(&mut samples),
                None => break,
            }
        }

        let take = wanted_samples.min(self.carry.len());
        let out = self.carry.drain(0..take).collect();
        Ok(out)
    }

    fn decode_next_packet(&mut self) -> Result<Option<Vec<f32>>> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(Error::Decode(e.to_string())),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(Error::Decode(e.to_string())),
            };

            return Ok(Some(Self::convert_to_f32(&decoded)));
        }
    }

    /// Convert any symphonia sample format to interleaved f32.
    fn convert_to_f32(buffer: &AudioBufferRef) -> Vec<f32> {
        match buffer {
            AudioBufferRef::F32(buf) => {
                let planes = buf.planes();
                let plane_slice = planes.planes();
                if plane_slice.is_empty() {
                    return Vec::new();
                }
                let frames = plane_slice[0].len();
                let mut output = Vec::with_capacity(frames * plane_slice.len());
                for frame in 0..frames {
                    for plane in plane_slice {
                        output.push(plane[frame]);
                    }
                }
                output
            }
            AudioBufferRef::S16(buf) => {
                let planes = buf.planes();
                let mut output = Vec::with_capacity(buf.frames() * planes.planes().len());
                for frame in 0..buf.frames() {
                    for plane in planes.planes() {
                        output.push(plane[frame] as f32 / 32768.0);
                    }
                }
                output
            }
            AudioBufferRef::S24(buf) => {
                let planes = buf.planes();
                let mut output = Vec::with_capacity(buf.frames() * planes.planes().len());
                for frame in 0..buf.frames() {
                    for plane in planes.planes() {
                        output.push(plane[frame].0 as f32 / 8388608.0);
                    }
                }
                output
            }
            AudioBufferRef::S32(buf) => {
                let planes = buf.planes();
                let mut output = Vec::with_capacity(buf.frames() * planes.planes().len());
                for frame in 0..buf.frames() {
                    for plane in planes.planes() {
                        output.push(plane[frame] as f32 / 2147483648.0);
                    }
                }
                output
            }
            AudioBufferRef::U8(buf) => {
                let planes = buf.planes();
                let mut output = Vec::with_capacity(buf.frames() * planes.planes().len());
                for frame in 0..buf.frames() {
                    for plane in planes.planes() {
                        output.push((plane[frame] as f32 - 128.0) / 128.0);
                    }
                }
                output
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_nonexistent_file_fails() {
        let result = AudioDecoder::open(Path::new("/nonexistent/file.mp3"));
        assert!(result.is_err());
    }

    /// Write a minimal mono PCM WAV and confirm it opens with the expected
    /// format parameters.
    #[test]
    fn open_synthetic_wav_reports_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        {
            let spec = hound::WavSpec {
                channels: 1,
                sample_rate: 22050,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let mut writer = hound::WavWriter::create(&path, spec).unwrap();
            for i in 0..22050u32 {
                let v = ((i as f32 / 22050.0 * 440.0 * std::f32::consts::TAU).sin() * 10000.0) as i16;
                writer.write_sample(v).unwrap();
            }
            writer.finalize().unwrap();
        }

        let decoder = AudioDecoder::open(&path).unwrap();
        assert_eq!(decoder.sample_rate(), 22050);
        assert_eq!(decoder.channels(), 1);
    }

    #[test]
    fn read_frames_returns_empty_at_eof() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.wav");
        {
            let spec = hound::WavSpec {
                channels: 1,
                sample_rate: 8000,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let mut writer = hound::WavWriter::create(&path, spec).unwrap();
            for _ in 0..800 {
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }

        let mut decoder = AudioDecoder::open(&path).unwrap();
        let mut total = 0;
        loop {
            let frames = decoder.read_frames(256).unwrap();
            if frames.is_empty() {
                break;
            }
            total += frames.len();
        }
        assert!(total > 0);
    }
}
