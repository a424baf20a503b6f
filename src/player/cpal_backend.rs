//! Audio-graph client implementations (§6).
//!
//! `CpalGraphClient` picks an output device by preferring a headphone-like
//! device by name, falling back to the host default, and drives one stereo
//! `cpal` output stream per player. Bus A maps to the left channel, bus B
//! to the right. The real JACK/MIDI backend is out of scope, so this
//! client reports an empty MIDI slice to the process callback every
//! period; a hardware MIDI source would feed `Player::process` through a
//! different path.
//!
//! `NullGraphClient` is a manually-driven double used by this crate's own
//! tests and any downstream integration test that wants deterministic,
//! hardware-free control over `process()`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};

use crate::error::{Error, Result};
use crate::player::audio_graph::{AudioGraphClient, ProcessCallback, SampleRateCallback};
use crate::player::midi::MidiEvent;

const HEADPHONE_KEYWORDS: [&str; 6] = ["headphone", "headset", "earphone", "airpod", "buds", "earbuds"];

/// Drives one player's two output buses through a single stereo `cpal`
/// stream.
pub struct CpalGraphClient {
    host: cpal::Host,
    device: Option<Device>,
    config: Option<StreamConfig>,
    sample_format: Option<SampleFormat>,
    output_streams_registered: u32,
    process_callback: Option<ProcessCallback>,
    samplerate_callback: Option<SampleRateCallback>,
    stream: Option<Stream>,
    sample_rate: Arc<AtomicU32>,
}

impl CpalGraphClient {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
            device: None,
            config: None,
            sample_format: None,
            output_streams_registered: 0,
            process_callback: None,
            samplerate_callback: None,
            stream: None,
            sample_rate: Arc::new(AtomicU32::new(0)),
        }
    }

    fn select_best_device(&self) -> Result<Device> {
        let devices: Vec<Device> = self
            .host
            .output_devices()
            .map_err(|e| Error::AudioInit(e.to_string()))?
            .collect();

        for device in &devices {
            if let Ok(name) = device.name() {
                let name_lower = name.to_lowercase();
                if HEADPHONE_KEYWORDS.iter().any(|k| name_lower.contains(k)) {
                    tracing::info!(target: "player::audio_graph", "selected headphones: {}", name);
                    return Ok(device.clone());
                }
            }
        }

        self.host
            .default_output_device()
            .ok_or_else(|| Error::AudioInit("no output device found".to_string()))
    }
}

impl Default for CpalGraphClient {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioGraphClient for CpalGraphClient {
    fn register_client(&mut self, name: &str) -> Result<()> {
        let device = self.select_best_device()?;
        let supported = device
            .default_output_config()
            .map_err(|e| Error::AudioInit(e.to_string()))?;

        self.sample_rate.store(supported.sample_rate().0, Ordering::Relaxed);
        self.sample_format = Some(supported.sample_format());
        self.config = Some(StreamConfig {
            channels: 2,
            sample_rate: supported.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        });
        tracing::info!(target: "player::audio_graph", "registered client {}", name);
        self.device = Some(device);
        Ok(())
    }

    fn register_output_stream(&mut self, name: &str) -> Result<()> {
        if self.output_streams_registered >= 2 {
            return Err(Error::AudioInit(format!(
                "player already has two output streams, rejecting {name}"
            )));
        }
        self.output_streams_registered += 1;
        Ok(())
    }

    fn register_midi_input_stream(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn set_process_callback(&mut self, callback: ProcessCallback) -> Result<()> {
        self.process_callback = Some(callback);
        Ok(())
    }

    fn set_samplerate_callback(&mut self, callback: SampleRateCallback) -> Result<()> {
        self.samplerate_callback = Some(callback);
        Ok(())
    }

    fn activate(&mut self) -> Result<()> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| Error::AudioInit("no device registered".to_string()))?;
        let config = self
            .config
            .clone()
            .ok_or_else(|| Error::AudioInit("no stream config negotiated".to_string()))?;
        let mut callback = self
            .process_callback
            .take()
            .ok_or_else(|| Error::AudioInit("no process callback set".to_string()))?;
        let format = self.sample_format.unwrap_or(SampleFormat::F32);
        let no_midi: Vec<MidiEvent> = Vec::new();
        // Reused every period so the callback itself never allocates;
        // `resize` only grows the backing allocation, which in practice
        // happens at most once during warm-up since cpal calls back with
        // a stable period size.
        let mut bus_a: Vec<f32> = Vec::with_capacity(8192);
        let mut bus_b: Vec<f32> = Vec::with_capacity(8192);

        let stream = match format {
            SampleFormat::F32 => device.build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let nframes = data.len() / 2;
                    bus_a.resize(nframes, 0.0);
                    bus_b.resize(nframes, 0.0);
                    callback(&mut bus_a, &mut bus_b, &no_midi);
                    for i in 0..nframes {
                        data[i * 2] = bus_a[i];
                        data[i * 2 + 1] = bus_b[i];
                    }
                },
                |err| tracing::error!(target: "player::audio_graph", "stream error: {}", err),
                None,
            ),
            other => {
                return Err(Error::AudioInit(format!("unsupported sample format: {other:?}")));
            }
        }
        .map_err(|e| Error::AudioInit(e.to_string()))?;

        stream.play().map_err(|e| Error::AudioInit(e.to_string()))?;

        if let Some(cb) = &self.samplerate_callback {
            cb(self.sample_rate.load(Ordering::Relaxed));
        }

        self.stream = Some(stream);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.stream = None;
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Manually-driven double: no device, no thread. Tests call
/// [`NullGraphClient::run_process`] to pump one period through whatever
/// callback the player installed.
#[derive(Default)]
pub struct NullGraphClient {
    sample_rate: u32,
    process_callback: Option<ProcessCallback>,
    samplerate_callback: Option<SampleRateCallback>,
    activated: bool,
}

impl NullGraphClient {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            process_callback: None,
            samplerate_callback: None,
            activated: false,
        }
    }

    /// Pump one period through the installed process callback, filling
    /// `bus_a`/`bus_b`. Panics if called before
    /// [`AudioGraphClient::activate`] or no callback was set — a
    /// test-only misuse, not a runtime path.
    pub fn run_process(&mut self, bus_a: &mut [f32], bus_b: &mut [f32], midi_in: &[MidiEvent]) {
        assert!(self.activated, "run_process called before activate()");
        let callback = self
            .process_callback
            .as_mut()
            .expect("run_process called with no process callback set");
        callback(bus_a, bus_b, midi_in)
    }
}

impl AudioGraphClient for NullGraphClient {
    fn register_client(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn register_output_stream(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn register_midi_input_stream(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn set_process_callback(&mut self, callback: ProcessCallback) -> Result<()> {
        self.process_callback = Some(callback);
        Ok(())
    }

    fn set_samplerate_callback(&mut self, callback: SampleRateCallback) -> Result<()> {
        self.samplerate_callback = Some(callback);
        Ok(())
    }

    fn activate(&mut self) -> Result<()> {
        self.activated = true;
        if let Some(cb) = &self.samplerate_callback {
            cb(self.sample_rate);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.activated = false;
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_client_pumps_installed_callback() {
        let mut client = NullGraphClient::new(48_000);
        client
            .set_process_callback(Box::new(|bus_a: &mut [f32], bus_b: &mut [f32], _midi| {
                bus_a.fill(0.5);
                bus_b.fill(-0.5);
            }))
            .unwrap();
        client.activate().unwrap();
        let mut a = [0.0f32; 4];
        let mut b = [0.0f32; 4];
        client.run_process(&mut a, &mut b, &[]);
        assert_eq!(a, [0.5; 4]);
        assert_eq!(b, [-0.5; 4]);
    }

    #[test]
    fn samplerate_callback_fires_on_activate() {
        let mut client = NullGraphClient::new(44_100);
        let observed = Arc::new(AtomicU32::new(0));
        let observed_clone = Arc::clone(&observed);
        client
            .set_samplerate_callback(Box::new(move |rate| observed_clone.store(rate, Ordering::Relaxed)))
            .unwrap();
        client.activate().unwrap();
        assert_eq!(observed.load(Ordering::Relaxed), 44_100);
    }

    #[test]
    #[should_panic(expected = "before activate")]
    fn run_process_before_activate_panics() {
        let mut client = NullGraphClient::new(48_000);
        let mut a = [0.0f32; 4];
        let mut b = [0.0f32; 4];
        client.run_process(&mut a, &mut b, &[]);
    }
}
