use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Stream;

/// Real-time audio output driving a user callback with interleaved f32
/// blocks.
///
/// The callback runs on the cpal audio thread and must never touch GPU
/// handles; that boundary is the caller's to keep. The stream stays alive
/// for as long as this value does.
pub struct AudioOutput {
    _stream: Stream,
    pub sample_rate: u32,
    pub channels: usize,
    pub device_name: String,
}

impl AudioOutput {
    /// Open the default output device. `make_callback` receives the device
    /// sample rate and returns the per-block callback, so synthesis state
    /// (e.g. an [`crate::audio::Oscillator`]) can be tuned to the device
    /// before the stream starts.
    pub fn new<F, C>(make_callback: F) -> Result<Self>
    where
        F: FnOnce(u32) -> C,
        C: FnMut(&mut [f32], usize) + Send + 'static,
    {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No audio output device found"))?;

        let device_name = device
            .description()
            .map(|d| d.name().to_string())
            .unwrap_or_else(|_| "Unknown".into());

        let config = device.default_output_config()?;
        let sample_rate = config.sample_rate();
        let channels = config.channels() as usize;
        log::info!(
            "Audio output: {device_name}, {sample_rate}Hz, {channels}ch, {:?}",
            config.sample_format()
        );

        let mut callback = make_callback(sample_rate);
        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                callback(data, channels);
            },
            |err| {
                log::error!("Audio stream error: {err}");
            },
            None,
        )?;

        stream.play()?;
        log::info!("Audio output started");

        Ok(Self {
            _stream: stream,
            sample_rate,
            channels,
            device_name,
        })
    }
}
