use std::path::Path;

use ffmpeg_next as ffmpeg;
use ffmpeg_next::ffi;
use ffmpeg_next::{codec, decoder, format, frame, media, software::scaling, util::format::Pixel};

use super::{expand_rgb_to_rgba, target_channels, MediaError};
use crate::gpu::video_texture::VideoTexture;

/// One open video source: demux → decode → color-convert → GPU upload.
///
/// Frame-driven and synchronous: call [`Movie::available`] once per render
/// frame to advance the decode cursor by at most one video frame, then
/// [`Movie::read`] to push the converted pixels to the texture. All methods
/// must run on the thread that owns the rendering context.
pub struct Movie {
    // Decode resources, declared in release order: frame holders before the
    // decoder, decoder before the container. Rust drops fields in
    // declaration order, so teardown ordering holds by construction.
    native_frame: frame::Video,
    converted_frame: frame::Video,
    decoder: decoder::Video,
    input: format::context::Input,
    packet: ffmpeg::Packet,
    scaler: scaling::Context,

    stream_index: usize,
    width: u32,
    height: u32,
    channels: u32,
    frame_counter: u64,
    /// Reused RGB→RGBA staging rows for 3-channel sessions (wgpu has no
    /// 3-channel 8-bit texture format).
    rgba_scratch: Vec<u8>,
    pub texture: VideoTexture,
}

impl Movie {
    /// Open a container and prepare the full decode/convert pipeline.
    ///
    /// `requested_channels < 0` means "no preference" and yields RGBA, and a
    /// hint of 4 forces RGBA; other hints yield RGB24 unless the source
    /// itself carries four components. Every failed step aborts
    /// construction; no partial session is returned.
    pub fn open(
        device: &wgpu::Device,
        path: impl AsRef<Path>,
        requested_channels: i32,
    ) -> Result<Self, MediaError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        ffmpeg::init().map_err(|e| MediaError::Open {
            path: display.clone(),
            detail: e.to_string(),
        })?;

        // Opens the container and probes stream info in one step.
        let input = format::input(&path).map_err(|e| MediaError::Open {
            path: display.clone(),
            detail: e.to_string(),
        })?;

        let (stream_index, parameters, frame_rate) = {
            let stream = input
                .streams()
                .find(|s| s.parameters().medium() == media::Type::Video)
                .ok_or_else(|| MediaError::NoVideoStream(display.clone()))?;
            (stream.index(), stream.parameters(), stream.avg_frame_rate())
        };

        let decoder = codec::context::Context::from_parameters(parameters)
            .and_then(|ctx| ctx.decoder().video())
            .map_err(|e| MediaError::Decoder(e.to_string()))?;

        let width = decoder.width();
        let height = decoder.height();
        let src_format = decoder.format();
        let components = src_format
            .descriptor()
            .map_or(0, |d| u32::from(d.nb_components()));
        let channels = target_channels(requested_channels, components);
        let dst_format = if channels == 4 {
            Pixel::RGBA
        } else {
            Pixel::RGB24
        };

        let scaler = scaling::Context::get(
            src_format,
            width,
            height,
            dst_format,
            width,
            height,
            scaling::Flags::FAST_BILINEAR,
        )
        .map_err(|e| MediaError::Converter(e.to_string()))?;

        // The converted holder is allocated once from the decoder-reported
        // dimensions and never resized mid-stream.
        let native_frame = frame::Video::empty();
        let converted_frame = frame::Video::new(dst_format, width, height);
        let packet = ffmpeg::Packet::empty();

        let texture = VideoTexture::new(device, width, height);

        log::info!(
            "movie opened: {display}, {width}x{height}, {channels}ch, ~{:.2} fps",
            f64::from(frame_rate)
        );

        Ok(Self {
            native_frame,
            converted_frame,
            decoder,
            input,
            packet,
            scaler,
            stream_index,
            width,
            height,
            channels,
            frame_counter: 0,
            rgba_scratch: Vec::new(),
            texture,
        })
    }

    /// Pull the next video frame: read packets (discarding those of other
    /// streams), decode, color-convert into the staging frame. Returns true
    /// iff a new frame landed in the staging buffer during this call.
    ///
    /// "Needs more input" and end-of-stream are steady-state conditions and
    /// report false without error; unexpected decode errors are logged and
    /// also report false so a live render loop keeps running.
    pub fn available(&mut self) -> bool {
        // av_read_frame and avcodec_receive_frame unref their output
        // arguments on entry, so reusing the holders cannot leak across
        // calls.
        loop {
            match self.packet.read(&mut self.input) {
                Ok(()) => {}
                Err(ffmpeg::Error::Eof) => return false,
                Err(e) => {
                    log::warn!("packet read failed: {e}");
                    return false;
                }
            }
            if self.packet.stream() == self.stream_index {
                break;
            }
            // Audio/subtitle packets do not consume a decode attempt.
        }

        if let Err(e) = self.decoder.send_packet(&self.packet) {
            log::warn!("decoder rejected packet: {e}");
            return false;
        }

        match self.decoder.receive_frame(&mut self.native_frame) {
            Ok(()) => {
                self.frame_counter += 1;
                match self.scaler.run(&self.native_frame, &mut self.converted_frame) {
                    Ok(()) => true,
                    Err(e) => {
                        log::warn!("color conversion failed: {e}");
                        false
                    }
                }
            }
            Err(ffmpeg::Error::Other { errno }) if errno == ffi::EAGAIN => false,
            Err(ffmpeg::Error::Eof) => false,
            Err(e) => {
                log::warn!("error receiving frame: {e}");
                false
            }
        }
    }

    /// Push the current converted staging buffer to the GPU texture. Pure
    /// upload: does not advance decode state, and repeated calls without an
    /// intervening [`Movie::available`] re-upload identical pixels.
    pub fn read(&mut self, queue: &wgpu::Queue) {
        let stride = self.converted_frame.stride(0);
        let data = self.converted_frame.data(0);
        if self.channels == 4 {
            self.texture.write_rgba(queue, data, stride as u32);
        } else {
            expand_rgb_to_rgba(
                data,
                stride,
                self.width as usize,
                self.height as usize,
                &mut self.rgba_scratch,
            );
            self.texture.write_rgba(queue, &self.rgba_scratch, self.width * 4);
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channel count of the conversion target (3 or 4).
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Video frames decoded so far.
    pub fn frames_decoded(&self) -> u64 {
        self.frame_counter
    }
}
