//! cpal-backed microphone capture.
//!
//! The cpal stream is not `Send`, so each capture session runs on its own
//! thread: the thread builds the stream, keeps it alive while chunks
//! arrive, and waits on a control channel. Stopping sends one message;
//! the thread drops the stream (releasing the device) before finalizing
//! the WAV framing, so the device is never held open by a slow finalize.

use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use hound::WavWriter;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::{CaptureBackend, CaptureError, CaptureHandle, Clip, Result};

type WavWriterHandle = Arc<Mutex<Option<WavWriter<MemoryWriter>>>>;

/// A cheaply cloneable handle to the inner data that is being recorded.
/// The finalize method for the wav writer does not return the inner data,
/// so we store it behind an Arc<Mutex> to allow for cheap cloning and
/// access to the inner data.
#[derive(Clone)]
struct MemoryWriter {
    inner: Arc<Mutex<Cursor<Vec<u8>>>>,
}

impl MemoryWriter {
    fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Cursor::new(Vec::with_capacity(8 * 1024)))),
        }
    }

    fn try_into_inner(self) -> Result<Vec<u8>> {
        let owned = Arc::try_unwrap(self.inner)
            .map_err(|_| CaptureError::Capture("buffer still shared after finalize".to_string()))?;
        Ok(owned.into_inner().into_inner())
    }
}

impl Seek for MemoryWriter {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.lock().seek(pos)
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

/// Capture backend recording from the default cpal input device.
#[derive(Debug, Default)]
pub struct MicBackend;

impl MicBackend {
    pub fn new() -> Self {
        Self
    }
}

enum Control {
    Finish(mpsc::Sender<Result<Vec<u8>>>),
}

struct MicHandle {
    ctrl: mpsc::Sender<Control>,
}

impl CaptureHandle for MicHandle {
    fn finish(self: Box<Self>) -> Result<Clip> {
        info!("Ending recording.");
        let (reply_tx, reply_rx) = mpsc::channel();
        self.ctrl
            .send(Control::Finish(reply_tx))
            .map_err(|_| CaptureError::Capture("capture thread already exited".to_string()))?;
        let data = reply_rx
            .recv()
            .map_err(|_| CaptureError::Capture("capture thread exited before finalizing".to_string()))??;
        Ok(Clip::wav(data))
    }
}

#[async_trait]
impl CaptureBackend for MicBackend {
    async fn open(&self) -> Result<Box<dyn CaptureHandle>> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (ctrl_tx, ctrl_rx) = mpsc::channel();

        thread::spawn(move || run_capture(ready_tx, ctrl_rx));

        match ready_rx.await {
            Ok(Ok(())) => Ok(Box::new(MicHandle { ctrl: ctrl_tx })),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CaptureError::Capture(
                "capture thread exited before the stream opened".to_string(),
            )),
        }
    }
}

/// Body of the capture thread: open the stream, report readiness, then
/// hold the device until told to stop or until the handle is dropped (the
/// control channel disconnects).
fn run_capture(ready: oneshot::Sender<Result<()>>, ctrl: mpsc::Receiver<Control>) {
    let (stream, writer, buffer) = match open_stream() {
        Ok(opened) => opened,
        Err(e) => {
            ready.send(Err(e)).ok();
            return;
        }
    };

    if ready.send(Ok(())).is_err() {
        // The opener went away while the grant was resolving; release the
        // device right here and discard the buffer.
        drop(stream);
        return;
    }

    match ctrl.recv() {
        Ok(Control::Finish(reply)) => {
            // Release the device first; finalize the framing afterwards.
            drop(stream);
            reply.send(finalize(writer, buffer)).ok();
        }
        Err(_) => {
            drop(stream);
        }
    }
}

fn open_stream() -> Result<(cpal::Stream, WavWriterHandle, MemoryWriter)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(CaptureError::DeviceNotFound)?;
    let config = device
        .default_input_config()
        .map_err(|_| CaptureError::DeviceNotFound)?;
    let device_name = device.name().unwrap_or_else(|_| "<unknown>".to_string());

    info!(device_name = %device_name, config = ?config, "Recording from device");

    let spec = wav_spec_from_config(&config);
    let buffer = MemoryWriter::new();
    let writer =
        WavWriter::new(buffer.clone(), spec).map_err(|e| CaptureError::Capture(e.to_string()))?;
    let writer = Arc::new(Mutex::new(Some(writer)));
    let writer_2 = writer.clone();

    let err_fn = move |err| {
        error!("an error occurred on stream: {}", err);
    };

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => device
            .build_input_stream(
                &config.into(),
                move |data: &[f32], _: &_| write_chunk(data, &writer_2),
                err_fn,
                None,
            )
            .map_err(map_build_error)?,
        sample_format => {
            return Err(CaptureError::Capture(format!(
                "sample format not supported: {:?}",
                sample_format
            )));
        }
    };

    stream
        .play()
        .map_err(|e| CaptureError::Capture(format!("failed to play stream: {e}")))?;

    Ok((stream, writer, buffer))
}

fn map_build_error(err: cpal::BuildStreamError) -> CaptureError {
    match err {
        // The device exists but the platform refused to open it.
        cpal::BuildStreamError::DeviceNotAvailable => CaptureError::PermissionDenied,
        other => CaptureError::Capture(other.to_string()),
    }
}

/// Append one chunk to the writer, preserving delivery order. Uses
/// `try_lock` so the realtime callback never blocks on finalization.
fn write_chunk(data: &[f32], writer: &WavWriterHandle) {
    if let Some(mut guard) = writer.try_lock() {
        if let Some(writer) = guard.as_mut() {
            for &sample in data.iter() {
                writer.write_sample(sample).ok();
            }
        }
    }
}

fn finalize(writer: WavWriterHandle, buffer: MemoryWriter) -> Result<Vec<u8>> {
    writer
        .lock()
        .take()
        .ok_or_else(|| CaptureError::Capture("writer already finalized".to_string()))?
        .finalize()
        .map_err(|e| CaptureError::Capture(format!("Failed to finalize writer: {}", e)))?;
    buffer.try_into_inner()
}

fn wav_spec_from_config(config: &cpal::SupportedStreamConfig) -> hound::WavSpec {
    hound::WavSpec {
        channels: config.channels(),
        sample_rate: config.sample_rate().0,
        bits_per_sample: (config.sample_format().sample_size() * 8) as _,
        sample_format: sample_format(config.sample_format()),
    }
}

fn sample_format(format: cpal::SampleFormat) -> hound::SampleFormat {
    if format.is_float() {
        hound::SampleFormat::Float
    } else {
        hound::SampleFormat::Int
    }
}
