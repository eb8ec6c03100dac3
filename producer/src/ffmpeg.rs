use image::{DynamicImage, RgbImage};
use serde::Deserialize;
use sharpframe_common::frame::Frame;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

use crate::{FrameSource, SourceError};

const BYTES_PER_PIXEL: usize = 3;

/// Dimensions and codec of the first video stream, as reported by ffprobe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub codec: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Video file decoded by an `ffmpeg` child process into raw RGB frames.
///
/// The child is owned exclusively by the source. It is reaped as soon as
/// the stream ends (exhaustion or read failure) and killed on drop if the
/// source is abandoned early. The first frame is decoded while opening, so
/// a stream ffmpeg cannot decode at all is reported as an open failure.
pub struct VideoSource {
    path: String,
    info: StreamInfo,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    pending: Option<Frame>,
    next_index: u64,
}

impl VideoSource {
    pub fn open(path: &Path, ffprobe: &str, ffmpeg: &str) -> Result<Self, SourceError> {
        let path_str = path.display().to_string();
        if !path.is_file() {
            return Err(SourceError::NotFound(path_str));
        }

        let info = probe(path, ffprobe)?;

        let mut child = Command::new(ffmpeg)
            .args(["-v", "error", "-nostdin", "-xerror", "-noautorotate", "-i"])
            .arg(path)
            .args([
                "-map", "0:v:0",
                "-fps_mode", "passthrough",
                "-f", "rawvideo",
                "-pix_fmt", "rgb24",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SourceError::Spawn(e.to_string()))?;

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(out), Some(err)) => (out, err),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SourceError::Spawn("could not get stdout/stderr handles".into()));
            }
        };

        info!(
            path = path_str,
            codec = info.codec,
            width = info.width,
            height = info.height,
            "ffmpeg decoder started"
        );

        let mut source = Self {
            path: path_str,
            info,
            child: Some(child),
            stdout: Some(stdout),
            stderr: Some(drain(stderr)),
            pending: None,
            next_index: 0,
        };

        match source.read_frame() {
            Ok(first) => source.pending = first,
            Err(reason) => return Err(SourceError::Decode(source.path.clone(), reason)),
        }
        Ok(source)
    }

    fn frame_len(&self) -> usize {
        self.info.width as usize * self.info.height as usize * BYTES_PER_PIXEL
    }

    /// Read the next raw frame from the pipe.
    ///
    /// `Ok(None)` ends the stream. `Err` carries ffmpeg's diagnostic when the
    /// pipe closed cleanly but ffmpeg exited with an error status.
    fn read_frame(&mut self) -> Result<Option<Frame>, String> {
        let expected = self.frame_len();
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };
        let mut data = vec![0u8; expected];

        match fill(stdout, &mut data) {
            Ok(n) if n == expected => {}
            Ok(0) => {
                debug!(path = self.path, frames = self.next_index, "end of video stream");
                return match self.release(true) {
                    Some(reason) => Err(reason),
                    None => Ok(None),
                };
            }
            Ok(n) => {
                warn!(
                    path = self.path,
                    index = self.next_index,
                    bytes = n,
                    expected,
                    "truncated frame, ending stream"
                );
                self.release(false);
                return Ok(None);
            }
            Err(e) => {
                warn!(path = self.path, index = self.next_index, error = %e, "frame read failed, ending stream");
                self.release(false);
                return Ok(None);
            }
        }

        let Some(image) = RgbImage::from_raw(self.info.width, self.info.height, data) else {
            return Ok(None);
        };
        let frame = Frame::new(self.next_index, DynamicImage::ImageRgb8(image));
        self.next_index += 1;
        Ok(Some(frame))
    }

    /// Close the pipe and reap ffmpeg. A clean end of stream waits for the
    /// process to exit on its own; anything else kills it first.
    ///
    /// Returns ffmpeg's diagnostic when it exited with an error status after
    /// a clean end of stream.
    fn release(&mut self, graceful: bool) -> Option<String> {
        drop(self.stdout.take());
        let mut child = self.child.take()?;
        if !graceful {
            let _ = child.kill();
        }
        let status = child.wait();
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        let stderr = stderr.trim();

        match status {
            Ok(status) if status.success() => {
                debug!(path = self.path, %status, "ffmpeg decoder released");
                None
            }
            Ok(status) if !graceful => {
                debug!(path = self.path, %status, "ffmpeg decoder stopped");
                if !stderr.is_empty() {
                    warn!(path = self.path, stderr = %stderr, "ffmpeg reported errors");
                }
                None
            }
            Ok(status) => {
                let reason = failure_reason(status, stderr);
                warn!(path = self.path, %status, error = %reason, "ffmpeg exited with error status");
                Some(reason)
            }
            Err(e) => {
                warn!(path = self.path, error = %e, "failed to wait for ffmpeg");
                graceful.then(|| e.to_string())
            }
        }
    }
}

fn failure_reason(status: ExitStatus, stderr: &str) -> String {
    if stderr.is_empty() {
        format!("ffmpeg exited with {status}")
    } else {
        stderr.to_string()
    }
}

/// Collect ffmpeg's stderr on its own thread while frames are read from stdout.
fn drain(mut stderr: ChildStderr) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

impl FrameSource for VideoSource {
    fn next_frame(&mut self) -> Option<Frame> {
        if let Some(frame) = self.pending.take() {
            return Some(frame);
        }
        // A late ffmpeg failure is logged by `release`; the frames already
        // decoded still stand.
        self.read_frame().ok().flatten()
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        self.release(false);
    }
}

/// Read until `buf` is full or the pipe closes. Returns the bytes read.
fn fill(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn probe(path: &Path, ffprobe: &str) -> Result<StreamInfo, SourceError> {
    let path_str = path.display().to_string();
    let output = Command::new(ffprobe)
        .args([
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries", "stream=codec_name,width,height",
            "-of", "json",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| SourceError::Probe(path_str.clone(), e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SourceError::Probe(path_str, stderr.trim().to_string()));
    }

    parse_probe_output(&output.stdout, &path_str)
}

fn parse_probe_output(json: &[u8], path: &str) -> Result<StreamInfo, SourceError> {
    let parsed: ProbeOutput = serde_json::from_slice(json)
        .map_err(|e| SourceError::Probe(path.to_string(), e.to_string()))?;

    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::NoVideoStream(path.to_string()))?;

    match (stream.codec_name, stream.width, stream.height) {
        (Some(codec), Some(width), Some(height)) if width > 0 && height > 0 => Ok(StreamInfo {
            codec,
            width,
            height,
        }),
        _ => Err(SourceError::NoVideoStream(path.to_string())),
    }
}
