use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use tracing::{debug, info};

use super::RgbFrame;
use crate::error::RecordingError;

/// Container extension appended to every recording path.
pub const VIDEO_EXTENSION: &str = "avi";

/// Frame rate written into the container.
const FPS: u32 = 25;

/// Destination for rendered frames.
pub trait VideoSink {
    fn write_frame(&mut self, frame: &RgbFrame) -> Result<(), RecordingError>;

    /// Flush and finalise the output. Returns the number of frames written.
    fn close(&mut self) -> Result<usize, RecordingError>;
}

/// `<path>.avi`
pub fn video_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(VIDEO_EXTENSION);
    PathBuf::from(name)
}

/// Streams raw rgb24 frames into an `ffmpeg` child process.
pub struct FfmpegWriter {
    child: Child,
    stdin: Option<ChildStdin>,
    width: usize,
    height: usize,
    frames: usize,
    output: PathBuf,
}

impl FfmpegWriter {
    /// Start the encoder writing to `<path>.avi`.
    pub fn open(path: &Path, width: usize, height: usize) -> Result<Self, RecordingError> {
        Self::open_with(Path::new("ffmpeg"), path, width, height)
    }

    /// Like [`open`](Self::open) with an explicit encoder binary.
    pub fn open_with(
        program: &Path,
        path: &Path,
        width: usize,
        height: usize,
    ) -> Result<Self, RecordingError> {
        let output = video_path(path);
        let mut child = Command::new(program)
            .args(["-y", "-loglevel", "error", "-f", "rawvideo", "-pix_fmt", "rgb24"])
            .arg("-s")
            .arg(format!("{width}x{height}"))
            .arg("-r")
            .arg(FPS.to_string())
            .args(["-i", "-"])
            .arg(&output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|source| RecordingError::Spawn {
                program: program.display().to_string(),
                source,
            })?;
        let stdin = child.stdin.take();
        info!(output = %output.display(), width, height, "recording started");
        Ok(FfmpegWriter {
            child,
            stdin,
            width,
            height,
            frames: 0,
            output,
        })
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl VideoSink for FfmpegWriter {
    fn write_frame(&mut self, frame: &RgbFrame) -> Result<(), RecordingError> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(RecordingError::FrameSize {
                want_w: self.width,
                want_h: self.height,
                got_w: frame.width(),
                got_h: frame.height(),
            });
        }
        let stdin = self.stdin.as_mut().ok_or(RecordingError::Closed)?;
        stdin.write_all(frame.as_bytes())?;
        self.frames += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<usize, RecordingError> {
        // Dropping stdin sends EOF so the encoder can finish the container.
        drop(self.stdin.take().ok_or(RecordingError::Closed)?);
        let status = self.child.wait()?;
        if !status.success() {
            return Err(RecordingError::EncoderFailed(status));
        }
        debug!(frames = self.frames, output = %self.output.display(), "recording closed");
        Ok(self.frames)
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        if self.stdin.take().is_some() {
            let _ = self.child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_path_appends_extension() {
        assert_eq!(
            video_path(Path::new("runs/episode")),
            PathBuf::from("runs/episode.avi")
        );
        assert_eq!(
            video_path(Path::new("clip.v1")),
            PathBuf::from("clip.v1.avi")
        );
    }

    #[test]
    fn test_missing_encoder_fails_to_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let err = FfmpegWriter::open_with(
            &dir.path().join("no-such-encoder"),
            &dir.path().join("out"),
            4,
            4,
        )
        .err()
        .unwrap();
        assert!(matches!(err, RecordingError::Spawn { .. }));
    }
}
