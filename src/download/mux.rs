//! Stream muxing with ffmpeg.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::error::{Error, Result};

/// Protocols ffmpeg may open while reading remote playlists and segments.
const PROTOCOL_WHITELIST: &str = "file,http,https,tcp,tls,crypto";

/// Runs ffmpeg to combine video and audio streams into one MP4 without re-encoding.
#[derive(Debug, Clone)]
pub struct Muxer {
    ffmpeg: PathBuf,
}

impl Muxer {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    /// Build the ffmpeg argument list.
    ///
    /// With an audio input, maps the first video track of input 0 and the first
    /// audio track of input 1. Without one, keeps input 0's own audio if present.
    pub fn build_args(video: &str, audio: Option<&str>, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-loglevel",
            "verbose",
            "-y",
            "-protocol_whitelist",
            PROTOCOL_WHITELIST,
            "-i",
            video,
        ]
        .into_iter()
        .map(OsString::from)
        .collect();

        match audio {
            Some(audio) => {
                args.extend(["-i", audio].map(OsString::from));
                args.extend(["-map", "0:v:0", "-map", "1:a:0"].map(OsString::from));
            }
            None => {
                args.extend(["-map", "0:v:0", "-map", "0:a?"].map(OsString::from));
            }
        }

        args.extend(
            ["-c", "copy", "-bsf:a", "aac_adtstoasc", "-movflags", "+faststart"]
                .map(OsString::from),
        );
        args.push(output.as_os_str().to_os_string());
        args
    }

    /// Mux `video` and optional `audio` into `output`.
    ///
    /// stderr is streamed line by line while ffmpeg runs and returned in the
    /// error on a non-zero exit. Failures are never retried here.
    pub async fn mux(&self, video: &str, audio: Option<&str>, output: &Path) -> Result<()> {
        let args = Self::build_args(video, audio, output);
        tracing::debug!("Running {} {:?}", self.ffmpeg.display(), args);

        let mut child = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::FFmpegNotFound
                } else {
                    Error::Io(e)
                }
            })?;

        let stderr = child.stderr.take();
        let collector = tokio::spawn(async move {
            let mut diagnostics = String::new();
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: "ffmpeg", "{}", line);
                    diagnostics.push_str(&line);
                    diagnostics.push('\n');
                }
            }
            diagnostics
        });

        let status = child.wait().await?;
        let diagnostics = collector.await.unwrap_or_default();

        if !status.success() {
            return Err(Error::Mux {
                exit_code: status.code(),
                diagnostics,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_args_with_audio() {
        let args = strings(&Muxer::build_args(
            "https://v.pinimg.com/720.m3u8",
            Some("https://v.pinimg.com/audio.m3u8"),
            Path::new("/out/clip.mp4"),
        ));
        assert_eq!(
            args,
            vec![
                "-loglevel",
                "verbose",
                "-y",
                "-protocol_whitelist",
                "file,http,https,tcp,tls,crypto",
                "-i",
                "https://v.pinimg.com/720.m3u8",
                "-i",
                "https://v.pinimg.com/audio.m3u8",
                "-map",
                "0:v:0",
                "-map",
                "1:a:0",
                "-c",
                "copy",
                "-bsf:a",
                "aac_adtstoasc",
                "-movflags",
                "+faststart",
                "/out/clip.mp4",
            ]
        );
    }

    #[test]
    fn test_args_without_audio_keep_embedded_track() {
        let args = strings(&Muxer::build_args(
            "https://v.pinimg.com/720.m3u8",
            None,
            Path::new("/out/clip.mp4"),
        ));
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 1);
        let map_pos = args.iter().position(|a| a == "-map").unwrap();
        assert_eq!(&args[map_pos..map_pos + 4], ["-map", "0:v:0", "-map", "0:a?"]);
        assert_eq!(args.last().unwrap(), "/out/clip.mp4");
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let muxer = Muxer::new("/nonexistent/ffmpeg-binary");
        let err = muxer
            .mux("in.m3u8", None, Path::new("/tmp/out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FFmpegNotFound));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_mux_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = Muxer::new("false")
            .mux("in.m3u8", None, &dir.path().join("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Mux { exit_code: Some(1), .. }));
        assert!(!dir.path().join("out.mp4").exists());
    }
}
