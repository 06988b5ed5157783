// src/compiler/mod.rs

//! Command compiler: turns a validated [`OperationDescriptor`] into a
//! concrete external-process invocation plan.
//!
//! The compiler is pure and deterministic. It never touches the filesystem
//! beyond path string construction; output naming is collision-tolerant at
//! the naming level only and does not check for pre-existing files.

use std::path::{Path, PathBuf};

use crate::catalog::timecode::format_seconds;
use crate::catalog::{OperationDescriptor, OperationKind};

/// Compiled, tool-ready description of how to run one job.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationPlan {
    /// Absolute path of the transcoding binary.
    pub program: PathBuf,
    /// Argument list passed to the process verbatim.
    pub args: Vec<String>,
    /// Primary input, re-checked by the executor as a fast-fail before spawn.
    pub input_path: PathBuf,
    /// Declared output path; reported on completion without re-verification.
    pub output_path: PathBuf,
    /// Whether the process reports granular progress while running.
    pub incremental: bool,
}

/// Compiles descriptors against a fixed transcoder binary.
///
/// The binary path is injected at construction rather than read from
/// ambient state, so tests and alternate deployments can point elsewhere.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    ffmpeg: PathBuf,
}

impl CommandCompiler {
    pub fn new(ffmpeg: PathBuf) -> Self {
        Self { ffmpeg }
    }

    pub fn compile(&self, descriptor: &OperationDescriptor, output_dir: &Path) -> InvocationPlan {
        let kind = descriptor.kind();
        let input = descriptor.input();

        let output_path = output_file(input, output_dir, kind, descriptor);
        let out = output_path.to_string_lossy().into_owned();
        let inp = input.to_string_lossy().into_owned();

        let args = match descriptor {
            OperationDescriptor::Convert {
                video_codec,
                audio_codec,
                ..
            } => {
                let mut args = vec!["-i".into(), inp];
                if let Some(codec) = video_codec {
                    args.extend(["-c:v".into(), codec.clone()]);
                }
                if let Some(codec) = audio_codec {
                    args.extend(["-c:a".into(), codec.clone()]);
                }
                args.extend(["-y".into(), out]);
                args
            }

            OperationDescriptor::Compress { crf, preset, .. } => vec![
                "-i".into(),
                inp,
                "-c:v".into(),
                "libx264".into(),
                "-crf".into(),
                crf.to_string(),
                "-preset".into(),
                preset.clone(),
                "-c:a".into(),
                "aac".into(),
                "-y".into(),
                out,
            ],

            OperationDescriptor::ExtractAudio { .. } => {
                vec!["-i".into(), inp, "-vn".into(), "-y".into(), out]
            }

            OperationDescriptor::Trim {
                start_secs,
                duration_secs,
                ..
            } => {
                let mut args = vec!["-ss".into(), format_seconds(*start_secs), "-i".into(), inp];
                if let Some(duration) = duration_secs {
                    args.extend(["-t".into(), format_seconds(*duration)]);
                }
                args.extend(["-y".into(), out]);
                args
            }

            OperationDescriptor::Resize { scale, .. } => {
                // `scale` is validated as WxH; the filter wants W:H.
                let target = scale.replacen('x', ":", 1);
                vec![
                    "-i".into(),
                    inp,
                    "-vf".into(),
                    format!("scale={target}"),
                    "-y".into(),
                    out,
                ]
            }

            OperationDescriptor::Watermark {
                watermark,
                position,
                ..
            } => vec![
                "-i".into(),
                inp,
                "-i".into(),
                watermark.to_string_lossy().into_owned(),
                "-filter_complex".into(),
                format!("[0:v][1:v]overlay={}", position.overlay_offset()),
                "-y".into(),
                out,
            ],

            OperationDescriptor::Thumbnail { timestamp_secs, .. } => vec![
                "-ss".into(),
                format_seconds(*timestamp_secs),
                "-i".into(),
                inp,
                "-frames:v".into(),
                "1".into(),
                "-y".into(),
                out,
            ],
        };

        InvocationPlan {
            program: self.ffmpeg.clone(),
            args,
            input_path: input.to_path_buf(),
            output_path,
            incremental: kind.is_incremental(),
        }
    }
}

/// `<inputBaseName>_<operationSuffix>.<ext>` inside the output directory.
fn output_file(
    input: &Path,
    output_dir: &Path,
    kind: OperationKind,
    descriptor: &OperationDescriptor,
) -> PathBuf {
    let base = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());

    let ext = match descriptor {
        OperationDescriptor::Convert { output_format, .. } => output_format.clone(),
        OperationDescriptor::ExtractAudio { audio_format, .. } => audio_format.clone(),
        OperationDescriptor::Thumbnail { .. } => "png".to_string(),
        // Compress, trim, resize and watermark keep the input container.
        _ => input
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mp4".to_string()),
    };

    output_dir.join(format!("{base}_{}.{ext}", kind.suffix()))
}
