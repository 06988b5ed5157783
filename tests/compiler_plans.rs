// tests/compiler_plans.rs
//
// The compiler is pure, so these tests build descriptors directly and
// assert on the exact argument vectors.

use std::path::{Path, PathBuf};

use mediaforge::catalog::{OperationDescriptor, WatermarkPosition};
use mediaforge::compiler::CommandCompiler;

fn compiler() -> CommandCompiler {
    CommandCompiler::new(PathBuf::from("/usr/bin/ffmpeg"))
}

fn out_dir() -> PathBuf {
    PathBuf::from("/out")
}

#[test]
fn convert_plan_renames_output_with_suffix() {
    let descriptor = OperationDescriptor::Convert {
        input: PathBuf::from("/videos/clip.mov"),
        output_format: "webm".to_string(),
        video_codec: None,
        audio_codec: None,
    };

    let plan = compiler().compile(&descriptor, &out_dir());

    assert_eq!(plan.program, Path::new("/usr/bin/ffmpeg"));
    assert_eq!(plan.output_path, Path::new("/out/clip_converted.webm"));
    assert_eq!(
        plan.args,
        vec!["-i", "/videos/clip.mov", "-y", "/out/clip_converted.webm"]
    );
    assert!(plan.incremental);
}

#[test]
fn convert_plan_includes_requested_codecs() {
    let descriptor = OperationDescriptor::Convert {
        input: PathBuf::from("/videos/clip.mov"),
        output_format: "webm".to_string(),
        video_codec: Some("libvpx-vp9".to_string()),
        audio_codec: Some("libopus".to_string()),
    };

    let plan = compiler().compile(&descriptor, &out_dir());

    assert_eq!(
        plan.args,
        vec![
            "-i",
            "/videos/clip.mov",
            "-c:v",
            "libvpx-vp9",
            "-c:a",
            "libopus",
            "-y",
            "/out/clip_converted.webm"
        ]
    );
}

#[test]
fn compress_plan_carries_crf_and_preset() {
    let descriptor = OperationDescriptor::Compress {
        input: PathBuf::from("/videos/clip.mp4"),
        crf: 23,
        preset: "fast".to_string(),
    };

    let plan = compiler().compile(&descriptor, &out_dir());

    assert_eq!(plan.output_path, Path::new("/out/clip_compressed.mp4"));
    assert_eq!(
        plan.args,
        vec![
            "-i",
            "/videos/clip.mp4",
            "-c:v",
            "libx264",
            "-crf",
            "23",
            "-preset",
            "fast",
            "-c:a",
            "aac",
            "-y",
            "/out/clip_compressed.mp4"
        ]
    );
}

#[test]
fn extract_audio_plan_drops_video() {
    let descriptor = OperationDescriptor::ExtractAudio {
        input: PathBuf::from("/videos/clip.mp4"),
        audio_format: "wav".to_string(),
    };

    let plan = compiler().compile(&descriptor, &out_dir());

    assert_eq!(plan.output_path, Path::new("/out/clip_audio.wav"));
    assert_eq!(
        plan.args,
        vec!["-i", "/videos/clip.mp4", "-vn", "-y", "/out/clip_audio.wav"]
    );
}

#[test]
fn trim_plan_emits_duration_only_when_bounded() {
    let bounded = OperationDescriptor::Trim {
        input: PathBuf::from("/videos/clip.mp4"),
        start_secs: 10.0,
        duration_secs: Some(50.0),
    };
    let plan = compiler().compile(&bounded, &out_dir());
    assert_eq!(plan.output_path, Path::new("/out/clip_trimmed.mp4"));
    assert_eq!(
        plan.args,
        vec![
            "-ss",
            "10",
            "-i",
            "/videos/clip.mp4",
            "-t",
            "50",
            "-y",
            "/out/clip_trimmed.mp4"
        ]
    );

    let open_ended = OperationDescriptor::Trim {
        input: PathBuf::from("/videos/clip.mp4"),
        start_secs: 10.0,
        duration_secs: None,
    };
    let plan = compiler().compile(&open_ended, &out_dir());
    assert!(!plan.args.contains(&"-t".to_string()));
}

#[test]
fn resize_plan_uses_scale_filter() {
    let descriptor = OperationDescriptor::Resize {
        input: PathBuf::from("/videos/clip.mp4"),
        scale: "640x480".to_string(),
    };

    let plan = compiler().compile(&descriptor, &out_dir());

    assert_eq!(plan.output_path, Path::new("/out/clip_resized.mp4"));
    assert_eq!(
        plan.args,
        vec![
            "-i",
            "/videos/clip.mp4",
            "-vf",
            "scale=640:480",
            "-y",
            "/out/clip_resized.mp4"
        ]
    );
}

#[test]
fn watermark_plan_overlays_second_input() {
    let descriptor = OperationDescriptor::Watermark {
        input: PathBuf::from("/videos/clip.mp4"),
        watermark: PathBuf::from("/assets/logo.png"),
        position: WatermarkPosition::Center,
    };

    let plan = compiler().compile(&descriptor, &out_dir());

    assert_eq!(plan.output_path, Path::new("/out/clip_watermarked.mp4"));
    assert_eq!(
        plan.args,
        vec![
            "-i",
            "/videos/clip.mp4",
            "-i",
            "/assets/logo.png",
            "-filter_complex",
            "[0:v][1:v]overlay=(W-w)/2:(H-h)/2",
            "-y",
            "/out/clip_watermarked.mp4"
        ]
    );
}

#[test]
fn thumbnail_plan_is_a_single_png_frame() {
    let descriptor = OperationDescriptor::Thumbnail {
        input: PathBuf::from("/videos/clip.mp4"),
        timestamp_secs: 7.5,
    };

    let plan = compiler().compile(&descriptor, &out_dir());

    assert_eq!(plan.output_path, Path::new("/out/clip_thumb.png"));
    assert!(!plan.incremental);
    assert_eq!(
        plan.args,
        vec![
            "-ss",
            "7.500",
            "-i",
            "/videos/clip.mp4",
            "-frames:v",
            "1",
            "-y",
            "/out/clip_thumb.png"
        ]
    );
}

#[test]
fn compile_is_deterministic() {
    let descriptor = OperationDescriptor::Compress {
        input: PathBuf::from("/videos/clip.mp4"),
        crf: 28,
        preset: "medium".to_string(),
    };

    let first = compiler().compile(&descriptor, &out_dir());
    let second = compiler().compile(&descriptor, &out_dir());
    assert_eq!(first, second);
}

#[test]
fn input_without_extension_defaults_to_mp4_container() {
    let descriptor = OperationDescriptor::Compress {
        input: PathBuf::from("/videos/raw"),
        crf: 28,
        preset: "medium".to_string(),
    };

    let plan = compiler().compile(&descriptor, &out_dir());
    assert_eq!(plan.output_path, Path::new("/out/raw_compressed.mp4"));
}
