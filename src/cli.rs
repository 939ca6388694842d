// SPDX-License-Identifier: GPL-3.0-only

//! Command-line commands

use camera_pipeline::backends::camera::{FrameSource, SyntheticCamera, SyntheticConfig};
use camera_pipeline::config::Config;
use camera_pipeline::constants::ProcessorKind;
use camera_pipeline::frame_processor::build_processor;
use camera_pipeline::gpu;
use camera_pipeline::media::nv21_converter::{convert_to_nv21, raw_frame_from_i420};
use camera_pipeline::pipelines::PreviewPipeline;
use camera_pipeline::render::{RenderHost, WgpuBackend};
use camera_pipeline::FrameSlot;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

/// Command-line overrides for `run`
pub struct RunOptions {
    pub frames: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub processor: Option<String>,
    pub snapshot: Option<PathBuf>,
}

/// Stream the synthetic camera through the pipeline into the renderer
pub fn run(mut config: Config, options: RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(width) = options.width {
        config.width = width;
    }
    if let Some(height) = options.height {
        config.height = height;
    }
    if let Some(fps) = options.fps {
        config.framerate = fps;
    }
    if let Some(name) = &options.processor {
        config.processor = ProcessorKind::from_name(name).ok_or_else(|| {
            let names: Vec<String> = ProcessorKind::ALL
                .iter()
                .map(|k| format!("{:?}", k).to_lowercase())
                .collect();
            format!("Unknown processor '{}', expected one of: {}", name, names.join(", "))
        })?;
    }
    config.validate()?;

    let (width, height) = (config.width, config.height);
    println!("Resolution: {}x{} @ {} fps", width, height, config.framerate);
    println!("Processor: {}", config.processor);

    let slot = Arc::new(FrameSlot::new());
    let clear_color = config.clear_color;
    let host = RenderHost::spawn(
        move || {
            let (device, queue, info) = gpu::create_render_device_blocking("camera-pipeline")?;
            info!(adapter = %info.adapter_name, software = info.is_software, "Render device ready");
            let mut backend = WgpuBackend::new(device, queue, width, height);
            backend.set_clear_color(clear_color);
            Ok(backend)
        },
        Arc::clone(&slot),
        width,
        height,
    )?;

    let pipeline = PreviewPipeline::from_boxed(
        build_processor(config.processor, &config),
        Arc::clone(&slot),
        Box::new(host.redraw_handle()),
    );
    let stats = pipeline.stats();

    let mut camera = SyntheticCamera::new(SyntheticConfig {
        width,
        height,
        framerate: config.framerate,
        chroma_pixel_stride: config.chroma_pixel_stride,
        row_padding: config.row_padding,
        frame_limit: options.frames,
    })?;

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    println!();
    match options.frames {
        Some(n) => println!("Streaming {} frames... (press Ctrl+C to stop early)", n),
        None => println!("Streaming... (press Ctrl+C to stop)"),
    }
    camera.start(pipeline.into_sink())?;

    loop {
        if stop_flag.load(Ordering::SeqCst) {
            println!();
            println!("Stopping early...");
            break;
        }
        if camera.is_capture_finished() && camera.release_counter().outstanding() == 0 {
            break;
        }

        let snap = stats.snapshot();
        print!(
            "\rFrames: {} shown, {} dropped, {:.1} fps",
            snap.published,
            snap.dropped() + camera.dropped(),
            snap.fps
        );
        std::io::Write::flush(&mut std::io::stdout())?;

        std::thread::sleep(Duration::from_millis(100));
    }
    println!();

    camera.stop();
    let counter = camera.release_counter().clone();
    let source_dropped = camera.dropped();
    let drawn = host.drawn();
    let renderer = host.shutdown()?;

    let snap = stats.snapshot();
    println!();
    println!("Resolution:        {}", snap.resolution());
    println!("Frames delivered:  {}", counter.delivered());
    println!("Frames released:   {}", counter.released());
    println!("Dropped by source: {}", source_dropped);
    println!("Frames processed:  {}", snap.published);
    println!("Dropped (bounds):  {}", snap.dropped_bounds);
    println!("Dropped (stage):   {}", snap.dropped_processor);
    println!("Draws:             {}", drawn);

    if let Some(target) = options.snapshot {
        let (surface_w, surface_h) = renderer.backend().surface_size();
        let pixels = renderer.backend().read_surface()?;
        let image = image::RgbaImage::from_raw(surface_w, surface_h, pixels)
            .ok_or("Surface readback has unexpected size")?;

        let path = snapshot_path(&target);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        image.save(&path)?;
        println!("Snapshot saved: {}", path.display());
    }

    Ok(())
}

/// Convert a tightly packed I420 file to NV21
pub fn convert(
    input: &Path,
    width: u32,
    height: u32,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(input)?;
    let frame = raw_frame_from_i420(&data, width, height)?;
    let nv21 = convert_to_nv21(&frame)?;

    let output = output.unwrap_or_else(|| input.with_extension("nv21"));
    std::fs::write(&output, &nv21.data)?;

    println!(
        "Converted {}x{} frame ({} bytes) to {}",
        width,
        height,
        nv21.data.len(),
        output.display()
    );
    Ok(())
}

/// Print the effective configuration, optionally writing it out first
pub fn print_config(
    config: &Config,
    path: Option<&Path>,
    init: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if init {
        match path {
            Some(path) => config.save_to(path)?,
            None => config.save()?,
        }
    }
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

/// Default folder name for saving snapshots
const DEFAULT_SAVE_FOLDER: &str = "Camera";

/// Get default snapshot directory
fn get_default_snapshot_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(DEFAULT_SAVE_FOLDER)
}

/// Resolve the snapshot target to a file path
///
/// Empty or directory targets get a timestamped file name.
fn snapshot_path(target: &Path) -> PathBuf {
    let file_name = format!("snapshot_{}.png", Local::now().format("%Y%m%d_%H%M%S"));
    if target.as_os_str().is_empty() {
        get_default_snapshot_dir().join(file_name)
    } else if target.is_dir() {
        target.join(file_name)
    } else {
        target.to_path_buf()
    }
}
