mod audio;
mod cli;
mod config;
mod encode;
mod error;
mod histogram;
mod render;
mod templates;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use audio::{IntensityAnalyzer, IntensityCurve};
use cli::{Cli, Mode, OutputType};
use encode::ffmpeg::{EncodeSettings, FfmpegEncoder};
use render::cache::RenderCache;
use render::procedural::{ProceduralCompositor, ProceduralSettings, TitleBlock};
use render::sequence::{self, IntroPhase, LayerSequence, SequenceCompositor, SequenceLayers};
use render::text::TextOverlay;
use render::timing::FrameTiming;
use render::Compositor;
use templates::{loader, CommandRenderer, JobAssets, LayerKind, RenderSettings};

/// Framerate used with the built-in demo curve.
const DEMO_FRAMERATE: u32 = 2;

fn main() -> Result<()> {
    let mut cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();

    if let Some(path) = config::find_config_path(cli.config.as_deref()) {
        let cfg = config::load_config(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        cfg.apply(&mut cli);
    }

    let templates_root = cli
        .templates_dir
        .clone()
        .unwrap_or_else(loader::find_templates_dir);

    if cli.list_templates {
        print_templates(&templates_root)?;
        return Ok(());
    }

    let output_type = cli.output_type;
    match output_type {
        OutputType::Histogram if cli.raw_input.is_some() => {
            let raw = cli.raw_input.as_deref().context("raw input path")?;
            let curve = histogram::packer::read_blob(raw)
                .with_context(|| format!("Failed to read raw curve {}", raw.display()))?;
            write_histogram(&cli, &curve)
        }
        OutputType::Histogram => {
            let curve = load_curve(&mut cli)?;
            write_histogram(&cli, &curve.values)
        }
        OutputType::Raw => {
            let curve = load_curve(&mut cli)?;
            let path = cli.output.join("raw.f32");
            histogram::packer::write_blob(&path, &curve.values)
                .with_context(|| format!("Failed to write raw curve {}", path.display()))
        }
        OutputType::Frames => {
            if cli.raw_input.is_some() {
                anyhow::bail!("--raw-input only applies to --output-type histogram");
            }
            let curve = load_curve(&mut cli)?;
            render_frames(&cli, &templates_root, &curve)
        }
    }
}

/// Decode and analyse the input track, or produce the demo curve.
fn load_curve(cli: &mut Cli) -> Result<IntensityCurve> {
    if cli.demo {
        log::info!("Demo mode: fixed curve, {}fps", DEMO_FRAMERATE);
        cli.framerate = DEMO_FRAMERATE;
        return Ok(IntensityCurve::demo());
    }

    let input = cli.input.as_ref().context("Input audio file is required (or pass --demo)")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    log::info!("pulseframe - beat-synchronized frame generator");
    log::info!("Input: {}", input.display());
    log::info!("Decoding audio...");
    let audio_data = audio::decode::decode_audio(input)
        .and_then(|audio| audio.resample(audio::decode::ANALYSIS_SAMPLE_RATE))
        .context("Decode stage failed")?;

    let analyzer = IntensityAnalyzer::new(audio_data);
    log::info!(
        "Duration: {:.2}s ({}s rounded), {}Hz",
        analyzer.duration_secs(),
        analyzer.duration(),
        analyzer.sample_rate()
    );
    analyzer
        .analyze(&cli.analysis_params())
        .with_context(|| format!("Analysis of {} failed", input.display()))
}

fn write_histogram(cli: &Cli, curve: &[f32]) -> Result<()> {
    log::info!("Downsampling {} values into {} bins...", curve.len(), cli.bins);
    let bins = histogram::downsample(curve, cli.bins).context("Histogram stage failed")?;
    let path = cli.output.join("histogram.f32");
    histogram::packer::write_blob(&path, &bins)
        .with_context(|| format!("Failed to write histogram {}", path.display()))
}

fn render_frames(cli: &Cli, templates_root: &Path, curve: &IntensityCurve) -> Result<()> {
    let timing = FrameTiming::new(curve.duration(), cli.framerate, curve.sample_rate)
        .context("Frame timing")?;
    log::info!(
        "Total frames: {} ({}x{} @ {}fps)",
        timing.total_frames,
        cli.width,
        cli.height,
        timing.framerate
    );

    log::info!("Building render cache...");
    let compositor = match cli.mode {
        Mode::Procedural => Compositor::Procedural(build_procedural(cli)?),
        Mode::Sequence => {
            Compositor::Sequence(build_sequence(cli, templates_root, curve, &timing)?)
        }
    };
    let cache = RenderCache::new(timing, &cli.output, compositor);

    let report = render::pipeline::synthesize(&cache, curve, cli.jobs(), !cli.quiet)
        .context("Frame synthesis failed")?;
    report.log_summary();

    if let Some(video) = &cli.video {
        let audio = match (&cli.input, cli.demo) {
            (Some(input), false) => input,
            _ => anyhow::bail!("--video needs an input audio file"),
        };
        if !report.failed.is_empty() {
            log::warn!("Encoding stops at the first missing frame; the video may be truncated");
        }
        let encoder = FfmpegEncoder::new(
            &cli.output,
            cache.timing.digits,
            audio,
            video,
            EncodeSettings {
                framerate: cache.timing.framerate,
                codec: cli.codec.clone(),
                pix_fmt: cli.pix_fmt.clone(),
                crf: cli.crf,
                bitrate: cli.bitrate.clone(),
            },
        );
        encoder.encode().context("Encode stage failed")?;
        log::info!("Done: {}", video.display());
    }
    Ok(())
}

fn load_cover(cli: &Cli) -> Result<image::RgbaImage> {
    let path = cli.avatar.as_ref().context("--avatar is required for this mode")?;
    let cover = image::open(path)
        .with_context(|| format!("Failed to load avatar {}", path.display()))?;
    Ok(cover.to_rgba8())
}

fn load_title(cli: &Cli) -> Result<Option<TitleBlock>> {
    if cli.track_name.is_none() && cli.username.is_none() {
        return Ok(None);
    }
    let Some(font) = &cli.font else {
        log::warn!("Track name or username given without --font; skipping title text");
        return Ok(None);
    };
    let load = |size| {
        TextOverlay::from_file(font, size)
            .with_context(|| format!("Failed to load font {}", font.display()))
    };
    Ok(Some(TitleBlock {
        track: cli.track_name.clone().unwrap_or_default(),
        author: cli.username.clone().unwrap_or_default(),
        track_font: load(25.0)?,
        author_font: load(22.0)?,
    }))
}

fn build_procedural(cli: &Cli) -> Result<ProceduralCompositor> {
    let cover = load_cover(cli)?;
    let shade = match &cli.shade {
        Some(path) => Some(
            image::open(path)
                .with_context(|| format!("Failed to load shade {}", path.display()))?
                .to_rgba8(),
        ),
        None => None,
    };
    let settings = ProceduralSettings {
        width: cli.width,
        height: cli.height,
        avatar_size: cli.avatar_size,
        avatar_y: cli.avatar_y,
        corner_radius: cli.corner_radius,
        blur_radius: cli.blur_radius,
    };
    ProceduralCompositor::new(&cover, shade, &settings, load_title(cli)?)
        .context("Invalid procedural settings")
}

fn build_sequence(
    cli: &Cli,
    templates_root: &Path,
    curve: &IntensityCurve,
    timing: &FrameTiming,
) -> Result<SequenceCompositor> {
    let renderer = CommandRenderer::new(&cli.engine);
    let settings = RenderSettings {
        width: cli.width,
        height: cli.height,
        engine: cli.render_engine.clone(),
        device: cli.render_device.clone(),
        samples: cli.samples,
    };

    let needs_render = [&cli.scene_dir, &cli.user_info_dir]
        .iter()
        .any(|dir| dir.is_none())
        || (cli.overlay_dir.is_none() && cli.overlay_template.is_some());
    let assets = if needs_render && cli.avatar.is_some() {
        let cover = load_cover(cli)?;
        let card = load_title(cli)?.map(|title| title.card(cli.width, cli.height));
        let assets_dir = cli.work_dir.join("assets");
        templates::engine::stage_assets(&assets_dir, &cover, cli.blur_radius, card.as_ref())
            .context("Failed to stage template assets")?
    } else {
        JobAssets::default()
    };

    let mut rng = fastrand::Rng::new();
    let mut layer_dir = |kind: LayerKind,
                         dir: &Option<PathBuf>,
                         template: Option<&str>|
     -> Result<Option<PathBuf>> {
        if let Some(dir) = dir {
            return Ok(Some(dir.clone()));
        }
        let Some(requested) = template else {
            return Ok(None);
        };
        let id = loader::resolve_template_id(templates_root, kind, requested, &mut rng)?;
        let template = loader::load_template(templates_root, kind, &id)
            .with_context(|| format!("Failed to load {} template", kind.label()))?;
        let out = templates::render_layer(&renderer, &template, &settings, &cli.work_dir, &assets)
            .with_context(|| format!("Rendering {} template '{}' failed", kind.label(), id))?;
        Ok(Some(out))
    };

    // scene and user-info are required: without a template they are picked at random
    let random = Some(loader::RANDOM_TEMPLATE);
    let scene_template = cli.scene_template.as_deref().or(random);
    let user_info_template = cli.user_info_template.as_deref().or(random);
    let scene_dir = layer_dir(LayerKind::Scene, &cli.scene_dir, scene_template)?
        .context("Sequence mode needs a scene layer")?;
    let user_info_dir = layer_dir(LayerKind::UserInfo, &cli.user_info_dir, user_info_template)?
        .context("Sequence mode needs a user-info layer")?;
    let overlay_dir =
        layer_dir(LayerKind::Overlay, &cli.overlay_dir, cli.overlay_template.as_deref())?;

    let layers = SequenceLayers {
        scene: LayerSequence::scan(LayerKind::Scene.label(), &scene_dir)?,
        user_info: LayerSequence::scan(LayerKind::UserInfo.label(), &user_info_dir)?,
        overlay: overlay_dir
            .map(|dir| LayerSequence::scan(LayerKind::Overlay.label(), &dir))
            .transpose()?,
    };

    let intro = if cli.no_intro {
        IntroPhase::Disabled
    } else {
        IntroPhase::Reversed {
            frames: cli.intro_frames.unwrap_or(layers.scene.len()),
        }
    };

    let frame_intensity = sequence::bucket_intensities(curve, timing.total_frames);
    Ok(SequenceCompositor::new(layers, intro, cli.overlay_opacity, frame_intensity))
}

fn print_templates(root: &Path) -> Result<()> {
    println!("Templates in {}:", root.display());
    for kind in LayerKind::ALL {
        println!("{}:", kind.label());
        let ids = loader::list_templates(root, kind)?;
        if ids.is_empty() {
            println!("  (none)");
        }
        for id in &ids {
            match loader::load_template(root, kind, id) {
                Ok(t) => println!(
                    "  {:<20} {:<24} {}",
                    id, t.manifest.display_name, t.manifest.description
                ),
                Err(_) => println!("  {}", id),
            }
        }
    }
    Ok(())
}
