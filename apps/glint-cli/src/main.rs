use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use glint_assets::{AssetStore, import_path};
use glint_environment::{
    EnvironmentLoader, LoadOutcome, PrefilterConfig, bake_lightformers, studio_lightformers,
};
use glint_render::{DebugTextRenderer, RenderView, Renderer};
use glint_scene::{ModelState, compose};
use glint_settings::{StudioPreset, ViewerSettings};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "glint-cli", about = "CLI tool for glint models and environments")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the built-in option tables
    Info,
    /// Compose the scene for a settings file and print it
    Describe {
        /// Settings YAML; defaults are used when omitted
        #[arg(short, long)]
        settings: Option<PathBuf>,
        /// Model to place in the scene
        #[arg(short, long)]
        model: Option<PathBuf>,
    },
    /// Run the environment fallback loader for one file
    ProbeEnv {
        /// Environment file name, e.g. dawn.hdr
        file: String,
        /// Extra search directory
        #[arg(long = "asset-dir")]
        asset_dirs: Vec<PathBuf>,
    },
    /// Print the structure of a .glb model
    Inspect {
        model: PathBuf,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Bake a studio lightformer rig to a Radiance HDR file
    BakeStudio {
        /// default, disco, sunset or night
        preset: String,
        out: PathBuf,
        /// Equirect width in pixels, at most 16384
        #[arg(short, long, default_value = "1024")]
        width: u32,
    },
}

fn info() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "glint-cli v{}", env!("CARGO_PKG_VERSION"));
    let _ = writeln!(out, "hdr environments: {}", glint_settings::HDR_OPTIONS.join(", "));
    let _ = writeln!(out, "panoramas: {}", glint_settings::PANORAMA_OPTIONS.join(", "));
    let presets: Vec<&str> = StudioPreset::ALL.iter().map(|p| p.label()).collect();
    let _ = writeln!(out, "studio presets: {}", presets.join(", "));
    out
}

fn describe(settings: Option<&Path>, model: Option<&Path>) -> Result<String> {
    let settings = match settings {
        Some(path) => ViewerSettings::load(path)
            .with_context(|| format!("reading settings from {}", path.display()))?,
        None => ViewerSettings::default(),
    };
    let model = match model {
        Some(path) => {
            let mut store = AssetStore::new();
            let (id, asset) = store.load_path(path)?;
            Some(ModelState::new(id, asset))
        }
        None => None,
    };
    let scene = compose(&settings, model.as_ref());
    let mut out = DebugTextRenderer::new().render(&scene, &RenderView::for_scene(&scene));
    let _ = writeln!(out, "{}", scene.summary());
    Ok(out)
}

fn probe_env(file: &str, asset_dirs: Vec<PathBuf>) -> String {
    let loader = EnvironmentLoader::new(asset_dirs, PrefilterConfig::default());
    let mut out = String::new();
    match loader.load(file) {
        LoadOutcome::Loaded { path, environment } => {
            let base = environment.levels().first();
            let _ = writeln!(out, "loaded {}", path.display());
            if let Some(base) = base {
                let _ = writeln!(
                    out,
                    "prefiltered: {} levels, base {}x{}",
                    environment.level_count(),
                    base.width,
                    base.height
                );
            }
        }
        LoadOutcome::Fallback { color, attempts } => {
            for attempt in &attempts {
                let _ = writeln!(out, "  {}: {}", attempt.path.display(), attempt.error);
            }
            let _ = writeln!(out, "fallback color {color} after {} attempts", attempts.len());
        }
    }
    out
}

fn inspect(path: &Path, json: bool) -> Result<String> {
    let model = import_path(path).with_context(|| format!("importing {}", path.display()))?;
    let summary = model.summary();
    if json {
        return Ok(serde_json::to_string_pretty(&summary)?);
    }
    let mut out = String::new();
    let _ = writeln!(out, "{}", summary.name);
    let _ = writeln!(
        out,
        "nodes={} meshes={} materials={} vertices={} triangles={}",
        summary.nodes, summary.meshes, summary.materials, summary.vertices, summary.triangles
    );
    let [x0, y0, z0] = summary.bounds_min;
    let [x1, y1, z1] = summary.bounds_max;
    let _ = writeln!(
        out,
        "bounds=({x0:.3}, {y0:.3}, {z0:.3})..({x1:.3}, {y1:.3}, {z1:.3})"
    );
    for (i, name) in summary.animations.iter().enumerate() {
        let _ = writeln!(out, "animation {i}: {name}");
    }
    Ok(out)
}

fn parse_preset(name: &str) -> Result<StudioPreset> {
    let name = name.to_ascii_lowercase();
    let found = StudioPreset::ALL.into_iter().find(|p| {
        let key = format!("{p:?}").to_ascii_lowercase();
        key == name || p.label().eq_ignore_ascii_case(&name)
    });
    match found {
        Some(preset) => Ok(preset),
        None => bail!("unknown studio preset {name:?}"),
    }
}

/// Widest studio bake the CLI accepts; the equirect holds `width * width / 2` pixels.
const MAX_BAKE_WIDTH: u32 = 16384;

fn bake_studio(preset: &str, out: &Path, width: u32) -> Result<String> {
    let preset = parse_preset(preset)?;
    if width > MAX_BAKE_WIDTH {
        bail!("bake width {width} exceeds the maximum of {MAX_BAKE_WIDTH}");
    }
    let width = width.max(8);
    let rig = studio_lightformers(preset);
    let image = bake_lightformers(&rig.forms, rig.background, width);
    image
        .write_hdr(out)
        .with_context(|| format!("writing {}", out.display()))?;
    Ok(format!(
        "baked {} ({} lightformers) to {} at {}x{}\n",
        preset.label(),
        rig.forms.len(),
        out.display(),
        image.width,
        image.height
    ))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let out = match cli.command {
        Commands::Info => info(),
        Commands::Describe { settings, model } => describe(settings.as_deref(), model.as_deref())?,
        Commands::ProbeEnv { file, asset_dirs } => probe_env(&file, asset_dirs),
        Commands::Inspect { model, json } => inspect(&model, json)?,
        Commands::BakeStudio { preset, out, width } => bake_studio(&preset, &out, width)?,
    };
    print!("{out}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_assets::EquirectImage;

    #[test]
    fn info_lists_tables() {
        let out = info();
        assert!(out.contains("dawn.hdr"));
        assert!(out.contains("Disco"));
    }

    #[test]
    fn describe_defaults() {
        let out = describe(None, None).unwrap();
        assert!(out.contains("/dawn.hdr"));
        assert!(out.contains("controls=orbit"));
    }

    #[test]
    fn describe_reads_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.yaml");
        let mut settings = ViewerSettings::default();
        settings.use_first_person_camera = true;
        settings.save(&path).unwrap();
        let out = describe(Some(&path), None).unwrap();
        assert!(out.contains("controls=first-person"));
    }

    #[test]
    fn probe_reports_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let out = probe_env("nowhere.hdr", vec![dir.path().to_path_buf()]);
        assert!(out.contains("fallback color #121212"));
        assert!(out.contains(&dir.path().join("nowhere.hdr").display().to_string()));
    }

    #[test]
    fn probe_finds_file_in_asset_dir() {
        let dir = tempfile::tempdir().unwrap();
        let name = "probe-test-gradient.hdr";
        EquirectImage::from_fn(32, 16, |d| [d.x.abs(), d.y.abs(), 0.5])
            .write_hdr(dir.path().join(name))
            .unwrap();
        let out = probe_env(name, vec![dir.path().to_path_buf()]);
        assert!(out.starts_with("loaded"), "{out}");
    }

    #[test]
    fn inspect_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.glb");
        std::fs::write(&path, b"glTF but not really").unwrap();
        assert!(inspect(&path, false).is_err());
    }

    #[test]
    fn preset_names() {
        assert_eq!(parse_preset("disco").unwrap(), StudioPreset::Disco);
        assert_eq!(parse_preset("Studio").unwrap(), StudioPreset::Default);
        assert_eq!(parse_preset("DEFAULT").unwrap(), StudioPreset::Default);
        assert!(parse_preset("club").is_err());
    }

    #[test]
    fn bake_writes_hdr() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sunset.hdr");
        let msg = bake_studio("sunset", &out, 64).unwrap();
        assert!(msg.contains("64x32"));
        let image = EquirectImage::open(&out).unwrap();
        assert_eq!((image.width, image.height), (64, 32));
    }

    #[test]
    fn bake_rejects_oversized_width() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("huge.hdr");
        let err = bake_studio("default", &out, u32::MAX).unwrap_err();
        assert!(err.to_string().contains("exceeds"), "{err}");
        assert!(bake_studio("default", &out, MAX_BAKE_WIDTH + 1).is_err());
        assert!(!out.exists());
    }
}
