use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use waves::config::load_scene_config;
use waves::error_codes::envelope_for;
use waves::font_assets::load_typeface;
use waves::host::{DesktopHost, HostServices};
use waves::scene::render_wallpaper;
use waves::schema::WaveSceneConfig;

#[derive(Debug, Parser)]
#[command(name = "waves")]
#[command(about = "Render mountain-waves wallpapers")]
#[command(version = env!("WAVES_VERSION"))]
struct Cli {
    /// Print failures as a JSON envelope on stdout.
    #[arg(long, global = true)]
    json: bool,
    /// Font used for the color label and poem text.
    #[arg(long, global = true)]
    font: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render a scene config to a PNG file.
    Render {
        config: PathBuf,
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
        #[command(flatten)]
        screen: ScreenArgs,
    },
    /// Render a scene config and set it as the desktop wallpaper.
    Wallpaper {
        config: PathBuf,
        #[command(flatten)]
        screen: ScreenArgs,
        /// Directory for the rendered image (defaults to Downloads).
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Previously rendered wallpaper to delete once the new one is set.
        #[arg(long)]
        replace: Option<PathBuf>,
    },
    /// Validate a scene config without rendering.
    Check { config: PathBuf },
}

#[derive(Debug, Args)]
struct ScreenArgs {
    /// Screen width in pixels.
    #[arg(long)]
    width: u32,
    /// Screen height in pixels.
    #[arg(long)]
    height: u32,
    /// Device pixel ratio; scales the color label.
    #[arg(long, default_value_t = 1.0)]
    density: f32,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Render {
            config,
            output,
            screen,
        } => run_render(config, output, screen, cli.font.as_deref()),
        Commands::Wallpaper {
            config,
            screen,
            output_dir,
            replace,
        } => run_wallpaper(
            config,
            screen,
            output_dir.as_deref(),
            replace.as_deref(),
            cli.font.as_deref(),
        ),
        Commands::Check { config } => run_check(config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if cli.json {
                match serde_json::to_string_pretty(&envelope_for(&error)) {
                    Ok(json) => println!("{json}"),
                    Err(_) => eprintln!("error: {error:#}"),
                }
            } else {
                eprintln!("error: {error:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run_check(config_path: &Path) -> Result<()> {
    let config = load_scene_config(config_path)?;
    println!(
        "OK: {} ({} mode, wave {} '{}', poem: {})",
        config_path.display(),
        if config.is_dark_mode { "dark" } else { "light" },
        config.wave_color,
        config.wave_color_name,
        config
            .poem()
            .map_or_else(|| "none".to_owned(), |poem| format!("「{}」", poem.title))
    );
    Ok(())
}

fn render_png(
    config: WaveSceneConfig,
    screen: &ScreenArgs,
    font: Option<&Path>,
) -> Result<Vec<u8>> {
    if screen.width == 0 || screen.height == 0 {
        bail!(
            "screen size must be positive, got {}x{}",
            screen.width,
            screen.height
        );
    }
    let typeface = load_typeface(font)?;
    pollster::block_on(render_wallpaper(
        config,
        typeface,
        screen.density,
        screen.width,
        screen.height,
    ))
}

fn run_render(
    config_path: &Path,
    output: &Path,
    screen: &ScreenArgs,
    font: Option<&Path>,
) -> Result<()> {
    let config = load_scene_config(config_path)?;
    let png = render_png(config, screen, font)?;
    fs::write(output, &png).with_context(|| format!("failed to write {}", output.display()))?;
    println!("Wrote {}", output.display());
    Ok(())
}

fn run_wallpaper(
    config_path: &Path,
    screen: &ScreenArgs,
    output_dir: Option<&Path>,
    replace: Option<&Path>,
    font: Option<&Path>,
) -> Result<()> {
    let config = load_scene_config(config_path)?;
    let png = render_png(config, screen, font)?;

    let host = match output_dir {
        Some(dir) => DesktopHost::new(dir),
        None => DesktopHost::with_default_dir(),
    };
    let image_path = host.save_image_bytes(&png, "png")?;
    host.set_wallpaper(&image_path)
        .with_context(|| format!("failed to set wallpaper from {}", image_path.display()))?;
    println!("Wallpaper set from {}", image_path.display());

    if let Some(previous) = replace.filter(|previous| *previous != image_path.as_path()) {
        match host.delete_file(previous) {
            Ok(_) => info!(path = %previous.display(), "removed previous wallpaper"),
            Err(error) => warn!("could not remove {}: {error:#}", previous.display()),
        }
    }
    Ok(())
}
