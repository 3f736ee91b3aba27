use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use cubescene_common::{ScenePreset, SceneConfig};
use cubescene_render::{FrameComposer, OverlayHandoff, RecordingBackend};
use cubescene_scene::SceneState;
use glam::Mat4;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cubescene-cli", about = "Headless tools for the cube scene")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML scene configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Object layout to use
    #[arg(long, global = true, value_enum)]
    preset: Option<PresetArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the effective scene configuration
    Info,
    /// Run frames against a recording backend and print the draw log
    Simulate {
        /// Number of frames to compose
        #[arg(short, long, default_value = "2")]
        frames: u32,
        /// Seconds between frames
        #[arg(long, default_value = "0.016", value_parser = parse_dt)]
        dt: f64,
        /// Leave the FPS overlay out
        #[arg(long)]
        no_overlay: bool,
    },
    /// Print the camera's view and projection matrices
    Camera,
}

#[derive(Clone, Copy, ValueEnum)]
enum PresetArg {
    SpinningCube,
    TwoCubes,
}

impl From<PresetArg> for ScenePreset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::SpinningCube => ScenePreset::SpinningCube,
            PresetArg::TwoCubes => ScenePreset::TwoCubes,
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<SceneConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            SceneConfig::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => SceneConfig::default(),
    };
    if let Some(preset) = cli.preset {
        config.preset = preset.into();
    }
    Ok(config)
}

/// A frame step must be a positive, finite number of seconds.
fn parse_dt(s: &str) -> Result<f64, String> {
    let dt: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if dt.is_finite() && dt > 0.0 {
        Ok(dt)
    } else {
        Err(format!("dt must be a positive finite number of seconds, got {s}"))
    }
}

/// Rows of `m` in row-vector layout (`v' = v * M`), the convention the scene
/// composes world x view x projection in. glam stores column vectors, so
/// these are glam's columns.
fn row_vector_rows(m: Mat4) -> [[f32; 4]; 4] {
    m.to_cols_array_2d()
}

fn print_matrix(name: &str, m: Mat4) {
    println!("{name}:");
    for r in row_vector_rows(m) {
        println!("  [{:>9.4} {:>9.4} {:>9.4} {:>9.4}]", r[0], r[1], r[2], r[3]);
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Info => {
            println!("cubescene-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("preset: {:?}", config.preset);
            println!(
                "window: \"{}\" {}x{}",
                config.window.title, config.window.width, config.window.height
            );
            let cam = &config.camera;
            println!(
                "camera: eye={} target={} fov_y={:.4} near={} far={}",
                cam.eye, cam.target, cam.fov_y, cam.near, cam.far
            );
            println!(
                "light: direction={} ambient={:?} diffuse={:?}",
                config.light.direction, config.light.ambient, config.light.diffuse
            );
            println!(
                "overlay: enabled={} timeout={}ms",
                config.overlay.enabled, config.overlay.sync_timeout_ms
            );
            println!("angular rate: {} rad/s", config.angular_rate);
        }
        Commands::Simulate {
            frames,
            dt,
            no_overlay,
        } => {
            let mut scene = SceneState::from_preset(config.preset, config.angular_rate);
            let composer = FrameComposer::new(&config)?;
            let mut backend = RecordingBackend::with_capacity(scene.object_count());

            // Nominal rate for the overlay text; there is no wall clock here.
            let text = format!("FPS: {}", (1.0 / dt).round() as u32);

            let handoff = (config.overlay.enabled && !no_overlay).then(|| {
                OverlayHandoff::new(
                    composer.overlay_image_for(&text),
                    Duration::from_millis(config.overlay.sync_timeout_ms),
                )
            });

            println!(
                "Simulating {frames} frames of {:?} ({} objects), dt={dt}",
                config.preset,
                scene.object_count()
            );

            for frame in 0..frames {
                scene.update(dt);
                let overlay = handoff.as_ref().map(|h| (h, text.as_str()));
                let report = composer.draw_frame(&mut backend, &scene, overlay)?;
                tracing::debug!(
                    frame,
                    angle = scene.angle(),
                    objects = report.objects_drawn,
                    overlay = ?report.overlay,
                    "frame composed"
                );
            }

            print!("{backend}");
            println!(
                "frames={} final angle={:.4} rad",
                backend.frames(),
                scene.angle()
            );
        }
        Commands::Camera => {
            let composer = FrameComposer::new(&config)?;
            let camera = composer.camera();
            println!(
                "eye={} target={} aspect={:.4}",
                camera.eye, camera.target, camera.aspect
            );
            print_matrix("view", camera.view_matrix());
            print_matrix("projection", camera.projection_matrix());
            print_matrix("view x projection", camera.view_projection());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubescene_render::Camera;
    use glam::Vec3;

    #[test]
    fn dt_must_be_positive_and_finite() {
        assert_eq!(parse_dt("0.25"), Ok(0.25));
        for bad in ["nan", "inf", "-inf", "0", "-0.1", "abc"] {
            assert!(parse_dt(bad).is_err(), "accepted {bad}");
        }
        assert!(Cli::try_parse_from(["cubescene-cli", "simulate", "--dt", "NaN"]).is_err());
        assert!(Cli::try_parse_from(["cubescene-cli", "simulate", "--dt", "0.5"]).is_ok());
    }

    #[test]
    fn translation_sits_in_last_row() {
        let rows = row_vector_rows(Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(rows[3], [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn printed_view_projection_is_view_times_projection() {
        let camera = Camera::default();
        let view = Mat4::from_cols_array_2d(&row_vector_rows(camera.view_matrix())).transpose();
        let proj =
            Mat4::from_cols_array_2d(&row_vector_rows(camera.projection_matrix())).transpose();
        // `view` and `proj` now hold the row-vector matrices with rows as rows.
        let product = view * proj;
        let printed = row_vector_rows(camera.view_projection());
        for (i, row) in printed.iter().enumerate() {
            let expected = product.row(i).to_array();
            for (a, b) in row.iter().zip(expected) {
                assert!((a - b).abs() < 1e-5, "row {i}: {row:?} vs {expected:?}");
            }
        }
    }
}
