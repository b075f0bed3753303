mod config;
mod script;
mod shaders;
mod viewer;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use overdrive_assets::{FileImporter, ImageFileDecoder};
use overdrive_gpu::{GraphicsContext, HeadlessContext};
use overdrive_render::{Model, ModelLoader, Shader};
use tracing_subscriber::EnvFilter;

use config::ViewerConfig;
use script::FlyScript;
use viewer::Viewer;

#[derive(Parser)]
#[command(name = "overdrive", about = "Model viewer tools: inspect models and run scripted fly-throughs")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Viewer config (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Load a model and list its meshes and textures
    Inspect {
        /// Model file (.obj, .gltf, .glb)
        model: PathBuf,
    },
    /// Fly the camera through a model for a number of headless frames
    Fly {
        /// Model file (.obj, .gltf, .glb)
        model: PathBuf,
        /// Number of frames to run
        #[arg(short, long, default_value = "120")]
        frames: u32,
        /// Seconds per frame
        #[arg(long, default_value = "0.016")]
        dt: f32,
        /// Input script (JSON); walks forward and pans when omitted
        #[arg(short, long)]
        script: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = ViewerConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Info => {
            println!("overdrive v{}", env!("CARGO_PKG_VERSION"));
            println!("gpu: {}", overdrive_gpu::crate_info());
            println!("assets: {}", overdrive_assets::crate_info());
            println!("render: {}", overdrive_render::crate_info());
            println!("input: {}", overdrive_input::crate_info());
            println!(
                "vertex stride: {} bytes, {} attributes",
                overdrive_render::VERTEX_STRIDE,
                overdrive_render::VERTEX_LAYOUT.len()
            );
        }
        Commands::Inspect { model } => {
            let mut ctx = HeadlessContext::new().with_max_texture_units(config.max_texture_units);
            let loaded = load_model(&mut ctx, &config, &model)?;

            println!("{}", loaded.path().display());
            println!(
                "meshes={} vertices={} triangles={} textures={}",
                loaded.meshes().len(),
                loaded.vertex_count(),
                loaded.triangle_count(),
                loaded.texture_count()
            );
            for (i, mesh) in loaded.meshes().iter().enumerate() {
                let kinds: Vec<String> = mesh.textures().iter().map(|t| t.kind().to_string()).collect();
                println!(
                    "  mesh {i}: vertices={} triangles={} textures=[{}]",
                    mesh.vertex_count(),
                    mesh.triangle_count(),
                    kinds.join(", ")
                );
            }
            for texture in loaded.textures() {
                println!("  texture {:?} {}: {}", texture.id(), texture.kind(), texture.path().display());
            }
            loaded.destroy(&mut ctx);
        }
        Commands::Fly {
            model,
            frames,
            dt,
            script,
        } => {
            let script = match script {
                Some(path) => FlyScript::load(&path)?,
                None => FlyScript::walk_and_pan(frames),
            };
            let mut ctx = HeadlessContext::new().with_max_texture_units(config.max_texture_units);
            let loaded = load_model(&mut ctx, &config, &model)?;
            let shader = build_shader(&mut ctx, &config)?;
            if !shader.is_valid() {
                tracing::warn!("model shader has errors, draws will be empty");
            }

            let mut viewer = Viewer::new(&config);
            let report = viewer.fly(&mut ctx, &shader, &loaded, &script, frames, dt);

            let camera = viewer.camera();
            println!("frames={} draw_calls={}", report.frames, report.draw_calls);
            println!(
                "camera position=({:.3}, {:.3}, {:.3}) yaw={:.2} pitch={:.2} zoom={:.2}",
                camera.position.x,
                camera.position.y,
                camera.position.z,
                camera.yaw(),
                camera.pitch(),
                camera.zoom()
            );

            shader.destroy(&mut ctx);
            loaded.destroy(&mut ctx);
        }
    }

    Ok(())
}

fn load_model(
    ctx: &mut dyn GraphicsContext,
    config: &ViewerConfig,
    path: &Path,
) -> anyhow::Result<Model> {
    let decoder = ImageFileDecoder::new(config.flip_textures);
    let model = ModelLoader::new(&FileImporter, &decoder)
        .with_flags(config.import)
        .with_gamma(config.gamma)
        .load(ctx, path)?;
    Ok(model)
}

fn build_shader(ctx: &mut dyn GraphicsContext, config: &ViewerConfig) -> anyhow::Result<Shader> {
    let shader = match &config.shaders {
        Some(paths) => Shader::from_files(ctx, &paths.vertex, &paths.fragment),
        None => Shader::from_source(ctx, shaders::MODEL_VS, shaders::MODEL_FS),
    };
    shader.context("creating model shader")
}
