use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use uuid::Uuid;

use restage::detector::{ObjectDetector, OnnxModel};
use restage::exporter::{self, ImageStore};
use restage::{EditorSession, SceneCompositor};

#[derive(Parser)]
#[command(name = "restage")]
#[command(about = "Detect objects in an image, restage or remove them, and export the result")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// Path to a YOLOv8 ONNX detection model
    /// (defaults to ~/.cache/restage/yolov8n.onnx)
    #[arg(long, value_name = "MODEL")]
    model: Option<PathBuf>,

    /// Write the composited scene to this PNG file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Remove every detected object with this label (repeatable)
    #[arg(long, value_name = "LABEL")]
    remove: Vec<String>,

    /// Shift matching objects, e.g. --shift person:40,-25 (repeatable)
    #[arg(long, value_name = "LABEL:DX,DY")]
    shift: Vec<String>,

    /// Supersampling factor applied when flattening
    #[arg(long, default_value_t = 3)]
    pixel_ratio: u32,

    /// Persistence API base URL; when set, the result is POSTed there
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Session credential sent as the x-auth-token header
    #[arg(long, value_name = "TOKEN", default_value = "")]
    auth_token: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "warn" }),
    )
    .init();

    let model_path = match args.model {
        Some(path) => path,
        None => OnnxModel::default_model_path()?,
    };
    let detector = Arc::new(ObjectDetector::from_model_file(model_path));
    let mut session = EditorSession::new(detector)
        .with_compositor(SceneCompositor::new(args.pixel_ratio));

    let bytes = std::fs::read(&args.image_path)
        .with_context(|| format!("failed to read {}", args.image_path.display()))?;
    let (width, height) = session.load_image(&bytes)?;
    println!("Image loaded: {}x{}", width, height);

    let count = session.detect_objects().await?;
    println!("Detected {} objects", count);
    for (i, object) in session.store().objects().iter().enumerate() {
        println!(
            "  {}: {} at ({:.0}, {:.0}) {}x{}",
            i + 1,
            object.label,
            object.x,
            object.y,
            object.width,
            object.height
        );
    }

    for (label, dx, dy) in parse_shifts(&args.shift)? {
        let targets: Vec<(Uuid, f32, f32)> = session
            .store()
            .objects()
            .iter()
            .filter(|o| o.label == label)
            .map(|o| (o.id, o.x + dx, o.y + dy))
            .collect();
        if targets.is_empty() {
            println!("No objects labeled '{}' to shift", label);
        }
        for (id, x, y) in targets {
            session.move_object(id, x, y)?;
        }
    }
    for label in &args.remove {
        let targets: Vec<Uuid> = session
            .store()
            .objects()
            .iter()
            .filter(|o| &o.label == label)
            .map(|o| o.id)
            .collect();
        if targets.is_empty() {
            println!("No objects labeled '{}' to remove", label);
        }
        for id in targets {
            session.delete_object(id)?;
        }
    }

    let flattened = session.composite().context("no image loaded")?;
    if let Some(output) = &args.output {
        exporter::save_locally(&flattened, output)?;
        println!("Saved composited image to {}", output.display());
    }
    if let Some(api_url) = &args.api_url {
        let store = ImageStore::new(api_url.clone(), args.auth_token.clone());
        let receipt = store.send(&flattened).await?;
        println!(
            "Image sent successfully ({})",
            receipt.id.as_deref().unwrap_or("stored")
        );
    }

    Ok(())
}

fn parse_shifts(specs: &[String]) -> anyhow::Result<Vec<(String, f32, f32)>> {
    specs
        .iter()
        .map(|spec| {
            let (label, delta) = spec
                .split_once(':')
                .with_context(|| format!("expected LABEL:DX,DY, got '{spec}'"))?;
            let (dx, dy) = delta
                .split_once(',')
                .with_context(|| format!("expected LABEL:DX,DY, got '{spec}'"))?;
            Ok((
                label.to_string(),
                dx.trim().parse::<f32>()?,
                dy.trim().parse::<f32>()?,
            ))
        })
        .collect()
}
