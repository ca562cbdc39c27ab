use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use recall_core::{ArcFaceEngine, FaceData, Gallery, GalleryError};
use recall_worker::{Config, InboundEvent, OutboundEvent, Session, GALLERY_FILE_NAME};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "recall", about = "recall face recognition CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run still images through a recognition session
    Recognize {
        /// Images to process, in order
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// JSON array with one face record (box + five landmarks) per image
        #[arg(short, long)]
        faces: PathBuf,
        /// Match only; never enroll new identities
        #[arg(long)]
        freeze: bool,
        /// Save the gallery afterwards
        #[arg(long)]
        save: bool,
    },
    /// List identities in the stored gallery
    List,
    /// Rename an identity in the stored gallery
    Rename {
        from: String,
        to: String,
    },
    /// Remove every identity from the stored gallery
    Clear,
    /// Show configuration and gallery status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let gallery_path = config.gallery_dir.join(GALLERY_FILE_NAME);

    match cli.command {
        Commands::Recognize {
            images,
            faces,
            freeze,
            save,
        } => recognize(&config, &images, &faces, freeze, save).await?,
        Commands::List => {
            let Some(gallery) = load_stored(&gallery_path).await? else {
                println!("No gallery saved");
                return Ok(());
            };
            for name in gallery.distinct_names() {
                let count = gallery.entries().iter().filter(|e| e.name == name).count();
                println!("{name}\t{count} descriptor(s)");
            }
        }
        Commands::Rename { from, to } => {
            let Some(mut gallery) = load_stored(&gallery_path).await? else {
                bail!("no gallery saved at {}", gallery_path.display());
            };
            let mut renamed = 0;
            for index in 0..gallery.len() {
                if gallery.name(index) == Some(from.as_str()) && gallery.rename(index, &to) {
                    renamed += 1;
                }
            }
            if renamed == 0 {
                bail!("no identity named {from:?}");
            }
            gallery.save(&gallery_path).await?;
            println!("Renamed {renamed} descriptor(s) from {from} to {to}");
        }
        Commands::Clear => {
            Gallery::new().save(&gallery_path).await?;
            println!("Gallery cleared");
        }
        Commands::Status => {
            let model_path = config.arcface_model_path();
            let descriptors = load_stored(&gallery_path).await?.map(|g| g.len());
            let status = serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "model": model_path,
                "model_present": Path::new(&model_path).exists(),
                "gallery": gallery_path.display().to_string(),
                "descriptors": descriptors,
                "similarity_threshold": config.similarity_threshold,
                "descriptors_per_identity": config.descriptors_per_identity,
                "activation_key": config.activation_key.is_some(),
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}

async fn load_stored(path: &Path) -> Result<Option<Gallery>> {
    match Gallery::load(path).await {
        Ok(g) => Ok(Some(g)),
        Err(GalleryError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn recognize(
    config: &Config,
    images: &[PathBuf],
    faces_path: &Path,
    freeze: bool,
    save: bool,
) -> Result<()> {
    let faces_json = std::fs::read_to_string(faces_path)
        .with_context(|| format!("reading {}", faces_path.display()))?;
    let faces: Vec<FaceData> =
        serde_json::from_str(&faces_json).context("parsing face records")?;
    if faces.len() != images.len() {
        bail!(
            "{} image(s) but {} face record(s)",
            images.len(),
            faces.len()
        );
    }

    let engine = ArcFaceEngine::load(
        &config.arcface_model_path(),
        config.gallery_dir.clone(),
        config.activation_key.as_deref(),
    )?;
    let mut session = Session::new(config.session());
    session.initialize(engine);

    if let Some(OutboundEvent::GalleryLoaded { names }) =
        session.handle(InboundEvent::LoadGallery).await
    {
        tracing::info!(identities = names.len(), "starting gallery");
    }

    for (path, face) in images.iter().zip(faces) {
        let rgba = image::open(path)
            .with_context(|| format!("decoding {}", path.display()))?
            .to_rgba8();
        let (width, height) = rgba.dimensions();

        session
            .handle(InboundEvent::Resolution { width, height })
            .await;
        let reply = session
            .handle(InboundEvent::SendFrame {
                pixels: rgba.into_raw(),
                face_data: Some(face),
                freeze,
            })
            .await;
        if let Some(OutboundEvent::Recognized { recognized_name }) = reply {
            println!("{}\t{recognized_name}", path.display());
        }
    }

    if save {
        match session.handle(InboundEvent::SaveGallery).await {
            Some(OutboundEvent::GallerySaved) => println!("Gallery saved"),
            _ => bail!("gallery save failed"),
        }
    }

    Ok(())
}
