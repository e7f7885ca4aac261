//! Rhizome CLI — ingest a notes folder into the vector and media stores.
//!
//! Usage:
//!   rhizome ingest --in-folder <dir> [--outfile-vector-db <path>] [--outfile-image-store <path>]

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rhizome::{
    IngestOptions, IngestionOrchestrator, MediaStore, Settings, VectorStore, VoyageEmbedder,
};

#[derive(Parser)]
#[command(name = "rhizome", version, about = "Markdown vault ingestion and retrieval engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a folder of markdown notes into the local stores
    Ingest {
        /// Folder containing markdown files
        #[arg(long)]
        in_folder: PathBuf,
        /// Output vector store document (defaults to LOCAL_VECTOR_DB_PATH)
        #[arg(long)]
        outfile_vector_db: Option<PathBuf>,
        /// Output image store document (defaults to LOCAL_IMAGE_STORE_PATH)
        #[arg(long)]
        outfile_image_store: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::from_env().context("loading settings from environment")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Ingest {
            in_folder,
            outfile_vector_db,
            outfile_image_store,
        } => {
            let vector_path = outfile_vector_db.unwrap_or(settings.local_vector_db_path);
            let image_path = outfile_image_store.unwrap_or(settings.local_image_store_path);

            let mut vector = VectorStore::open(&vector_path)
                .with_context(|| format!("opening vector store {}", vector_path.display()))?;
            let mut media = MediaStore::open(&image_path)
                .with_context(|| format!("opening image store {}", image_path.display()))?;
            let embedder = VoyageEmbedder::new(settings.voyage_ai_api_key);

            let mut orchestrator = IngestionOrchestrator::new(
                &embedder,
                &mut vector,
                &mut media,
                IngestOptions::default(),
            )?;
            let report = orchestrator.ingest(&in_folder).await?;

            println!(
                "Processed {} files ({} modified, {} deleted) into {} new chunks",
                report.total_files,
                report.modified_files,
                report.deleted_notes,
                report.chunks_created
            );
            println!(
                "Found {} relationships across {} folder clusters",
                report.relationships, report.clusters
            );
        }
    }

    Ok(())
}
