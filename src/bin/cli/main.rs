use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use media_store::{
    app::{AppBuilder, AppConfig},
    ImportRequest, MediaService, ObjectRef, StorageProvider, TransformParams,
};
use serde_json::json;
use tokio_util::io::ReaderStream;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Storage is configured from the environment (or `.env`): `STORAGE_PROVIDER`,
/// `AWS_*`, `SEAWEEDFS_*`, `MAX_UPLOAD_SIZE`, `IMPORT_CONCURRENCY` and
/// `IMPORT_TIMEOUT_SECS`.
#[derive(Parser, Debug)]
#[command(name = "media-cli")]
#[command(about = "Upload, transform and import media against S3 or SeaweedFS", long_about = None)]
struct Cli {
    /// Override MAX_UPLOAD_SIZE for this run
    #[arg(long)]
    max_upload_size: Option<u64>,

    /// Override IMPORT_CONCURRENCY for this run
    #[arg(long)]
    import_concurrency: Option<usize>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a local file as a new original
    Upload {
        /// File path to upload
        file: PathBuf,
        /// Name to store under instead of the file's own
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Fetch a transformed derivative of a stored image
    Transform {
        /// Object reference of the source image
        object_ref: String,
        #[command(flatten)]
        params: TransformArgs,
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Delete an object
    Delete {
        /// Object reference
        object_ref: String,
    },

    /// Import remote files by URL
    Import {
        /// URLs to download
        #[arg(required = true)]
        urls: Vec<String>,
        /// Per-file size limit in bytes; defaults to the upload limit
        #[arg(long)]
        max_bytes: Option<u64>,
    },

    /// Generate a time-limited URL for an object
    Presign {
        /// Object reference
        object_ref: String,
        /// Lifetime in seconds
        #[arg(long, default_value = "3600")]
        ttl: u64,
    },

    /// Check connectivity to the storage backend
    Check,
}

#[derive(Args, Debug)]
struct TransformArgs {
    #[arg(short = 'W', long)]
    width: Option<i64>,
    #[arg(short = 'H', long)]
    height: Option<i64>,
    /// contain, cover or fill
    #[arg(long)]
    fit: Option<String>,
    /// center, top, bottom, left or right
    #[arg(long)]
    crop: Option<String>,
    #[arg(short, long)]
    quality: Option<i64>,
    /// jpeg, png or webp
    #[arg(short, long)]
    format: Option<String>,
    /// thumbnail, social, avatar or banner
    #[arg(short, long)]
    preset: Option<String>,
    /// Skip the cache lookup
    #[arg(long)]
    fresh: bool,
}

impl From<TransformArgs> for TransformParams {
    fn from(args: TransformArgs) -> Self {
        TransformParams {
            width: args.width,
            height: args.height,
            fit: args.fit,
            crop: args.crop,
            quality: args.quality,
            format: args.format,
            preset: args.preset,
            fresh: args.fresh,
        }
    }
}

impl Cli {
    fn to_app_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::from_env().context("Invalid configuration")?;
        if let Some(max_upload_size) = self.max_upload_size {
            config.max_upload_size = max_upload_size;
        }
        if let Some(concurrency) = self.import_concurrency {
            config.ingest.concurrency = concurrency;
        }
        Ok(config)
    }

    fn init_logging(&self) -> Result<()> {
        let env_filter = EnvFilter::try_new(&self.log_level)
            .or_else(|_| EnvFilter::try_new("info"))
            .context("Failed to build log filter")?;

        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();

        Ok(())
    }
}

fn parse_ref(raw: &str) -> Result<ObjectRef> {
    ObjectRef::new(raw).with_context(|| format!("Invalid object reference {:?}", raw))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    cli.init_logging()?;

    let config = cli.to_app_config()?;
    info!(backend = config.storage.name(), "Starting media CLI");

    let app = AppBuilder::new()
        .with_config(config)
        .build()
        .context("Failed to build application")?;
    let service = app.media_service;

    match cli.command {
        Commands::Upload { file, name } => {
            let name = match name {
                Some(name) => name,
                None => file
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
                    .context("File path has no usable file name")?,
            };
            let handle = tokio::fs::File::open(&file)
                .await
                .with_context(|| format!("Failed to open {}", file.display()))?;
            let stream = ReaderStream::new(handle).boxed();
            let upload = service
                .upload_original(stream, &name)
                .await
                .context("Upload failed")?;
            print_json(&upload)?;
        }
        Commands::Transform {
            object_ref,
            params,
            output,
        } => {
            let source = parse_ref(&object_ref)?;
            let artifact = service
                .fetch_transformed(&source, params.into())
                .await
                .context("Transform failed")?;
            tokio::fs::write(&output, &artifact.data)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            print_json(&json!({
                "output": output,
                "bytes": artifact.data.len(),
                "content_type": artifact.content_type,
                "cache": artifact.cache_status,
                "cache_control": artifact.cache_control(),
            }))?;
        }
        Commands::Delete { object_ref } => {
            let object_ref = parse_ref(&object_ref)?;
            service
                .delete_object(&object_ref)
                .await
                .context("Delete failed")?;
            print_json(&json!({ "deleted": object_ref }))?;
        }
        Commands::Import { urls, max_bytes } => {
            let requests = urls.into_iter().map(ImportRequest::new).collect();
            let max_bytes = max_bytes.unwrap_or(service.max_upload_size());
            let report = service.bulk_import_from_urls(requests, max_bytes).await;
            print_json(&report)?;
        }
        Commands::Presign { object_ref, ttl } => {
            let object_ref = parse_ref(&object_ref)?;
            let presigned = service
                .presigned_url(&object_ref, Duration::from_secs(ttl))
                .await
                .context("Presign failed")?;
            print_json(&presigned)?;
        }
        Commands::Check => {
            service
                .health_check()
                .await
                .context("Storage backend is not reachable")?;
            print_json(&json!({ "status": "ok", "backend": service.storage().kind().to_string() }))?;
        }
    }

    Ok(())
}
