use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use s3_file_adapter::infrastructure::storage;
use s3_file_adapter::{
    AdapterConfig, AdapterOptions, FileDescriptor, NamingKind, S3Adapter, SchemaFields,
    StorageDefaults,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file with adapter options (bucket, path, headers, acl, ...)
    #[arg(short, long)]
    options: Option<PathBuf>,

    /// Storage path prefix, must be absolute (e.g. /images)
    #[arg(short, long)]
    path: Option<String>,

    /// Filename strategy: random, original or content-hash
    #[arg(long)]
    naming: Option<NamingKind>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a local file and print its stored record
    Upload {
        file: PathBuf,

        /// Content type; detected from the file contents when omitted
        #[arg(long)]
        mime_type: Option<String>,

        /// Original name to record; defaults to the file's own name
        #[arg(long)]
        name: Option<String>,
    },
    /// Print the public URL for a stored key
    Url { key: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "s3_file_adapter=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut options: AdapterOptions = match &args.options {
        Some(path) => serde_json::from_str(&tokio::fs::read_to_string(path).await?)?,
        None => AdapterOptions::default(),
    };
    if args.naming.is_some() {
        options.naming = args.naming;
    }
    if args.path.is_some() {
        options.path = args.path.clone();
    }

    let config = AdapterConfig::build(options, StorageDefaults::from_env(), SchemaFields {
        filename: true,
        bucket: true,
        path: true,
        etag: true,
    })?;
    let client = storage::setup_storage(&config).await;
    let adapter = S3Adapter::new(config, client);

    match args.command {
        Command::Upload {
            file,
            mime_type,
            name,
        } => {
            let mime_type = match mime_type {
                Some(m) => m,
                None => infer::get_from_path(&file)?
                    .map(|t| t.mime_type().to_string())
                    .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string()),
            };
            let original_name = name.unwrap_or_else(|| {
                file.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });

            let descriptor =
                FileDescriptor::from_local_file(&file, mime_type, original_name).await?;
            let stored = adapter.upload_file(&descriptor).await?;
            let url = adapter.get_file_url(&stored)?;
            info!("Public URL: {}", url);

            println!("{}", serde_json::to_string_pretty(&adapter.record(&stored)?)?);
            println!("{}", url);
        }
        Command::Url { key } => {
            let descriptor = FileDescriptor {
                key: Some(key),
                ..Default::default()
            };
            println!("{}", adapter.get_file_url(&descriptor)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naming_flag_parses_strategy() {
        let args =
            Args::try_parse_from(["s3-file-adapter", "--naming", "content-hash", "url", "a.txt"])
                .unwrap();
        assert_eq!(args.naming, Some(NamingKind::ContentHash));

        let args = Args::try_parse_from(["s3-file-adapter", "url", "a.txt"]).unwrap();
        assert_eq!(args.naming, None);

        let rejected =
            Args::try_parse_from(["s3-file-adapter", "--naming", "sequential", "url", "a.txt"]);
        assert!(rejected.is_err());
    }
}
