//! # ModelDock Demo
//!
//! Trains a regression on the bundled diabetes dataset, publishes it to a
//! model store as the next version of the `diabetes-boosting-demo` domain,
//! and reads the version history back.

#![allow(clippy::print_stdout)]

mod model;

use anyhow::{Context, Result};
use clap::Parser;
use mdock::prelude::{Logger, ModelStore, StoreConfig, load_config};
use std::path::PathBuf;

/// Domain the demo publishes into.
const DOMAIN: &str = "diabetes-boosting-demo";

#[derive(Debug, Parser)]
#[command(name = "mdock-demo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train a diabetes regression and publish it to a model store")]
struct Cli {
    /// Configuration file naming the backend to publish to. Without it the
    /// loader falls back to `mdock.*` in the working directory plus
    /// `MDOCK__*` environment variables.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Publish into a directory-backed store at this path, ignoring any
    /// configuration file.
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Keep the intermediate archive file after the upload.
    #[arg(long)]
    keep_archive: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log = Logger::builder().name(env!("CARGO_PKG_NAME")).init()?;

    let store = match cli.root {
        Some(root) => {
            tokio::fs::create_dir_all(&root).await.context("Failed to create the store root")?;
            ModelStore::filesystem(root).await?
        },
        None => {
            let config: StoreConfig = load_config(cli.config.as_deref())
                .context("Critical: Configuration is malformed")?;
            ModelStore::connect(config).await?
        },
    };

    let trained = model::train().context("Model training failed")?;

    let archive = store.create_archive(&trained).await?;
    let record = store.upload(DOMAIN, archive.path()).await?;
    println!("{}", record.to_json()?);

    let history = store.versions(DOMAIN).await?;
    println!(
        "Domain '{DOMAIN}' now has {} version(s) on {} at {}",
        history.len(),
        store.provider(),
        store.root()
    );

    if cli.keep_archive {
        println!("Archive kept at {}", archive.path().display());
    } else {
        tokio::fs::remove_file(archive.path())
            .await
            .context("Failed to remove the intermediate archive")?;
    }

    Ok(())
}
