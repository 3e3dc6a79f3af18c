use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use strata_fileset::{
    index_of_compacted, Compactor, DistributedCompactor, FilesetConfig, PooledWorker, Storage,
};
use strata_store::{FileEntry, InMemoryMetadataStore};
use strata_types::FilesetId;
use tokio_util::sync::CancellationToken;

use crate::cli::*;

#[derive(Serialize)]
struct LayerReport {
    id: String,
    sizes: Vec<i64>,
    compacted: bool,
    break_index: usize,
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => FilesetConfig::load(path)?,
        None => FilesetConfig::default(),
    };
    match cli.command {
        Command::Check(args) => cmd_check(config, args, &cli.format),
        Command::Compact(args) => cmd_compact(config, args, &cli.format).await,
        Command::Config => {
            print!("{}", toml::to_string(&config)?);
            Ok(())
        }
    }
}

fn open_storage(mut config: FilesetConfig, args: &LayerArgs) -> anyhow::Result<Arc<Storage>> {
    if let Some(level_factor) = args.level_factor {
        config.level_factor = level_factor;
    }
    let store = Arc::new(InMemoryMetadataStore::new());
    Ok(Arc::new(Storage::new(store, config)?))
}

/// Write one single-file layer per requested size.
fn write_layers(storage: &Storage, sizes: &[u64]) -> anyhow::Result<Vec<FilesetId>> {
    let ttl = storage.config().default_ttl();
    sizes
        .iter()
        .enumerate()
        .map(|(i, size)| {
            let path = format!("/layer-{i}");
            let size = usize::try_from(*size)
                .with_context(|| format!("layer {i} size {size} does not fit in memory"))?;
            let data = vec![0u8; size.saturating_sub(path.len())];
            storage
                .write(vec![FileEntry::new(path, data)], ttl)
                .with_context(|| format!("writing layer {i}"))
        })
        .collect()
}

fn report(storage: &Storage, id: FilesetId) -> anyhow::Result<LayerReport> {
    let flat = storage.flatten(&[id])?;
    let mut layers = Vec::with_capacity(flat.len());
    for layer in &flat {
        match storage.get(layer)? {
            strata_store::Metadata::Primitive(primitive) => layers.push(primitive),
            other => anyhow::bail!("layer {layer} is a {}", other.kind()),
        }
    }
    Ok(LayerReport {
        id: id.to_hex(),
        sizes: layers.iter().map(|p| p.size_bytes).collect(),
        compacted: storage.is_compacted(&id)?,
        break_index: index_of_compacted(storage.level_factor(), &layers),
    })
}

fn print_report(label: &str, report: &LayerReport, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            let status = if report.compacted {
                "compacted".green()
            } else {
                format!("not compacted (breaks at {})", report.break_index).yellow()
            };
            println!("{} {} {}", label.bold(), report.id[..8].dimmed(), status);
            for (i, size) in report.sizes.iter().enumerate() {
                println!("  L{i}: {size} bytes");
            }
        }
    }
    Ok(())
}

fn cmd_check(config: FilesetConfig, args: LayerArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let storage = open_storage(config, &args)?;
    let ids = write_layers(&storage, &args.sizes)?;
    let composed = storage.compose(&ids, storage.config().default_ttl())?;
    print_report("layers", &report(&storage, composed)?, format)
}

async fn cmd_compact(
    mut config: FilesetConfig,
    args: CompactArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    if let Some(max_fan_in) = args.max_fan_in {
        config.max_fan_in = max_fan_in;
    }
    if let Some(workers) = args.workers {
        config.worker_concurrency = workers;
    }
    let storage = open_storage(config, &args.layers)?;
    let ids = write_layers(&storage, &args.layers.sizes)?;
    let ttl = storage.config().default_ttl();
    let cancel = CancellationToken::new();

    let before = storage.compose(&ids, ttl)?;
    print_report("before", &report(&storage, before)?, format)?;

    let id = if args.distributed {
        let pool = Arc::new(PooledWorker::spawn(
            storage.clone(),
            storage.config().worker_concurrency,
        ));
        let compactor = DistributedCompactor::from_config(storage.clone(), pool)?;
        compactor.compact(&cancel, ids, ttl).await?
    } else {
        storage.compact(&cancel, ids, ttl).await?
    };
    tracing::info!(id = %id.short_hex(), distributed = args.distributed, "compaction complete");
    print_report("after", &report(&storage, id)?, format)
}
