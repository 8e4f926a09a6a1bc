use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chksync_store::InMemoryObjectStore;
use chksync_sync::{AssetSource, ChecksumSynchronizer, LocalTransport, SyncConfig, SyncReport};
use chksync_tree::{CancellationToken, TreeConfig};
use colored::Colorize;
use serde_json::json;
use tracing::info;

use crate::build::{build_tree, BuiltTree, TreeSummary};
use crate::cli::*;
use crate::config::CliConfig;
use crate::diff::{diff_trees, Change, TreeDiff};
use crate::snapshot::Solution;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    match cli.command {
        Command::Checksum(args) => cmd_checksum(args, &config, cli.format, &cancel).await,
        Command::Diff(args) => cmd_diff(args, &config, cli.format, &cancel).await,
        Command::Sync(args) => cmd_sync(args, config, cli.format, &cancel).await,
        Command::Config => cmd_config(&config, cli.format),
    }
}

async fn load_and_build(
    path: &Path,
    config: &TreeConfig,
    cancel: &CancellationToken,
) -> anyhow::Result<BuiltTree> {
    let solution = Solution::load(path)?;
    info!(
        root = %solution.root.display(),
        documents = solution.document_count(),
        "loaded snapshot"
    );
    build_tree(solution, config.clone(), cancel)
        .await
        .with_context(|| format!("building checksum tree for {}", path.display()))
}

fn summary_json(summary: &TreeSummary) -> serde_json::Value {
    let projects: serde_json::Map<String, serde_json::Value> = summary
        .projects
        .iter()
        .map(|(name, project)| {
            let documents: serde_json::Map<String, serde_json::Value> = project
                .documents
                .iter()
                .map(|(path, c)| (path.clone(), json!(c.to_hex())))
                .collect();
            let value = json!({ "checksum": project.checksum.to_hex(), "documents": documents });
            (name.clone(), value)
        })
        .collect();
    json!({ "solution": summary.solution.to_hex(), "projects": projects })
}

async fn cmd_checksum(
    args: ChecksumArgs,
    config: &CliConfig,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let built = load_and_build(&args.path, &config.tree, cancel).await?;
    let summary = &built.summary;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&summary_json(summary))?);
        return Ok(());
    }

    println!("{} {}", "solution".bold(), summary.solution.to_hex().yellow());
    println!(
        "  {} projects, {} documents",
        summary.projects.len(),
        summary.document_count()
    );
    for (name, project) in &summary.projects {
        println!(
            "  {} {} ({} documents)",
            project.checksum.short_hex().yellow(),
            name.bold(),
            project.documents.len()
        );
        if args.documents {
            for (path, checksum) in &project.documents {
                println!("    {} {}", checksum.short_hex().dimmed(), path);
            }
        }
    }
    Ok(())
}

async fn cmd_diff(
    args: DiffArgs,
    config: &CliConfig,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let old = load_and_build(&args.old, &config.tree, cancel).await?;
    let new = load_and_build(&args.new, &config.tree, cancel).await?;
    let diff = diff_trees(&old.summary, &new.summary);

    if format == OutputFormat::Json {
        let changes: Vec<_> = diff
            .changes
            .iter()
            .map(|c| json!({ "change": c.label(), "path": c.path() }))
            .collect();
        let value = json!({
            "old": old.summary.solution.to_hex(),
            "new": new.summary.solution.to_hex(),
            "changes": changes,
            "unchanged_projects": diff.unchanged_projects,
            "unchanged_documents": diff.unchanged_documents,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    print_diff(&diff);
    Ok(())
}

fn print_diff(diff: &TreeDiff) {
    if diff.is_empty() {
        println!("{} Snapshots are identical.", "✓".green().bold());
        return;
    }
    for change in &diff.changes {
        let marker = match change {
            Change::Added(_) => "A".green(),
            Change::Removed(_) => "D".red(),
            Change::Modified(_) => "M".yellow(),
        };
        println!("{marker} {}", change.path());
    }
    println!(
        "{} changed, {} unchanged projects skipped, {} unchanged documents",
        diff.changes.len().to_string().bold(),
        diff.unchanged_projects,
        diff.unchanged_documents
    );
}

/// Peer holds `old`; host now serves `new`. Reports what the second sync
/// transferred against a full transfer of `new`.
async fn cmd_sync(
    args: SyncArgs,
    mut config: CliConfig,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    if let Some(batch_size) = args.batch_size {
        anyhow::ensure!(batch_size > 0, "--batch-size must be at least 1");
        config.sync.batch_size = batch_size;
    }
    let old = load_and_build(&args.old, &config.tree, cancel).await?;
    let new = load_and_build(&args.new, &config.tree, cancel).await?;

    let peer = Arc::new(InMemoryObjectStore::new());
    pull(&old, Arc::clone(&peer), &config.sync).await?;
    let delta = pull(&new, Arc::clone(&peer), &config.sync).await?;
    let full = pull(&new, Arc::new(InMemoryObjectStore::new()), &config.sync).await?;

    if format == OutputFormat::Json {
        let value = json!({
            "root": delta.root.to_hex(),
            "objects_received": delta.objects_received,
            "bytes_received": delta.bytes_received,
            "objects_reused": delta.objects_reused,
            "requests": delta.requests,
            "full_bytes": full.bytes_received,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if delta.is_up_to_date() {
        println!("{} Peer is up to date.", "✓".green().bold());
        return Ok(());
    }
    println!("Synchronized {}", delta.root.short_hex().yellow());
    println!("  Objects received: {}", delta.objects_received.to_string().bold());
    println!("  Objects reused: {}", delta.objects_reused);
    println!("  Requests: {}", delta.requests);
    println!(
        "  Bytes: {} of {} for a full transfer ({})",
        delta.bytes_received.to_string().bold(),
        full.bytes_received,
        saved(delta.bytes_received, full.bytes_received).green()
    );
    Ok(())
}

async fn pull(
    host: &BuiltTree,
    store: Arc<InMemoryObjectStore>,
    config: &SyncConfig,
) -> anyhow::Result<SyncReport> {
    let source = AssetSource::new(Arc::clone(&host.tree), host.summary.solution)?;
    let transport = LocalTransport::new(Arc::new(source));
    let report = ChecksumSynchronizer::with_config(store, config.clone())
        .synchronize(&transport)
        .await?;
    Ok(report)
}

fn saved(delta: u64, full: u64) -> String {
    if full == 0 {
        return "nothing to transfer".into();
    }
    let percent = 100.0 * (full.saturating_sub(delta)) as f64 / full as f64;
    format!("{percent:.1}% saved")
}

fn cmd_config(config: &CliConfig, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => print!("{}", config.to_toml()?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(())
}
