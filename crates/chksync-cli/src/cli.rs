use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "chksync",
    about = "chksync: content checksum trees for directory snapshots",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// TOML file with `[tree]` and `[sync]` sections
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build the checksum tree of a directory and print it
    Checksum(ChecksumArgs),
    /// Compare two directory snapshots by checksum
    Diff(DiffArgs),
    /// Simulate a delta transfer from one snapshot to the next
    Sync(SyncArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct ChecksumArgs {
    pub path: PathBuf,
    /// Also list every document
    #[arg(short, long)]
    pub documents: bool,
}

#[derive(Args)]
pub struct DiffArgs {
    pub old: PathBuf,
    pub new: PathBuf,
}

#[derive(Args)]
pub struct SyncArgs {
    /// Snapshot the peer already holds
    pub old: PathBuf,
    /// Snapshot the host now offers
    pub new: PathBuf,
    /// Override `sync.batch_size`
    #[arg(long)]
    pub batch_size: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_checksum() {
        let cli = Cli::try_parse_from(["chksync", "checksum", "./src", "-d"]).unwrap();
        if let Command::Checksum(args) = cli.command {
            assert_eq!(args.path, PathBuf::from("./src"));
            assert!(args.documents);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_diff() {
        let cli = Cli::try_parse_from(["chksync", "diff", "a", "b"]).unwrap();
        if let Command::Diff(args) = cli.command {
            assert_eq!(args.old, PathBuf::from("a"));
            assert_eq!(args.new, PathBuf::from("b"));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_sync_batch_size() {
        let cli = Cli::try_parse_from(["chksync", "sync", "a", "b", "--batch-size", "8"]).unwrap();
        if let Command::Sync(args) = cli.command {
            assert_eq!(args.batch_size, Some(8));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn diff_requires_two_paths() {
        assert!(Cli::try_parse_from(["chksync", "diff", "a"]).is_err());
    }

    #[test]
    fn verbose_counts() {
        let cli = Cli::try_parse_from(["chksync", "-vv", "config"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Config));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "chksync", "config", "--format", "json", "--config", "chksync.toml",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("chksync.toml")));
    }
}
