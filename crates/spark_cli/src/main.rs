//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `spark_core` linkage.
//! - Inspect or dump a store file without the Flutter shell.

use chrono::Utc;
use clap::{Parser, Subcommand};
use spark_core::{
    default_log_level, flame_summary_now, frozen_tasks, init_logging, root_tasks, write_dump,
    SqliteKvStorage, TaskStore,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "spark_cli")]
#[command(version)]
#[command(about = "Inspect Spark task stores; prints ping and version with no command")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Absolute directory for rolling log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print task, chain and freezer counts plus today's flame
    Summary {
        /// SQLite store file
        db_path: PathBuf,
    },
    /// Write every task to `dump_<date>.json` in OUT_DIR
    Dump {
        /// SQLite store file
        db_path: PathBuf,
        out_dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    if let Some(log_dir) = &cli.log_dir {
        init_logging(default_log_level(), &log_dir.to_string_lossy())
            .map_err(|err| format!("failed to init logging: {err}"))?;
    }

    match cli.command {
        None => {
            println!("spark_core ping={}", spark_core::ping());
            println!("spark_core version={}", spark_core::core_version());
            Ok(())
        }
        Some(Commands::Summary { db_path }) => summary(&db_path),
        Some(Commands::Dump { db_path, out_dir }) => dump(&db_path, &out_dir),
    }
}

fn open_store(db_path: &Path) -> Result<TaskStore<SqliteKvStorage>, String> {
    let storage = SqliteKvStorage::open(db_path)
        .map_err(|err| format!("failed to open `{}`: {err}", db_path.display()))?;
    Ok(TaskStore::open(storage))
}

fn summary(db_path: &Path) -> Result<(), String> {
    let store = open_store(db_path)?;
    let tasks = store.tasks();
    let flame = flame_summary_now(tasks);

    println!("tasks={}", tasks.len());
    println!("chains={}", root_tasks(tasks).len());
    println!("frozen={}", frozen_tasks(tasks).len());
    println!(
        "completed_today={} intensity={} phase={} streak_days={}",
        flame.completed_today,
        flame.intensity,
        flame.phase.label(),
        flame.streak_days
    );
    Ok(())
}

fn dump(db_path: &Path, out_dir: &Path) -> Result<(), String> {
    let store = open_store(db_path)?;
    let path = write_dump(out_dir, store.tasks(), Utc::now().date_naive())
        .map_err(|err| err.to_string())?;
    println!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use clap::error::ErrorKind;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn no_arguments_selects_smoke_output() {
        let cli = Cli::parse_from(["spark_cli"]);
        assert!(cli.command.is_none());
        assert!(cli.log_dir.is_none());
    }

    #[test]
    fn summary_takes_db_path() {
        let cli = Cli::parse_from(["spark_cli", "summary", "spark.sqlite3"]);
        match cli.command {
            Some(Commands::Summary { db_path }) => {
                assert_eq!(db_path, PathBuf::from("spark.sqlite3"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn dump_takes_db_path_and_out_dir() {
        let cli = Cli::parse_from(["spark_cli", "dump", "spark.sqlite3", "/tmp/out"]);
        match cli.command {
            Some(Commands::Dump { db_path, out_dir }) => {
                assert_eq!(db_path, PathBuf::from("spark.sqlite3"));
                assert_eq!(out_dir, PathBuf::from("/tmp/out"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn log_dir_is_accepted_after_subcommand() {
        let cli = Cli::parse_from(["spark_cli", "summary", "db", "--log-dir", "/var/log/spark"]);
        assert_eq!(cli.log_dir, Some(PathBuf::from("/var/log/spark")));
    }

    #[test]
    fn help_flag_renders_help_instead_of_failing() {
        let err = Cli::try_parse_from(["spark_cli", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);

        let err = Cli::try_parse_from(["spark_cli", "dump", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn version_flag_is_handled() {
        let err = Cli::try_parse_from(["spark_cli", "--version"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
    }

    #[test]
    fn dump_without_out_dir_is_rejected() {
        let err = Cli::try_parse_from(["spark_cli", "dump", "spark.sqlite3"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["spark_cli", "frobnicate"]).is_err());
    }
}
