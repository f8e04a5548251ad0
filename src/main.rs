use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use journal_backup::config::{self, Config};
use journal_backup::managers::backup::{BackupTask, TaskOutcome};
use journal_backup::managers::logging::{self, LoggingConfig};
use journal_backup::utils::exporter::{ExportResult, FileExporter};
use journal_backup::utils::locker::RunLock;
use journal_backup::utils::settings::{FileSettingsStore, SettingsStore};
use journal_backup::{EntryRepository, JsonEntryRepository};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;

#[derive(Parser)]
#[command(name = "journal-backup")]
#[command(about = "Export journal entries to CSV and back them up to Dropbox", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "JOURNAL_BACKUP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export and upload the journal once (meant to be called by a scheduler)
    Run,

    /// Validate configuration file
    Validate,

    /// Write the CSV export to a local file without uploading it
    Export {
        /// Destination of the CSV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Store a Dropbox access token
    Authorize {
        /// Access token issued by Dropbox
        #[arg(long)]
        token: String,
    },

    /// Forget the stored Dropbox authorization
    Revoke,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(config::default_config_path);

    // Validation reports its own errors on the console
    if let Commands::Validate = cli.command {
        logging::init_console_logging();
        return Ok(handle_validate(&config_path));
    }

    let config = config::load_config(&config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;

    // Setup logging with file rotation (must keep guard alive)
    let _log_guard = logging::init_logging(&LoggingConfig::from_config(&config.global))?;

    match cli.command {
        Commands::Run => handle_run(&config).await,
        Commands::Export { output } => handle_export(&config, output).await,
        Commands::Authorize { token } => {
            let settings = FileSettingsStore::new(&config.settings.settings_file);
            settings.set_access_token(token.trim()).await?;
            println!("✓ Dropbox authorization stored");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Revoke => {
            let settings = FileSettingsStore::new(&config.settings.settings_file);
            settings.revoke_authorization().await?;
            println!("✓ Dropbox authorization removed");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate => unreachable!("Validate is handled before config loading"),
    }
}

fn handle_validate(config_path: &std::path::Path) -> ExitCode {
    match config::load_config(config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid: {}", config_path.display());
            println!("  Entries file: {}", config.repository.entries_file.display());
            println!("  Dropbox path: {}", config.dropbox.remote_path);
            if config.notifications.webhook_url.is_empty() {
                println!("  Notifications: log only");
            } else {
                println!("  Notifications: webhook");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Invalid configuration {}: {}", config_path.display(), e);
            ExitCode::FAILURE
        }
    }
}

async fn handle_run(config: &Config) -> Result<ExitCode> {
    // Prevent overlapping runs
    let mut lock = RunLock::open(&config.global.lock_file)?;
    let _guard = lock.try_acquire()?;

    let task = BackupTask::from_config(config)?;

    // Interrupting drops the run, which removes its temporary file
    let outcome = tokio::select! {
        outcome = task.run() => outcome,
        _ = tokio::signal::ctrl_c() => {
            warn!("Backup interrupted");
            TaskOutcome::Failure
        }
    };

    match outcome {
        TaskOutcome::Success => println!("✓ Backup completed successfully"),
        TaskOutcome::Failure => eprintln!("✗ Backup failed"),
    }

    Ok(ExitCode::from(outcome.exit_code() as u8))
}

async fn handle_export(config: &Config, output: PathBuf) -> Result<ExitCode> {
    let repository = JsonEntryRepository::new(&config.repository.entries_file);
    let entries = repository.get_entries().await?;

    let exporter = FileExporter::create(&output)
        .with_context(|| format!("Failed to create {:?}", output))?;

    match exporter.export_to_csv(&entries, &output) {
        ExportResult::Created(file) => {
            println!("✓ Exported {} entries to {}", entries.len(), file.display());
            Ok(ExitCode::SUCCESS)
        }
        ExportResult::Failed(e) => Err(e).context("Export failed"),
    }
}
