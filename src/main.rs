//! bitrise-cache - CI cache step
//!
//! CLI entry point that dispatches to the restore or save phase.

use bitrise_cache::action::{ActionEnv, ActionOutput, ActionState, FileState, Inputs, StateStore};
use bitrise_cache::cli::commands::{self, StepContext};
use bitrise_cache::cli::{Cli, LogFormat};
use bitrise_cache::config::ConfigManager;
use bitrise_cache::error::CacheResult;
use bitrise_cache::key::KeyPrefix;
use bitrise_cache::phase::Phase;
use bitrise_cache::provider::LocalProvider;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CacheResult<()> {
    let cli = Cli::parse();
    let env = ActionEnv::from_env();
    let inputs = Inputs::from_env(&env);

    // Initialize logging: info by default, debug with -v or the verbose input
    let filter = if cli.verbose > 0 || inputs.verbose {
        EnvFilter::new("bitrise_cache=debug")
    } else {
        EnvFilter::new("bitrise_cache=info")
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time();
    match cli.log_format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }

    // Load configuration
    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let config = config_manager.load().await?;

    let mut state: Box<dyn StateStore> = match cli.state_file {
        Some(ref path) => {
            debug!("Using state file {}", path.display());
            Box::new(FileState::open(path)?)
        }
        None => Box::new(ActionState::new(&env)),
    };

    let phase = Phase::detect(cli.phase.as_deref(), state.as_ref())?;
    debug!("Running {} phase", phase);

    let cache_dir = cli
        .cache_dir
        .clone()
        .or_else(|| config.storage.dir.clone())
        .unwrap_or_else(LocalProvider::default_dir);
    debug!("Cache directory: {}", cache_dir.display());

    let provider = LocalProvider::new(cache_dir)
        .with_retry_delay(Duration::from_millis(config.restore.retry_delay_ms));
    let mut outputs = ActionOutput::new(&env);

    let mut ctx = StepContext {
        config: &config,
        provider: &provider,
        state: state.as_mut(),
        outputs: &mut outputs,
        prefix: KeyPrefix::resolve(config.keys.scope, &env),
    };

    // Dispatch to phase
    let result = match phase {
        Phase::Restore => commands::restore(&inputs, &mut ctx)
            .await
            .map(|outcome| debug!("Restore finished: {:?}", outcome)),
        Phase::Save => commands::save(&inputs, &mut ctx)
            .await
            .map(|outcome| debug!("Save finished: {:?}", outcome)),
    };

    result.map_err(|e| e.in_phase(phase))
}
