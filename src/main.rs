//! netconf-automate CLI entrypoint.
//!
//! This is the main entrypoint for the netconf-automate command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use netconf_automate::cli::{Cli, Commands, OutputFormat, OutputFormatter};
use netconf_automate::config::{AutomationConfig, ConfigParser, ConfigValidator, NotifierBackend};
use netconf_automate::device::{ConfigChangeSet, SshConnector};
use netconf_automate::error::{AutomationError, ConfigError, Result};
use netconf_automate::input::{StdinSource, prompt_for_address, resolve_address};
use netconf_automate::notify::{LogNotifier, Notifier, WebexNotifier};
use netconf_automate::workflow::WorkflowOrchestrator;

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Exit code for a run that finished with a FAILURE outcome.
const EXIT_WORKFLOW_FAILURE: u8 = 2;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose, cli.output == OutputFormat::Json);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system. Logs go to stderr, as JSON lines when
/// command output is JSON.
fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<ExitCode> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Validate { warnings } => cmd_validate(cli.config.as_deref(), warnings, &formatter),
        Commands::Plan { detailed } => Ok(cmd_plan(detailed, &formatter)),
        Commands::Run { target } => cmd_run(cli.config.as_deref(), target, &formatter).await,
        Commands::Snapshot { target } => {
            cmd_snapshot(cli.config.as_deref(), target, &formatter).await
        }
    }
}

/// Writes a command result to stdout.
fn emit(text: &str) {
    let mut stdout = std::io::stdout().lock();
    let _ = writeln!(stdout, "{text}");
}

/// Writes config and environment templates.
fn cmd_init(path: &Path, force: bool) -> Result<ExitCode> {
    info!("Initializing netconf-automate in: {}", path.display());

    let config_path = path.join("netconf-automate.yaml");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    // Check if files exist
    if !force && config_path.exists() {
        eprintln!("Configuration file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(ExitCode::SUCCESS);
    }

    // Create directory if needed
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    let config_template = include_str!("../templates/netconf-automate.yaml");
    std::fs::write(&config_path, config_template)?;
    eprintln!("Created: {}", config_path.display());

    let env_template = include_str!("../templates/.env.example");
    std::fs::write(&env_path, env_template)?;
    eprintln!("Created: {}", env_path.display());

    // Keep secrets out of version control
    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        if !existing.lines().any(|line| line.trim() == ".env") {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n# netconf-automate\n.env")?;
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, ".env\n")?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nInitialized successfully!");
    eprintln!("Next steps:");
    eprintln!("  1. Copy .env.example to .env and fill in device and Webex credentials");
    eprintln!("  2. Edit netconf-automate.yaml with your device defaults");
    eprintln!("  3. Run 'netconf-automate validate --warnings' to check your configuration");
    eprintln!("  4. Run 'netconf-automate plan' to review the change set");
    eprintln!("  5. Run 'netconf-automate run' to apply it");

    Ok(ExitCode::SUCCESS)
}

/// Validate configuration.
fn cmd_validate(
    config_path: Option<&Path>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let result = ConfigValidator::new().check(&config);

    emit(&formatter.format_validation(&result, &config, show_warnings));

    if result.is_valid() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Show the change set.
fn cmd_plan(detailed: bool, formatter: &OutputFormatter) -> ExitCode {
    let change_set = ConfigChangeSet::standard();
    emit(&formatter.format_plan(&change_set, detailed));
    ExitCode::SUCCESS
}

/// Apply, verify and notify.
async fn cmd_run(
    config_path: Option<&Path>,
    target: Option<String>,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    ConfigValidator::new().validate(&config)?;

    let address = resolve_target(target, &config)?;
    let target = config.target(&address)?;
    debug!("Resolved target: {target:?}");

    let connector = SshConnector::from_config(&config.device);
    let notifier = build_notifier(&config)?;
    let change_set = ConfigChangeSet::standard();

    let report = WorkflowOrchestrator::new(&connector, &notifier, &change_set)
        .run(&target)
        .await;

    emit(&formatter.format_report(&report));

    if report.outcome.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_WORKFLOW_FAILURE))
    }
}

/// Print the current configuration.
async fn cmd_snapshot(
    config_path: Option<&Path>,
    target: Option<String>,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;

    let result = ConfigValidator::new().check(&config);
    if let Some(error) = result.errors.iter().find(|e| e.field.starts_with("device.")) {
        return Err(ConfigError::validation(error.message.clone(), error.field.clone()).into());
    }

    let address = resolve_target(target, &config)?;
    let target = config.target(&address)?;

    let connector = SshConnector::from_config(&config.device);
    let change_set = ConfigChangeSet::standard();

    let snapshot = WorkflowOrchestrator::new(&connector, &LogNotifier, &change_set)
        .capture_snapshot(&target)
        .await?;

    emit(&formatter.format_snapshot(&target, &snapshot));
    Ok(ExitCode::SUCCESS)
}

/// Loads `.env` and the configuration.
fn load_config(config_path: Option<&Path>) -> Result<AutomationConfig> {
    let base = config_path
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    let parser = ConfigParser::new().with_base_path(base);
    parser.load_dotenv()?;
    parser.load(config_path)
}

/// Uses `--target` if given, otherwise prompts on the terminal.
fn resolve_target(target: Option<String>, config: &AutomationConfig) -> Result<String> {
    let default = config.device.default_address.as_str();

    let address = match target {
        Some(raw) => resolve_address(&raw, default)?,
        None => prompt_for_address(&mut StdinSource, default)?,
    };

    info!("Target device: {address}");
    Ok(address)
}

/// Builds the configured notification backend.
fn build_notifier(config: &AutomationConfig) -> Result<Box<dyn Notifier>> {
    match config.notifier.backend {
        NotifierBackend::Webex => {
            let (token, room) = config.webex_credentials()?;
            let notifier = WebexNotifier::new(&config.notifier.api_url, token, room)
                .map_err(AutomationError::Notify)?;
            Ok(Box::new(notifier))
        }
        NotifierBackend::Log => Ok(Box::new(LogNotifier)),
    }
}
