use anyhow::Result;
use binexplorer_client::HttpQueryClient;
use binexplorer_config::{
    apply_backend_url_override, config_path_from_env, load_from_path, log_file_path,
};
use binexplorer_core::{CoreError, RemoteQueryClient};
use binexplorer_ui::Ui;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = match parse_cli_flags(std::env::args().skip(1))? {
        CliInvocation::Help => {
            print_cli_help();
            return Ok(());
        }
        CliInvocation::Run(flags) => flags,
    };

    let config_path = match cli.config_path {
        Some(path) => path,
        None => config_path_from_env()?,
    };
    let mut config = load_from_path(&config_path)?;
    if let Some(base_url) = cli.backend_url.as_deref() {
        apply_backend_url_override(&mut config, base_url)?;
    }
    init_file_logging(&log_file_path(&config_path))?;

    let backend = config.backend_runtime();
    let client: Arc<dyn RemoteQueryClient> = Arc::new(HttpQueryClient::new(&backend)?);
    tracing::info!(
        config = %config_path.display(),
        endpoint = %backend.base_url,
        "binexplorer starting"
    );

    let mut ui = Ui::init()?;
    ui.run(client, config.selector_runtime(), config.ui_view())?;
    Ok(())
}

fn init_file_logging(log_path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|error| {
                CoreError::Configuration(format!(
                    "failed to create binexplorer log directory '{}': {error}",
                    parent.display()
                ))
            })?;
        }
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|error| {
            CoreError::Configuration(format!(
                "failed to open binexplorer log file '{}': {error}",
                log_path.display()
            ))
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .init();

    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
struct CliFlags {
    config_path: Option<PathBuf>,
    backend_url: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum CliInvocation {
    Run(CliFlags),
    Help,
}

fn parse_cli_flags(args: impl IntoIterator<Item = String>) -> Result<CliInvocation, CoreError> {
    let mut flags = CliFlags::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args.next().ok_or_else(|| {
                    CoreError::Configuration(
                        "Missing value after --config. Use --config <path>.".to_owned(),
                    )
                })?;
                flags.config_path = Some(PathBuf::from(read_cli_value(&arg, value)?));
            }
            "--backend-url" => {
                let value = args.next().ok_or_else(|| {
                    CoreError::Configuration(
                        "Missing value after --backend-url. Use --backend-url <http://host:port>."
                            .to_owned(),
                    )
                })?;
                flags.backend_url = Some(read_cli_value(&arg, value)?);
            }
            "--help" | "-h" => return Ok(CliInvocation::Help),
            value if value.starts_with("--") => {
                return Err(CoreError::Configuration(format!(
                    "Unknown flag '{value}'. Run with --help for valid flags."
                )));
            }
            unknown => {
                return Err(CoreError::Configuration(format!(
                    "Unexpected argument '{unknown}'. Run with --help for valid flags."
                )));
            }
        }
    }

    Ok(CliInvocation::Run(flags))
}

fn print_cli_help() {
    println!("Usage: binexplorer [--config <path>] [--backend-url <url>]");
    println!();
    println!("  --config <path>       Read configuration from <path> (default: $BINEXPLORER_CONFIG or ~/.config/binexplorer/config.toml)");
    println!("  --backend-url <url>   Override the analysis server address from the config file");
    println!("  --help                Show this help message");
}

fn read_cli_value(flag: &str, value: String) -> Result<String, CoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::Configuration(format!(
            "Flag '{flag}' requires a non-empty value."
        )));
    }
    Ok(value.to_owned())
}
