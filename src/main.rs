use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;
use vra_resource::resource::NetworkInterface;
use vra_resource::resource::action::{
    ACTION_DESTROY, ACTION_POWER_OFF, ACTION_POWER_ON, ACTION_SHUTDOWN,
};
use vra_resource::vra::http::format_vra_error;
use vra_resource::{Config, PollPolicy, RequestHandle, ResourceHandle, VraClient, VraError};

/// Lifecycle actions for vRA catalog resources
#[derive(Parser, Debug)]
#[command(name = "vra", version, about, long_about = None)]
struct Args {
    /// vRA appliance URL (overrides VRA_URL and the config file)
    #[arg(long)]
    url: Option<String>,

    /// Bearer token (overrides VRA_TOKEN and the config file)
    #[arg(long)]
    token: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show a resource by id
    Show { id: String },
    /// Find the first resource whose name contains NAME (case-insensitive)
    Find { name: String },
    /// List the actions available on a resource
    Actions { id: String },
    /// Power the machine on
    PowerOn(ActionArgs),
    /// Power the machine off
    PowerOff(ActionArgs),
    /// Shut the guest OS down
    Shutdown(ActionArgs),
    /// Destroy the resource
    Destroy(ActionArgs),
    /// Wait for the machine to report IP addresses
    Ips {
        id: String,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Show the state of a request
    Request { id: String },
    /// Update the config file and print the stored settings
    Config(ConfigArgs),
}

#[derive(ClapArgs, Debug, Default)]
struct ConfigArgs {
    /// Appliance URL to store
    #[arg(long)]
    base_url: Option<String>,

    /// Bearer token to store
    #[arg(long)]
    save_token: Option<String>,

    /// Verify the appliance TLS certificate
    #[arg(long)]
    verify_tls: Option<bool>,

    /// Seconds between polls
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Page size for resource listing
    #[arg(long)]
    page_size: Option<u32>,
}

impl ConfigArgs {
    /// Merge the given settings into `config`; returns whether anything changed
    fn apply(&self, config: &mut Config) -> bool {
        let before = config.clone();
        if let Some(url) = &self.base_url {
            config.base_url = Some(url.clone());
        }
        if let Some(token) = &self.save_token {
            config.token = Some(token.clone());
        }
        if let Some(verify) = self.verify_tls {
            config.verify_tls = verify;
        }
        if let Some(secs) = self.poll_interval {
            config.poll_interval_secs = secs.max(1);
        }
        if let Some(size) = self.page_size {
            config.page_size = size.max(1);
        }
        *config != before
    }
}

#[derive(ClapArgs, Debug)]
struct ActionArgs {
    id: String,

    /// Poll the created request until it completes
    #[arg(long)]
    wait: bool,

    #[command(flatten)]
    limits: WaitArgs,
}

#[derive(ClapArgs, Debug)]
struct WaitArgs {
    /// Seconds between polls (defaults to the configured interval)
    #[arg(long)]
    interval: Option<u64>,

    /// Give up after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Give up after this many polls
    #[arg(long)]
    max_attempts: Option<u32>,
}

impl WaitArgs {
    fn policy(&self, config: &Config) -> PollPolicy {
        let mut policy = config.poll_policy();
        if let Some(secs) = self.interval {
            policy = policy.with_interval(Duration::from_secs(secs.max(1)));
        }
        if let Some(secs) = self.timeout {
            policy = policy.with_timeout(Duration::from_secs(secs));
        }
        if let Some(n) = self.max_attempts {
            policy = policy.with_max_attempts(n);
        }
        policy
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    // RUST_LOG narrows per-target levels; the writer caps output at --log-level
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(tracing_level).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("vra started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("vra").join("vra.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".vra").join("vra.log");
    }
    PathBuf::from("vra.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let config = Config::load();

    if let Command::Config(update) = &args.command {
        return run_config(config, update);
    }

    let base_url = config.effective_base_url(args.url.as_deref()).context(
        "No vRA appliance configured. Set VRA_URL, use --url, or add base_url to the config file",
    )?;
    let token = config.effective_token(args.token.as_deref());
    let verify_tls = config.verify_tls && !args.insecure;

    tracing::info!("Using appliance: {}", base_url);

    let client = VraClient::new(&base_url, token, verify_tls)
        .with_context(|| format!("Failed to create client for {}", base_url))?;

    if let Err(err) = run(client, &config, args.command).await {
        tracing::error!("Command failed: {:#}", err);
        if let Some(vra_err) = err.downcast_ref::<VraError>() {
            eprintln!("Error: {}", format_vra_error(vra_err));
            std::process::exit(1);
        }
        return Err(err);
    }

    Ok(())
}

fn run_config(mut config: Config, update: &ConfigArgs) -> Result<()> {
    if update.apply(&mut config) {
        let path = config.save()?;
        tracing::info!("Saved config to {:?}", path);
        println!("Saved {}", path.display());
    }

    print_json(&json!({
        "baseUrl": config.base_url,
        "token": config.token.as_ref().map(|_| "<set>"),
        "verifyTls": config.verify_tls,
        "pollIntervalSecs": config.poll_interval_secs,
        "pageSize": config.page_size,
    }))
}

async fn run(client: VraClient, config: &Config, command: Command) -> Result<()> {
    match command {
        Command::Show { id } => {
            let resource = ResourceHandle::by_id(client, &id).await?;
            print_json(&summary(&resource))
        }
        Command::Find { name } => {
            match ResourceHandle::by_name_paged(client, &name, config.page_size).await? {
                Some(resource) => print_json(&summary(&resource)),
                None => {
                    println!("No resource matching '{}'", name);
                    Ok(())
                }
            }
        }
        Command::Actions { id } => {
            let mut resource = ResourceHandle::by_id(client, &id).await?;
            let actions: Vec<_> = resource
                .actions()
                .await?
                .unwrap_or_default()
                .iter()
                .map(|op| json!({"id": op.id, "name": op.name}))
                .collect();
            print_json(&json!(actions))
        }
        Command::PowerOn(action) => run_action(client, config, action, ACTION_POWER_ON).await,
        Command::PowerOff(action) => run_action(client, config, action, ACTION_POWER_OFF).await,
        Command::Shutdown(action) => run_action(client, config, action, ACTION_SHUTDOWN).await,
        Command::Destroy(action) => run_action(client, config, action, ACTION_DESTROY).await,
        Command::Ips { id, wait } => {
            let resource = ResourceHandle::by_id(client, &id).await?;
            match resource.wait_for_ip_addresses(&wait.policy(config)).await? {
                Some(addresses) => print_json(&json!(addresses)),
                None => {
                    println!("Resource {} has no network interfaces", id);
                    Ok(())
                }
            }
        }
        Command::Request { id } => {
            let mut request = RequestHandle::new(client, id);
            request.refresh().await?;
            print_json(&request_summary(&request))
        }
        Command::Config(update) => run_config(config.clone(), &update),
    }
}

async fn run_action(client: VraClient, config: &Config, args: ActionArgs, name: &str) -> Result<()> {
    let mut resource = ResourceHandle::by_id(client, &args.id).await?;
    let mut request = resource.submit_named_action(name).await?;
    println!("Submitted '{}' for {} as request {}", name, resource.id(), request.id());

    if args.wait {
        request.wait_until_completed(&args.limits.policy(config)).await?;
        print_json(&request_summary(&request))?;
        if request.is_failed() {
            anyhow::bail!("Request {} failed", request.id());
        }
    }

    Ok(())
}

fn summary(resource: &ResourceHandle) -> serde_json::Value {
    json!({
        "id": resource.id(),
        "name": resource.name(),
        "description": resource.description(),
        "status": resource.status(),
        "type": resource.resource_type(),
        "vm": resource.is_vm(),
        "machineStatus": resource.machine_status().ok(),
        "tenant": resource.tenant_name(),
        "subtenant": resource.subtenant_name(),
        "catalogItem": resource.catalog_name(),
        "owners": resource.owner_names().ok(),
        "networkInterfaces": resource
            .network_interfaces()
            .map(|nics| nics.iter().map(nic_summary).collect::<Vec<_>>()),
    })
}

fn nic_summary(nic: &NetworkInterface) -> serde_json::Value {
    nic.entries()
        .iter()
        .map(|(key, value)| json!({"key": key, "value": value}))
        .collect()
}

fn request_summary(request: &RequestHandle) -> serde_json::Value {
    json!({
        "id": request.id(),
        "state": request.state(),
        "phase": request.phase(),
        "completionState": request.completion_state(),
        "completionDetails": request.completion_details(),
    })
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_args_apply_only_given_settings() {
        let mut config = Config::default();
        let update = ConfigArgs {
            base_url: Some("https://vra.example.com".to_string()),
            poll_interval: Some(0),
            ..Default::default()
        };

        assert!(update.apply(&mut config));
        assert_eq!(config.base_url.as_deref(), Some("https://vra.example.com"));
        assert_eq!(config.poll_interval_secs, 1);
        assert!(config.verify_tls);
        assert_eq!(config.token, None);
    }

    #[test]
    fn test_config_args_without_settings_change_nothing() {
        let mut config = Config::default();
        assert!(!ConfigArgs::default().apply(&mut config));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_subcommand_parses() {
        let args = Args::try_parse_from(["vra", "config", "--verify-tls", "false", "--page-size", "50"]).unwrap();
        let Command::Config(update) = args.command else {
            panic!("expected config subcommand");
        };
        assert_eq!(update.verify_tls, Some(false));
        assert_eq!(update.page_size, Some(50));
    }
}
