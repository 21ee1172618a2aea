use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use crossterm::style::Stylize;
use miqctl::config::{Config, Overrides};
use miqctl::miq::auth::Credentials;
use miqctl::miq::client::MiqClient;
use miqctl::miq::http::format_miq_error;
use miqctl::output::{self, render, OutputFormat};
use miqctl::prompt::{AutoConfirm, Confirm, StdinConfirm};
use miqctl::resource::inspect;
use miqctl::resource::migrate::{execute_migration, plan_migration};
use miqctl::resource::quota::{self, QuotaDelta};
use miqctl::resource::{CandidateResource, ResourceKind, ResourceQuery, Resolver};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Resolve, inspect and migrate ManageIQ VM and service metadata
#[derive(Parser, Debug)]
#[command(name = "miqctl", version, about, long_about = None)]
struct Args {
    /// ManageIQ API root, e.g. https://manageiq.local/api
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// API user (defaults to MIQ_USERNAME or the config file)
    #[arg(short, long, global = true)]
    username: Option<String>,

    /// API password (defaults to MIQ_PASSWORD)
    #[arg(long, global = true)]
    password: Option<String>,

    /// Accept self-signed TLS certificates
    #[arg(long, global = true, conflicts_with = "verify_tls")]
    insecure: bool,

    /// Require valid TLS certificates
    #[arg(long, global = true)]
    verify_tls: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    output: OutputFormat,

    /// Answer yes to every confirmation
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
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

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Vm,
    Service,
}

impl From<KindArg> for ResourceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Vm => ResourceKind::Vm,
            KindArg::Service => ResourceKind::Service,
        }
    }
}

/// Which resource a command acts on
#[derive(ClapArgs, Debug)]
struct Target {
    /// VM name (services are found by the name of their VM)
    name: String,

    /// Resource kind
    #[arg(short, long, value_enum, default_value = "vm")]
    kind: KindArg,

    /// VM state: on, off or archived
    #[arg(short, long, default_value = "on")]
    state: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find a VM or service by name
    Resolve {
        #[command(flatten)]
        target: Target,
    },
    /// Show tags and description
    Tags {
        #[command(flatten)]
        target: Target,
    },
    /// Show the operating system of a VM
    Os {
        name: String,
        #[arg(short, long, default_value = "on")]
        state: String,
    },
    /// Show the service attached to a VM and its owner
    Service {
        name: String,
        #[arg(short, long, default_value = "on")]
        state: String,
    },
    /// Assign a tag, e.g. `assign-tag web01 vmtype cloud`
    AssignTag {
        #[command(flatten)]
        target: Target,
        category: String,
        value: String,
    },
    /// Replace the description
    Describe {
        #[command(flatten)]
        target: Target,
        description: String,
    },
    /// Delete a VM or service
    Delete {
        #[command(flatten)]
        target: Target,
    },
    /// Rename a VM's service record to `VM - <NAME>`
    RenameService { name: String },
    /// Tenant quotas
    Quota {
        #[command(subcommand)]
        command: QuotaCommand,
    },
    /// Move metadata from an archived VM onto its live replacement
    Migrate {
        name: String,
        /// Only print what would change
        #[arg(long)]
        dry_run: bool,
    },
    /// Show or change the saved configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum QuotaCommand {
    /// Show quotas of a tenant, e.g. `quota show rsb_ci85262`
    Show { tenant: String },
    /// Grow or shrink quotas by the given amounts
    Update {
        tenant: String,
        /// CPU cores to add (negative to remove)
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        cpu: i64,
        /// Memory in GB to add
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        memory: f64,
        /// Storage in GB to add
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        storage: f64,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective configuration file
    Show,
    /// Set a key: api_url, username, timeout_secs, accept_invalid_certs
    Set { key: String, value: String },
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Cannot open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("miqctl started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("miqctl").join("miqctl.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".miqctl").join("miqctl.log");
    }
    PathBuf::from("miqctl.log")
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    match run(&args).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("{} {}", "Error:".red().bold(), format_miq_error(&err));
            ExitCode::FAILURE
        }
    }
}

fn connect(args: &Args, config: &Config) -> Result<MiqClient> {
    let overrides = Overrides {
        api_url: args.api_url.clone(),
        timeout_secs: args.timeout,
        accept_invalid_certs: match (args.insecure, args.verify_tls) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        },
    };
    let miq_config = config.to_miq_config(&overrides)?;
    let username = config.effective_username(args.username.as_deref());
    let credentials = Credentials::resolve(username.as_deref(), args.password.as_deref())?;

    tracing::info!(
        "Connecting to {} as {}",
        miq_config.api_url,
        credentials.username
    );
    Ok(MiqClient::new(miq_config, credentials)?)
}

async fn resolve_target(
    client: &MiqClient,
    name: &str,
    state: &str,
    kind: ResourceKind,
) -> Result<CandidateResource> {
    let query = ResourceQuery::parse(name, Some(state), kind)?;
    Ok(Resolver::new(client).resolve_one(&query).await?)
}

fn confirmer(args: &Args) -> Box<dyn Confirm> {
    if args.yes {
        Box::new(AutoConfirm(true))
    } else {
        Box::new(StdinConfirm::new())
    }
}

async fn run(args: &Args) -> Result<ExitCode> {
    let mut config = Config::load();

    if let Command::Config { command } = &args.command {
        match command {
            ConfigCommand::Show => {
                println!("{}", render(args.output, &config, |c| {
                    serde_json::to_string_pretty(c).unwrap_or_default()
                })?);
            }
            ConfigCommand::Set { key, value } => {
                config.set_key(key, value)?;
                config.save().context("Failed to save configuration")?;
                println!("{} = {}", key, value);
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    let client = connect(args, &config)?;
    let format = args.output;

    match &args.command {
        Command::Resolve { target } => {
            let query = ResourceQuery::parse(&target.name, Some(&target.state), target.kind.into())?;
            let resolution = Resolver::new(&client).resolve(&query).await?;
            println!("{}", render(format, &resolution, output::resolution_text)?);
            if !resolution.is_found() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Tags { target } => {
            let found = resolve_target(&client, &target.name, &target.state, target.kind.into()).await?;
            let tagged = inspect::get_tags(&client, &found.href).await?;
            println!("{}", render(format, &tagged, output::tags_text)?);
        }
        Command::Os { name, state } => {
            let vm = resolve_target(&client, name, state, ResourceKind::Vm).await?;
            let os = inspect::get_vm_os(&client, &vm.href).await?;
            println!("{}", render(format, &os, output::os_text)?);
        }
        Command::Service { name, state } => {
            let vm = resolve_target(&client, name, state, ResourceKind::Vm).await?;
            let Some(service) = inspect::get_vm_service(&client, &vm.href).await? else {
                println!("{} has {}", vm.name, "NO SERVICE ATTACHED".bold().red());
                return Ok(ExitCode::FAILURE);
            };
            let service_href = service
                .href
                .clone()
                .unwrap_or_else(|| client.resource_url("services", &service.id));
            let owner = inspect::get_service_owner(&client, &service_href).await?;
            let details = serde_json::json!({ "service": service, "owner": owner });
            println!(
                "{}",
                render(format, &details, |_| {
                    format!(
                        "{} has service {}\n{}",
                        vm.name.as_str().bold().green(),
                        service.name.as_str().bold().magenta(),
                        output::owner_text(&owner)
                    )
                })?
            );
        }
        Command::AssignTag {
            target,
            category,
            value,
        } => {
            let found = resolve_target(&client, &target.name, &target.state, target.kind.into()).await?;
            inspect::assign_tag(&client, &config.tag_catalog(), &found.href, category, value).await?;
            println!(
                "{} assigned tag {}",
                found.name,
                value.to_uppercase().bold().blue()
            );
        }
        Command::Describe {
            target,
            description,
        } => {
            let found = resolve_target(&client, &target.name, &target.state, target.kind.into()).await?;
            inspect::update_description(&client, &found.href, description).await?;
            println!("Updated description of {}", found.name);
        }
        Command::Delete { target } => {
            let found = resolve_target(&client, &target.name, &target.state, target.kind.into()).await?;
            let mut confirm = confirmer(args);
            if !confirm.confirm(&format!("Delete {} ({})?", found.name, found.href)) {
                println!("Aborted");
                return Ok(ExitCode::FAILURE);
            }
            inspect::delete_resource(&client, &found.href).await?;
            println!("Deleted {}", found.href);
        }
        Command::RenameService { name } => {
            let service = resolve_target(&client, name, "on", ResourceKind::Service).await?;
            let new_name = inspect::rename_service(&client, &service.href, name).await?;
            println!("Renamed '{}' to '{}'", service.name, new_name.as_str().bold().blue());
        }
        Command::Quota { command } => match command {
            QuotaCommand::Show { tenant } => {
                let href = quota::find_tenant(&client, tenant).await?;
                let quota = quota::get_tenant_quota(&client, &href).await?;
                println!("{}", render(format, &quota, output::quota_text)?);
            }
            QuotaCommand::Update {
                tenant,
                cpu,
                memory,
                storage,
            } => {
                let delta = QuotaDelta {
                    cpu: *cpu,
                    memory_gb: *memory,
                    storage_gb: *storage,
                };
                let href = quota::find_tenant(&client, tenant).await?;
                let current = quota::get_tenant_quota(&client, &href).await?;
                let updates = quota::plan_updates(&current, &delta)?;
                println!("{}", render(format, &updates, |u| output::quota_updates_text(u))?);
                if updates.is_empty() {
                    return Ok(ExitCode::SUCCESS);
                }
                let mut confirm = confirmer(args);
                if !confirm.confirm("Apply quota changes?") {
                    println!("Aborted");
                    return Ok(ExitCode::FAILURE);
                }
                quota::apply_updates(&client, &updates).await?;
            }
        },
        Command::Migrate { name, dry_run } => {
            let plan = plan_migration(&client, name).await?;
            println!("{}", render(format, &plan, output::plan_text)?);
            if *dry_run {
                return Ok(ExitCode::SUCCESS);
            }
            let mut confirm = confirmer(args);
            let report = execute_migration(&client, &plan, confirm.as_mut()).await;
            println!("{}", render(format, &report, output::report_text)?);
            if report.has_failures() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Config { .. } => unreachable!("handled before connecting"),
    }

    Ok(ExitCode::SUCCESS)
}
