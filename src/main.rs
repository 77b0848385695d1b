use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use stackscout::client::http::status_hint;
use stackscout::config::{Config, Overrides};
use stackscout::inventory::{Collector, Schedule};
use stackscout::resource::{build_generators, get_all_generator_keys, get_generator_def};
use stackscout::{DiscoveryError, VERSION};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Discover provider resources and print them as a normalized inventory
#[derive(Parser, Debug)]
#[command(name = "stackscout", version, about, long_about = None)]
struct Args {
    /// Generators to run, as provider/service (comma separated)
    #[arg(short, long, value_delimiter = ',')]
    services: Vec<String>,

    /// List registered generators and exit
    #[arg(long)]
    list: bool,

    /// AWS region to use
    #[arg(short, long)]
    region: Option<String>,

    /// AWS endpoint override (emulator or signing proxy)
    #[arg(long)]
    endpoint: Option<String>,

    /// Octopus Deploy server URL
    #[arg(long)]
    octopus_server: Option<String>,

    /// Octopus Deploy space id
    #[arg(long)]
    octopus_space: Option<String>,

    /// Serve recorded responses from a JSON or YAML file instead of calling out
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Run generators concurrently
    #[arg(long)]
    parallel: bool,

    /// Stop at the first failing generator
    #[arg(long)]
    fail_fast: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,
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
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

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

    tracing::info!("stackscout {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("stackscout").join("stackscout.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".stackscout").join("stackscout.log");
    }
    PathBuf::from("stackscout.log")
}

fn print_generators() {
    for key in get_all_generator_keys() {
        let Some((provider, service)) = key.split_once('/') else {
            continue;
        };
        let Some(def) = get_generator_def(provider, service) else {
            continue;
        };
        println!("{:<32} {}", key, def.display_name);
        for step in &def.steps {
            println!("    {}", step.kind);
        }
        for unsupported in &def.unsupported {
            println!("    {} (not enumerable: {})", unsupported.kind, unsupported.reason);
        }
    }
}

fn describe(error: &DiscoveryError) -> String {
    match status_hint(error) {
        Some(hint) => format!("{} ({})", error, hint),
        None => error.to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    if args.list {
        print_generators();
        return Ok(ExitCode::SUCCESS);
    }

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    let overrides = Overrides {
        region: args.region.clone(),
        endpoint: args.endpoint.clone(),
        octopus_server: args.octopus_server.clone(),
        octopus_space: args.octopus_space.clone(),
        fixture: args.fixture.clone(),
    };
    let settings = config
        .client_settings(&overrides)
        .context("Failed to resolve client settings")?;

    let services = config.effective_services(&args.services);
    tracing::info!("Using services: {:?}, region: {}", services, settings.aws_region);

    let generators = build_generators(&services, &settings)
        .with_context(|| format!("Failed to prepare generators {}", services.join(",")))?;

    let schedule = if args.parallel || config.parallel {
        Schedule::Concurrent
    } else {
        Schedule::Sequential
    };

    let inventory = match Collector::new(generators)
        .schedule(schedule)
        .continue_on_error(!args.fail_fast)
        .collect()
        .await
    {
        Ok(inventory) => inventory,
        Err(err) => {
            eprintln!("Error: {}", describe(&err));
            return Ok(ExitCode::FAILURE);
        }
    };

    let json = serde_json::to_string_pretty(&inventory).context("Failed to serialize inventory")?;
    println!("{}", json);

    if inventory.is_complete() {
        return Ok(ExitCode::SUCCESS);
    }

    for failure in &inventory.failures {
        match &failure.hint {
            Some(hint) => eprintln!("{}: {} ({})", failure.generator, failure.error, hint),
            None => eprintln!("{}: {}", failure.generator, failure.error),
        }
    }
    Ok(ExitCode::FAILURE)
}
