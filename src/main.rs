use clap::Parser;
use comfy_table::Table;
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::exit;
use std::sync::Arc;

use revocheck::config::Config;
use revocheck::evidence::Evidence;
use revocheck::logging::setup_logging;
use revocheck::oracle::{self, OracleBinding, RevocationOracle};
use revocheck::tls::{self, ChainEntry, Fetched};

mod metrics;

const DEFAULT_CONFIG_FILE: &str = "revocheck.toml";

/// Fetch an HTTPS URL, rejecting the server's chain if a revocation oracle
/// reports it revoked or cannot be consulted.
#[derive(Parser, Debug)]
#[command(name = "revocheck", author, version, about, long_about = None)]
struct Cli {
    /// HTTPS URL to fetch
    #[arg(value_name = "URL", required_unless_present = "generate_config")]
    url: Option<String>,

    /// Configuration file (defaults to ./revocheck.toml when present)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Oracle binding: ffi, detail, high
    #[arg(short = 'b', long = "binding", value_name = "BINDING")]
    binding: Option<String>,

    /// Oracle executable for the detail and high bindings
    #[arg(long = "oracle", value_name = "PROGRAM")]
    oracle_program: Option<String>,

    /// Kill the oracle process after this many seconds
    #[arg(long = "oracle-timeout", value_name = "SECONDS")]
    oracle_timeout: Option<u64>,

    /// Output format: text, json
    #[arg(short = 'o', long = "output", value_name = "FORMAT")]
    output: Option<String>,

    /// Log filter when RUST_LOG is not set
    #[arg(long = "log-level", value_name = "LEVEL")]
    log_level: Option<String>,

    /// Push metrics to a Prometheus Push Gateway
    #[arg(long = "prometheus")]
    prometheus: bool,

    /// Prometheus Push Gateway address
    #[arg(long = "prometheus-address", value_name = "URL")]
    prometheus_address: Option<String>,

    /// Print an example configuration file and exit
    #[arg(long = "generate-config")]
    generate_config: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    url: &'a str,
    binding: String,
    chain: Vec<ChainEntry>,
    evidence: Option<Evidence>,
    verdict: Option<&'static str>,
    status: Option<String>,
    rejected: Option<&'static str>,
    error: Option<String>,
}

fn load_config(cli: &Cli) -> Result<Config, String> {
    let file_config = match &cli.config {
        Some(path) => Some(Config::from_file(path).map_err(|e| e.to_string())?),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            Some(Config::from_file(DEFAULT_CONFIG_FILE).map_err(|e| e.to_string())?)
        }
        None => None,
    };

    let cli_config = Config::from_cli_args(
        cli.binding.clone(),
        cli.oracle_program.clone(),
        cli.oracle_timeout,
        cli.output.clone(),
        cli.log_level.clone(),
        cli.prometheus.then_some(true),
        cli.prometheus_address.clone(),
    );

    let mut config = Config::default();
    if let Some(file_config) = file_config {
        config = config.merge_with(file_config);
    }
    let config = config.merge_with(cli_config);
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn print_chain(chain: &[ChainEntry]) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Subject", "Serial"]);
    for entry in chain {
        table.add_row(vec![
            entry.index.to_string(),
            entry.common_name.clone().unwrap_or_else(|| "-".to_string()),
            entry.serial.clone(),
        ]);
    }
    eprintln!("{}", table);
}

fn main() {
    let cli = Cli::parse();

    if cli.generate_config {
        println!("{}", Config::example_toml());
        exit(0);
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            exit(2);
        }
    };
    setup_logging(config.log_level.as_deref());

    // load_config validated both
    let binding = config.binding().unwrap_or(OracleBinding::Detail);
    let command = config.oracle_command().unwrap_or_default();
    let oracle: Arc<dyn RevocationOracle> = match oracle::build(binding, command) {
        Ok(oracle) => Arc::from(oracle),
        Err(e) => {
            eprintln!("Failed to set up {} oracle: {}", binding, e);
            exit(1);
        }
    };

    let url = cli.url.as_deref().unwrap_or_default();
    let json = config.json_output();
    let result = if json {
        tls::fetch(url, oracle, &mut io::sink())
    } else {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        tls::fetch(url, oracle, &mut out)
    };

    let outcome = match &result {
        Ok(fetched) => fetched.check.outcome.as_ref().map(|v| v.label()).unwrap_or("rejected"),
        Err(e) => e.label(),
    };
    metrics::prom::record_check(&binding.to_string(), outcome);
    if let Some(address) = config.prometheus_address() {
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(String::from))
            .unwrap_or_default();
        metrics::prom::push_metrics(&host, address);
    }

    let failed = result.is_err();
    if json {
        let mut report = Report {
            url,
            binding: binding.to_string(),
            chain: Vec::new(),
            evidence: None,
            verdict: None,
            status: None,
            rejected: None,
            error: None,
        };
        match result {
            Ok(Fetched { check, status_line }) => {
                report.chain = check.chain;
                report.evidence = check.evidence;
                report.verdict = check.outcome.ok().map(|v| v.label());
                report.status = Some(status_line);
            }
            Err(e) => {
                report.rejected = Some(e.label());
                report.error = Some(e.to_string());
            }
        }
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Failed to render report: {}", e),
        }
    } else {
        match result {
            Ok(fetched) => {
                print_chain(&fetched.check.chain);
                if let Ok(verdict) = &fetched.check.outcome {
                    eprintln!("Revocation check: {}", verdict);
                }
                let _ = io::stdout().flush();
            }
            Err(e) => eprintln!("{}", e),
        }
    }

    exit(if failed { 1 } else { 0 });
}
