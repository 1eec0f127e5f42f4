//! Command-line entry point.
//!
//! Subcommands:
//!   locations          list the directory with activity status (default)
//!   summary <id>       windowed noise summary for one location
//!   verify             run the live-API verification report
//!
//! Configuration comes from `noisemon.toml` in the working directory plus
//! `.env` / `NOISE_API_URL` overrides.

use std::path::Path;
use std::process;

use chrono::Utc;

use noisemon_service::activity;
use noisemon_service::analysis::windows::{self, NoiseSummaryPoint};
use noisemon_service::config::{Config, DEFAULT_CONFIG_PATH};
use noisemon_service::ingest::CancelToken;
use noisemon_service::ingest::client::ApiClient;
use noisemon_service::ingest::locations::{get_location, list_locations};
use noisemon_service::logging::{self, LogLevel};
use noisemon_service::model::{LocationId, NoiseApiError};
use noisemon_service::verify;

fn main() {
    dotenv::dotenv().ok();
    logging::init_logger(LogLevel::Info, None);

    let config = match Config::load_or_default(Path::new(DEFAULT_CONFIG_PATH)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        None | Some("locations") => run_locations(&config),
        Some("summary") => match args.get(1) {
            Some(raw_id) => run_summary(&config, raw_id),
            None => {
                eprintln!("usage: noisemon_service summary <location-id>");
                process::exit(2);
            }
        },
        Some("verify") => run_verify(&config),
        Some(other) => {
            eprintln!("unknown subcommand: {}", other);
            eprintln!("usage: noisemon_service [locations | summary <location-id> | verify]");
            process::exit(2);
        }
    };

    if let Err(e) = result {
        logging::error(None, &e.to_string());
        process::exit(1);
    }
}

fn run_locations(config: &Config) -> Result<(), NoiseApiError> {
    let client = ApiClient::new(config)?;
    let locations = list_locations(&client)?;
    let now = Utc::now();

    println!("{} locations", locations.len());
    println!("───────────────────────────────────────────────────────────");
    for location in &locations {
        let sending = activity::location_is_sending_data(location, config, now);
        println!(
            "{:>10}  {:<32} {}  {}",
            location.id.to_string(),
            location.label,
            if location.active { "active" } else { "inactive" },
            if sending { "sending" } else { "silent" },
        );
    }
    Ok(())
}

fn run_summary(config: &Config, raw_id: &str) -> Result<(), NoiseApiError> {
    let id = LocationId::parse(raw_id)?;
    let client = ApiClient::new(config)?;

    // An empty by-id result is the not-found signal, not a failure.
    let location = get_location(&client, &id)?
        .ok_or_else(|| NoiseApiError::LocationNotFound(id.to_string()))?;

    let summary = windows::summarize_location(&client, config, &id, &CancelToken::new())?;

    println!("Noise summary for {} ({})", location.label, id);
    println!("Latest measurement: {}", summary.latest.format("%Y-%m-%d %H:%M:%S"));
    println!("───────────────────────────────────────────────────────────");
    print_point("Lifetime", Some(&summary.lifetime));
    print_point("Last hour", summary.last_hour.as_ref());
    print_point(
        &format!("Last {} days", summary.window_days),
        summary.last_window.as_ref(),
    );
    print_point("  day", summary.day.as_ref());
    print_point("  evening", summary.evening.as_ref());
    print_point("  night", summary.night.as_ref());
    Ok(())
}

fn print_point(label: &str, point: Option<&NoiseSummaryPoint>) {
    match point {
        Some(point) => println!("{:<16} {:>6.1} dB", label, point.value),
        None => println!("{:<16}    no data", label),
    }
}

fn run_verify(config: &Config) -> Result<(), NoiseApiError> {
    let report = verify::run_full_verification(config)?;
    verify::print_summary(&report);

    let report_json = serde_json::to_string_pretty(&report)
        .map_err(|e| NoiseApiError::Parse(e.to_string()))?;
    std::fs::write("verification_report.json", report_json)
        .map_err(|e| NoiseApiError::Config(format!("cannot write report: {}", e)))?;
    println!("\nFull report saved to: verification_report.json");
    Ok(())
}
