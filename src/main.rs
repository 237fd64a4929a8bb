// Facility binary - runs the configured shifts against a live arrival stream
//
// The binary loads the configuration, installs a Ctrl+C handler that ends the run early, runs every
// shift and prints the final report.

use clinic_pipeline::{Facility, FacilityConfig};
use std::time::Duration;

/// Command-line options parsed from program arguments.
struct CliOptions {
    /// Optional TOML configuration file
    config: Option<String>,
    /// Override for every shift's duration
    shift_ms: Option<u64>,
    /// Seed for the arrival generator
    seed: Option<u64>,
    /// Emit the final report as JSON instead of text
    json: bool,
}

/// Parse command-line arguments into `CliOptions`.
///
/// Accepts `--key=value` and `--key value` forms for `--config`, `--shift-ms` and `--seed`, plus
/// the `--json` flag. Unknown arguments are ignored; unparsable numbers are reported.
fn parse_cli_options() -> Result<CliOptions, String> {
    let mut options = CliOptions {
        config: None,
        shift_ms: None,
        seed: None,
        json: false,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let (key, inline) = match arg.split_once('=') {
            Some((key, value)) => (key.to_string(), Some(value.to_string())),
            None => (arg.clone(), None),
        };
        if key == "--json" {
            options.json = true;
            continue;
        }
        if !matches!(key.as_str(), "--config" | "--shift-ms" | "--seed") {
            continue;
        }
        let value = inline
            .or_else(|| args.next())
            .ok_or_else(|| format!("{key} needs a value"))?;
        match key.as_str() {
            "--config" => options.config = Some(value),
            "--shift-ms" => options.shift_ms = Some(parse_number(&key, &value)?),
            "--seed" => options.seed = Some(parse_number(&key, &value)?),
            _ => {}
        }
    }
    Ok(options)
}

fn parse_number(key: &str, value: &str) -> Result<u64, String> {
    value
        .parse()
        .map_err(|_| format!("{key} expects a number, got `{value}`"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = parse_cli_options()?;

    let mut config = match &options.config {
        Some(path) => FacilityConfig::load(path)?,
        None => FacilityConfig::default(),
    };
    if let Some(ms) = options.shift_ms {
        config = config.with_shift_duration(Duration::from_millis(ms));
    }
    if let Some(seed) = options.seed {
        config.arrivals.seed = Some(seed);
    }

    let facility = Facility::new(config)?;

    // Ctrl+C ends the current shift early and skips the rest; shutdown still runs normally
    let cancel = facility.cancel_signal();
    ctrlc::set_handler(move || {
        log::warn!("interrupt received, ending run");
        cancel.trigger();
    })?;

    let report = facility.run()?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        // Shift summaries were already logged as each shift ended
        println!("{report}");
    }

    Ok(())
}
