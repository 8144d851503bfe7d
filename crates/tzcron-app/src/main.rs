use std::io::Write;

use chrono_tz::Tz;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};
use tzcron::{Bound, Schedule, parse_timezone};
use tzcron_core::config::load_config;

/// Print the upcoming occurrences of a cron expression.
#[derive(Debug, Parser)]
#[command(name = "tzcron", version)]
struct Args {
    /// Six fields: minute hour day-of-month month day-of-week year.
    expression: String,

    /// IANA timezone, e.g. Europe/London. Defaults to `schedule.timezone`.
    #[arg(short, long)]
    timezone: Option<String>,

    /// Inclusive RFC 3339 start. Defaults to now.
    #[arg(long)]
    start: Option<Bound>,

    /// Inclusive RFC 3339 end.
    #[arg(long)]
    end: Option<Bound>,

    /// Number of occurrences to print. Defaults to `schedule.count`.
    #[arg(short = 'n', long)]
    count: Option<u32>,

    /// Skip occurrences that fall in a DST gap or overlap instead of failing.
    #[arg(long)]
    skip_dst: bool,
}

fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .init();

    let args = Args::parse();
    let config = load_config()?;

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping info");
    }

    let timezone: Tz = match args.timezone.as_deref() {
        Some(name) => parse_timezone(name)?,
        None => config.schedule.tz()?,
    };
    let count = args.count.unwrap_or(config.schedule.count);
    let skip_dst = args.skip_dst || config.schedule.skip_dst_errors;

    let mut builder = Schedule::builder(args.expression, timezone);
    if let Some(start) = args.start {
        builder = builder.with_start(start);
    }
    if let Some(end) = args.end {
        builder = builder.with_end(end);
    }
    let mut schedule = builder.build()?;

    tracing::info!(%schedule, count, skip_dst, "Schedule ready");

    let mut out = std::io::stdout().lock();
    let mut printed = 0;
    while printed < count {
        match schedule.advance() {
            Ok(Some(occurrence)) => {
                writeln!(out, "{}", occurrence.to_rfc3339())?;
                printed += 1;
            }
            Ok(None) => {
                tracing::info!(printed, "Schedule exhausted");
                break;
            }
            Err(err) if skip_dst && err.is_dst() => {
                tracing::warn!(error = %err, "Skipping occurrence");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}
