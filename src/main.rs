use std::io::{self, Write};

use anyhow::{bail, Context};
use aqi::{calculate_aqi, describe_aqi, format_parameter_name, who_guideline};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use aeris::cities::{self, CITIES};
use aeris::config::Config;
use aeris::ingest::{process_locations, Collector};
use aeris::openaq::OpenAqClient;
use aeris::report::{self, CitySummary};
use aeris::storage::Database;
use aeris::{alerts, logging};

/// Readings considered when summarising a city.
const REPORT_WINDOW: u32 = 200;

#[derive(Parser)]
#[command(name = "aeris")]
#[command(about = "Air-quality collection and AQI reports for Brazilian cities")]
struct Cli {
    /// Log at debug level regardless of LOG_LEVEL.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,
    /// Print results as JSON.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one concentration.
    Aqi {
        parameter: String,
        concentration: f64,
    },
    /// List the city catalogue.
    Cities,
    /// Refresh the station list for a country.
    Stations {
        #[arg(long, default_value = "BR")]
        country: String,
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
    /// Fetch the latest readings for cities and store them.
    Collect {
        #[arg(long = "city")]
        cities: Vec<String>,
    },
    /// Summarise stored readings per city.
    Report {
        #[arg(long = "city")]
        cities: Vec<String>,
    },
    /// Show one sensor's recent readings straight from OpenAQ.
    Sensor {
        id: i64,
        #[arg(long, default_value_t = 24)]
        hours: u32,
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
    /// List active alerts or resolve one.
    Alerts {
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        resolve: Option<i64>,
    },
    /// Per-parameter statistics for a city.
    Stats {
        #[arg(long)]
        city: String,
        #[arg(long, default_value_t = 24)]
        hours: u32,
    },
    /// Delete measurements past the retention window.
    Cleanup {
        #[arg(long)]
        days: Option<u32>,
        #[arg(long, default_value_t = false)]
        vacuum: bool,
    },
}

fn write_json(out: &mut impl Write, value: &impl Serialize) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    let level = if cli.verbose {
        "debug"
    } else {
        config.app.log_level.as_str()
    };
    let _log_guard = logging::init(level, config.app.log_file.as_deref())?;

    let mut out = io::stdout().lock();
    match cli.command {
        Commands::Aqi {
            parameter,
            concentration,
        } => {
            let Some(aqi) = calculate_aqi(concentration, &parameter) else {
                bail!("no AQI scale for parameter {parameter:?}");
            };
            let description = describe_aqi(aqi);
            if cli.json {
                let guideline = who_guideline(&parameter).and_then(|g| g.day);
                write_json(
                    &mut out,
                    &json!({
                        "parameter": parameter,
                        "concentration": concentration,
                        "description": description,
                        "who_24h_guideline": guideline,
                    }),
                )?;
                return Ok(());
            }
            writeln!(
                out,
                "{} {concentration}: AQI {aqi} ({})",
                format_parameter_name(&parameter),
                description.category
            )?;
            writeln!(out, "{}", description.health_message)?;
            if let Some(daily) = who_guideline(&parameter).and_then(|g| g.day) {
                let verdict = if concentration > daily { "above" } else { "within" };
                writeln!(out, "WHO 24-hour guideline {daily}: {verdict}")?;
            }
        }
        Commands::Cities => {
            for city in CITIES {
                writeln!(
                    out,
                    "{} {:<16} {}  ({:.4}, {:.4})  pop. {}",
                    city.priority, city.name, city.state, city.latitude, city.longitude,
                    city.population
                )?;
            }
        }
        Commands::Stations { country, limit } => {
            let client = OpenAqClient::new(&config.openaq)?;
            let db = Database::open(&config.database.path)?;
            let raw = client.locations_by_country(&country, limit, None).await?;
            let locations = process_locations(&raw, None);
            for location in &locations {
                db.upsert_location(location)?;
            }
            if cli.json {
                write_json(&mut out, &locations)?;
            } else {
                writeln!(out, "Stored {} stations for {country}", locations.len())?;
            }
        }
        Commands::Collect { cities: names } => {
            let targets = cities::resolve(&names)?;
            let client = OpenAqClient::new(&config.openaq)?;
            let mut db = Database::open(&config.database.path)?;
            let collector = Collector::new(client);

            for collection in collector.collect_cities(&targets).await {
                for location in &collection.locations {
                    db.upsert_location(location)?;
                }
                let inserted = db.insert_measurements(&collection.measurements)?;
                writeln!(
                    out,
                    "{}: {} stations, {} new measurements",
                    collection.city,
                    collection.locations.len(),
                    inserted
                )?;

                match CitySummary::from_measurements(&collection.city, &collection.measurements) {
                    Some(summary) => {
                        if let Some(id) =
                            alerts::evaluate(&db, &summary, config.app.alert_min_category)?
                        {
                            writeln!(out, "  alert #{id} raised: {}", summary.description.category)?;
                        }
                    }
                    None => warn!(city = %collection.city, "no scorable readings collected"),
                }
            }
        }
        Commands::Report { cities: names } => {
            let targets = cities::resolve(&names)?;
            let db = Database::open(&config.database.path)?;
            let mut summaries = Vec::new();
            for city in targets {
                let measurements = db.latest_measurements(city.name, REPORT_WINDOW)?;
                match CitySummary::from_measurements(city.name, &measurements) {
                    Some(summary) if cli.json => summaries.push(summary),
                    Some(summary) => {
                        report::render(&summary, &mut out)?;
                        writeln!(out)?;
                    }
                    None if cli.json => warn!(city = city.name, "no data"),
                    None => writeln!(out, "{}: no data\n", city.name)?,
                }
            }
            if cli.json {
                write_json(&mut out, &summaries)?;
            }
        }
        Commands::Sensor { id, hours, limit } => {
            let client = OpenAqClient::new(&config.openaq)?;
            let from = chrono::Utc::now() - chrono::Duration::hours(i64::from(hours));
            let readings = client.sensor_measurements(id, Some(from), None, limit).await?;
            for reading in readings {
                let (Some(value), Some(at)) = (reading.value, reading.timestamp()) else {
                    continue;
                };
                let unit = reading.parameter.units.as_deref().unwrap_or("");
                writeln!(
                    out,
                    "{}  {:<6} {value:>9.2} {unit}",
                    at.format("%Y-%m-%d %H:%M"),
                    format_parameter_name(&reading.parameter.name)
                )?;
            }
        }
        Commands::Alerts { city, resolve } => {
            let db = Database::open(&config.database.path)?;
            if let Some(id) = resolve {
                if !db.resolve_alert(id)? {
                    bail!("no active alert with id {id}");
                }
                writeln!(out, "Alert #{id} resolved")?;
            } else {
                let active = db.active_alerts(city.as_deref())?;
                if cli.json {
                    write_json(&mut out, &active)?;
                    return Ok(());
                }
                if active.is_empty() {
                    writeln!(out, "No active alerts")?;
                }
                for alert in active {
                    writeln!(
                        out,
                        "#{} {} {} {} AQI {:.0} (threshold {:.0}) {}",
                        alert.id,
                        alert.created_at.format("%Y-%m-%d %H:%M"),
                        alert.city,
                        format_parameter_name(&alert.parameter),
                        alert.value,
                        alert.threshold,
                        alert.level
                    )?;
                }
            }
        }
        Commands::Stats { city, hours } => {
            let city = cities::find(&city)
                .map(|c| c.name.to_string())
                .unwrap_or(city);
            let db = Database::open(&config.database.path)?;
            let stats = db.statistics(&city, hours)?;
            if cli.json {
                write_json(&mut out, &stats)?;
                return Ok(());
            }
            if stats.is_empty() {
                writeln!(out, "No measurements for {city} in the last {hours} h")?;
            }
            for s in stats {
                writeln!(
                    out,
                    "{:<6} n={:<5} avg={:.2} min={:.2} max={:.2}",
                    format_parameter_name(&s.parameter),
                    s.count,
                    s.avg,
                    s.min,
                    s.max
                )?;
            }
        }
        Commands::Cleanup { days, vacuum } => {
            let days = days.unwrap_or(config.database.retention_days);
            let db = Database::open(&config.database.path)?;
            let deleted = db.cleanup_old_data(days)?;
            if vacuum {
                db.vacuum()?;
            }
            writeln!(out, "Deleted {deleted} measurements older than {days} days")?;
        }
    }

    info!("done");
    Ok(())
}
