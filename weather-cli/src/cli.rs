use std::{
    fs::File,
    io::{self, Read},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inquire::{Select, Text};
use tracing::debug;
use weather_core::{Config, DecodeOutcome, OpenWeatherSource, Units, current_weather, decode};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the OpenWeather API key and units.
    Configure,

    /// Show current weather for a location.
    Show {
        /// Location name, e.g. "London" or "London,GB".
        location: String,

        /// Print the decoded result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Decode a saved API response.
    Decode {
        /// File holding the response; reads stdin when absent.
        file: Option<PathBuf>,

        /// Units the response was requested in; defaults to the configured units.
        #[arg(long)]
        units: Option<String>,

        /// Print the decoded result as JSON.
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { location, json } => {
                let config = Config::load()?;
                let source = OpenWeatherSource::from_config(&config)?;

                debug!(%location, units = %config.units, "fetching current weather");
                let outcome = current_weather(&source, &location).await?;
                print_outcome(&outcome, config.units, json)
            }
            Command::Decode { file, units, json } => {
                let config = Config::load()?;
                let units = match units {
                    Some(u) => Units::try_from(u.as_str())?,
                    None => config.units,
                };

                let reader: Box<dyn Read> = match &file {
                    Some(path) => Box::new(
                        File::open(path)
                            .with_context(|| format!("Failed to open {}", path.display()))?,
                    ),
                    None => Box::new(io::stdin().lock()),
                };

                debug!(?file, %units, "decoding saved response");
                let outcome = decode(reader).context("Failed to decode weather response")?;
                print_outcome(&outcome, units, json)
            }
        }
    }
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let api_key = Text::new("OpenWeather API key:")
        .with_initial_value(config.api_key.as_deref().unwrap_or_default())
        .prompt()
        .context("Failed to read API key")?;

    let start = Units::all().iter().position(|u| *u == config.units).unwrap_or(0);
    let units = Select::new("Units:", Units::all().to_vec())
        .with_starting_cursor(start)
        .prompt()
        .context("Failed to read units")?;

    config.api_key = Some(api_key.trim().to_string());
    config.units = units;
    config.save()?;

    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

fn print_outcome(outcome: &DecodeOutcome, units: Units, json: bool) -> Result<()> {
    if json {
        let text =
            serde_json::to_string_pretty(outcome).context("Failed to serialize weather data")?;
        println!("{text}");
    } else {
        print!("{}", output::render(outcome, units));
    }
    Ok(())
}
