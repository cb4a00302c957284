use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select, Text};
use skycast_core::{Config, FetchError, UnitSystem, WeatherBundle, WeatherClient, WeatherQuery};
use std::sync::Arc;
use tracing::debug;

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "skycast",
    version,
    about = "Current weather, forecast and air quality in your terminal"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key, default place and units.
    Configure,

    /// Show the dashboard for a place.
    Show {
        /// Place name; falls back to the configured default place.
        place: Option<String>,

        /// Display units: "metric" or "imperial".
        #[arg(long)]
        units: Option<String>,

        /// Print the raw bundle as JSON instead of the dashboard.
        #[arg(long)]
        json: bool,
    },

    /// Print where the configuration file lives.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { place, units, json } => show(place, units, json).await,
            Command::ConfigPath => {
                println!("{}", Config::config_file_path()?.display());
                Ok(())
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    config.set_api_key(api_key);

    let current_place = config.default_place.clone().unwrap_or_default();
    let place = Text::new("Default place (leave empty for none):")
        .with_default(&current_place)
        .prompt()
        .context("Failed to read default place")?;
    config.default_place = Some(place.trim().to_string()).filter(|p| !p.is_empty());

    let options = vec![UnitSystem::Metric, UnitSystem::Imperial];
    let start = options.iter().position(|u| *u == config.units).unwrap_or(0);
    config.units = Select::new("Display units:", options)
        .with_starting_cursor(start)
        .prompt()
        .context("Failed to read display units")?;

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());

    Ok(())
}

async fn show(place: Option<String>, units: Option<String>, json: bool) -> anyhow::Result<()> {
    let config = Config::load()?;

    let units = match units {
        Some(u) => UnitSystem::try_from(u.as_str())?,
        None => config.units,
    };

    let place = place.or_else(|| config.default_place.clone()).ok_or_else(|| {
        anyhow!(
            "No place given and no default place configured.\n\
             Hint: run `skycast show <PLACE>` or `skycast configure`."
        )
    })?;

    let bundle = fetch_bundle(&config, place)
        .await
        .map_err(|err| anyhow!(render::failure(&err)))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&*bundle).context("Failed to serialize bundle")?
        );
    } else {
        print!("{}", render::dashboard(&bundle, units));
    }

    Ok(())
}

async fn fetch_bundle(config: &Config, place: String) -> Result<Arc<WeatherBundle>, FetchError> {
    let api_key = config.resolve_api_key()?;
    let query = WeatherQuery::new(place, api_key)?;
    let client = WeatherClient::open_weather(&config.client_settings())?;

    debug!(?query, "fetching");
    client.fetch(&query).await
}
