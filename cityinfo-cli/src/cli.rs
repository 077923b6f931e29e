use anyhow::Context;
use clap::{Parser, Subcommand};
use cityinfo_core::{Adapters, CityQuery, CityReportBuilder, Config};
use inquire::{Password, PasswordDisplayMode, Text};
use std::io::Write;

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "cityinfo", version, about = "Weather, air quality and background for any city")]
pub struct Cli {
    /// Log provider requests and section outcomes to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and GeoNames username.
    Configure,

    /// Show the dashboard for a city.
    Show {
        /// City name, passed to every provider as typed.
        city: String,

        /// Print the report as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Print the location of the configuration file.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { city, json } => show(&city, json).await,
            Command::ConfigPath => {
                println!("{}", Config::config_file_path()?.display());
                Ok(())
            }
        }
    }
}

async fn show(city: &str, json: bool) -> anyhow::Result<()> {
    let query = CityQuery::new(city)?;
    let config = Config::load()?;
    let adapters = Adapters::from_config(&config)?;

    let report = CityReportBuilder::new(adapters).build(&query).await;
    if !report.errors.is_empty() {
        let failed: Vec<&str> = report.errors.keys().map(|s| s.as_str()).collect();
        tracing::warn!(city = %query, failed = ?failed, "showing partial report");
    }

    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &report).context("Failed to write JSON report")?;
        writeln!(out)?;
    } else {
        render::report(&mut out, &report).context("Failed to write report")?;
    }

    Ok(())
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load_file()?;
    let existing_key = config.credentials.openweather_api_key.clone();
    let existing_user = config.credentials.geonames_username.clone().unwrap_or_default();

    let help = if existing_key.is_some() {
        "Leave empty to keep the current key"
    } else {
        "Get one at https://home.openweathermap.org/api_keys"
    };

    let entered_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_help_message(help)
        .prompt()
        .context("Failed to read API key")?;

    let api_key = match (entered_key.trim(), existing_key) {
        ("", Some(key)) => key,
        ("", None) => anyhow::bail!("An OpenWeather API key is required"),
        (key, _) => key.to_string(),
    };

    let username = Text::new("GeoNames username:")
        .with_initial_value(&existing_user)
        .with_validator(inquire::required!("A GeoNames username is required"))
        .prompt()
        .context("Failed to read GeoNames username")?;

    config.set_credentials(api_key, username.trim().to_string());
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}
