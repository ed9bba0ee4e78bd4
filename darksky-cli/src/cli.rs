use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use darksky_core::{ClientConfig, Config, Forecast, ForecastApi, ForecastClient};
use inquire::{Password, PasswordDisplayMode};
use tracing::{debug, info};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "darksky", version, about = "Weekly forecast from the Dark Sky API")]
pub struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key (and optionally a custom endpoint).
    Configure {
        /// API key; prompted for when omitted.
        #[arg(long)]
        api_key: Option<String>,

        /// Override the API endpoint, e.g. a compatible mirror.
        #[arg(long)]
        base_domain: Option<String>,
    },

    /// Show the daily forecast for a coordinate.
    Show {
        #[arg(allow_negative_numbers = true)]
        latitude: f64,

        #[arg(allow_negative_numbers = true)]
        longitude: f64,

        /// Print the decoded forecast as JSON.
        #[arg(long)]
        json: bool,

        /// Use this key instead of the stored one.
        #[arg(long, env = "DARKSKY_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// Print the location of the config file.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure { api_key, base_domain } => configure(api_key, base_domain),
            Command::Show { latitude, longitude, json, api_key } => {
                let mut config = Config::load()?;
                if let Some(key) = api_key {
                    config.set_api_key(&key)?;
                }

                let client = ForecastClient::new(config.client_config()?);
                show(&client, latitude, longitude, json).await
            }
            Command::ConfigPath => {
                println!("{}", Config::config_file_path()?.display());
                Ok(())
            }
        }
    }
}

fn configure(api_key: Option<String>, base_domain: Option<String>) -> Result<()> {
    let mut config = Config::load()?;

    let key = match api_key {
        Some(key) => key,
        None => Password::new("Dark Sky API key:")
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()
            .context("Failed to read API key")?,
    };
    config.set_api_key(&key)?;

    if let Some(domain) = base_domain {
        check_base_domain(&domain)?;
        config.base_domain = Some(domain);
    }

    config.save()?;
    let path = Config::config_file_path()?;
    info!(path = %path.display(), "configuration saved");
    println!("Saved configuration to {}", path.display());

    Ok(())
}

/// Reject endpoints the client would refuse later on.
fn check_base_domain(domain: &str) -> Result<()> {
    ForecastClient::new(ClientConfig::new("probe").with_base_domain(domain))
        .request_url(0.0, 0.0)
        .map(|_| ())
        .map_err(|_| anyhow!("'{domain}' is not a usable base URL"))
}

async fn show(api: &dyn ForecastApi, latitude: f64, longitude: f64, json: bool) -> Result<()> {
    debug!(latitude, longitude, "fetching forecast");

    let forecast = api
        .fetch_forecast(latitude, longitude)
        .await
        .with_context(|| format!("Could not fetch forecast for {latitude},{longitude}"))?;

    if json {
        let out = serde_json::to_string_pretty(&forecast).context("Failed to encode forecast")?;
        println!("{out}");
    } else {
        print!("{}", render(&forecast));
    }

    Ok(())
}

/// Human-readable weekly table.
pub fn render(forecast: &Forecast) -> String {
    let mut out = format!(
        "Forecast for {:.4}, {:.4} ({})\n",
        forecast.latitude, forecast.longitude, forecast.timezone
    );

    if let Some(summary) = &forecast.daily.summary {
        out.push_str(summary);
        out.push('\n');
    }

    for day in forecast.days() {
        let rain = day
            .precip_probability
            .map(|p| format!("{:>3.0}%", p * 100.0))
            .unwrap_or_else(|| "   -".to_string());

        out.push_str(&format!(
            "{}  {:>6.1}°C / {:>6.1}°C  rain {}  {}\n",
            format_day(day.time),
            day.temperature_high,
            day.temperature_low,
            rain,
            day.summary,
        ));
    }

    for alert in &forecast.alerts {
        out.push_str(&format!("! {} (from {})\n", alert.title, format_day(alert.time)));
    }

    out
}

fn format_day(time: DateTime<Utc>) -> String {
    time.format("%a %Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use darksky_core::FetchError;

    fn sample() -> Forecast {
        serde_json::from_str(
            r#"{"latitude":37.8,"longitude":-122.4,"timezone":"America/Los_Angeles",
                "daily":{"summary":"Dry week.","data":[
                    {"time":1500000000,"summary":"Clear","temperatureHigh":24.0,
                     "temperatureLow":15.5,"precipProbability":0.1},
                    {"time":1500086400,"summary":"Fog","temperatureHigh":20.0,"temperatureLow":14.0}
                ]}}"#,
        )
        .unwrap()
    }

    #[test]
    fn render_lists_every_day() {
        let text = render(&sample());
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "Forecast for 37.8000, -122.4000 (America/Los_Angeles)");
        assert_eq!(lines[1], "Dry week.");
        assert!(lines[2].starts_with("Fri 2017-07-14"));
        assert!(lines[2].contains("rain  10%"));
        assert!(lines[2].ends_with("Clear"));
        assert!(lines[3].contains("rain    -"));
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn show_parses_negative_coordinates() {
        let cli = Cli::try_parse_from(["darksky", "show", "-33.86", "-151.2", "--json"]).unwrap();

        match cli.command {
            Command::Show { latitude, longitude, json, .. } => {
                assert_eq!(latitude, -33.86);
                assert_eq!(longitude, -151.2);
                assert!(json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[derive(Debug)]
    struct FailingApi;

    #[async_trait::async_trait]
    impl ForecastApi for FailingApi {
        async fn fetch_forecast(&self, _: f64, _: f64) -> Result<Forecast, FetchError> {
            Err(FetchError::DecodeFailure)
        }
    }

    #[tokio::test]
    async fn show_wraps_fetch_error_with_coordinates() {
        let err = show(&FailingApi, 1.5, -2.0, false).await.unwrap_err();

        assert!(err.to_string().contains("Could not fetch forecast for 1.5,-2"));
        assert!(err.chain().any(|cause| cause.to_string().contains("decode")));
    }

    #[test]
    fn base_domain_check_rejects_garbage() {
        assert!(check_base_domain("https://api.darksky.net/").is_ok());
        assert!(check_base_domain("not a url").is_err());
    }
}
