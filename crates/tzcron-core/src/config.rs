use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// IANA name of the zone occurrences are localized to.
    pub timezone: String,
    /// How many occurrences the front end prints.
    pub count: u32,
    /// Log and skip DST gaps/overlaps instead of aborting.
    pub skip_dst_errors: bool,
}

impl ScheduleConfig {
    /// ## Summary
    /// Resolves the configured timezone name.
    ///
    /// ## Errors
    /// Returns `CoreError::InvalidConfiguration` if the name is not a known IANA zone.
    pub fn tz(&self) -> CoreResult<chrono_tz::Tz> {
        self.timezone.parse::<chrono_tz::Tz>().map_err(|_err| {
            CoreError::InvalidConfiguration(format!("unknown timezone: {}", self.timezone))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from defaults, `config.toml` and `TZCRON_` environment variables.
    /// Environment variables take precedence over file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Config::builder()
            .set_default("schedule.timezone", "UTC")?
            .set_default("schedule.count", 10)?
            .set_default("schedule.skip_dst_errors", false)?
            .set_default("logging.level", "info")?
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            // Env, e.g. TZCRON_SCHEDULE__TIMEZONE
            .add_source(
                config::Environment::with_prefix("TZCRON")
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Settings>()?)
    }

    /// ## Summary
    /// Checks values that deserialize fine but cannot drive a schedule.
    ///
    /// ## Errors
    /// Returns `CoreError::InvalidConfiguration` for a zero count or an unknown timezone.
    pub fn validate(&self) -> CoreResult<()> {
        if self.schedule.count == 0 {
            return Err(CoreError::InvalidConfiguration(
                "schedule.count must be at least 1".to_string(),
            ));
        }
        self.schedule.tz()?;
        Ok(())
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file, then validates it.
///
/// ## Errors
/// Returns an error if loading, deserializing or validating the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    settings.validate()?;
    tracing::debug!(
        timezone = %settings.schedule.timezone,
        count = settings.schedule.count,
        "Configuration validated"
    );
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(timezone: &str, count: u32) -> Settings {
        Settings {
            schedule: ScheduleConfig {
                timezone: timezone.to_string(),
                count,
                skip_dst_errors: false,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    #[test_log::test]
    fn test_validate_accepts_defaults() {
        settings("UTC", 10).validate().expect("defaults are valid");
    }

    #[test_log::test]
    fn test_validate_rejects_zero_count() {
        let err = settings("UTC", 0).validate().expect_err("zero count");
        assert!(matches!(err, CoreError::InvalidConfiguration(_)));
    }

    #[test_log::test]
    fn test_validate_rejects_unknown_timezone() {
        let err = settings("Mars/Olympus_Mons", 3)
            .validate()
            .expect_err("unknown zone");
        assert!(err.to_string().contains("Mars/Olympus_Mons"));
    }

    #[test]
    fn test_tz_resolves_iana_name() {
        let tz = settings("Europe/London", 1).schedule.tz().expect("known zone");
        assert_eq!(tz, chrono_tz::Tz::Europe__London);
    }
}
