//! Runtime settings
//!
//! Layered with the `config` crate: an optional TOML file (`LINEUP_CONFIG`,
//! default `lineup.toml`) overridden by `LINEUP__SECTION__KEY` environment
//! variables, e.g. `LINEUP__TELEGRAM__BOT_TOKEN`.

use anyhow::{bail, ensure, Context, Result};
use chrono::{Duration, FixedOffset};
use config::{Config, Environment, File, FileFormat};
use lineup_core::application::SchedulerConfig;
use lineup_core::port::parse_utc_offset;
use serde::Deserialize;

pub const CONFIG_PATH_ENV: &str = "LINEUP_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "lineup.toml";
const ENV_PREFIX: &str = "LINEUP";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub telegram: TelegramSettings,
    pub sheets: SheetsSettings,
    pub files: FilesSettings,
    pub schedule: ScheduleSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    pub bot_token: String,
    /// Group chat where announcements are posted
    pub chat_id: i64,
    pub poll_timeout_secs: u64,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: 0,
            poll_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetsSettings {
    pub spreadsheet_id: String,
    /// Path to a service-account key file
    pub credentials_file: Option<String>,
    /// The key file's content inline (handy for container secrets)
    pub credentials_json: Option<String>,
    pub range: String,
}

impl Default for SheetsSettings {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            credentials_file: None,
            credentials_json: None,
            range: "A:ZZ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilesSettings {
    pub subjects: String,
    pub user_mapping: String,
}

impl Default for FilesSettings {
    fn default() -> Self {
        Self {
            subjects: "subjects.json".to_string(),
            user_mapping: "user_mapping.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// e.g. "+03:00"; unset means the host's local offset
    pub utc_offset: Option<String>,
    pub tick_secs: u64,
    pub purge_interval_hours: u64,
    pub notify_lead_hours: i64,
    pub trigger_half_window_mins: i64,
    pub suppression_hours: i64,
    pub ledger_ttl_hours: i64,
    pub confirm_join: bool,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            utc_offset: None,
            tick_secs: 60,
            purge_interval_hours: 24,
            notify_lead_hours: 24,
            trigger_half_window_mins: 10,
            suppression_hours: 6,
            ledger_ttl_hours: 24,
            confirm_join: true,
        }
    }
}

impl ScheduleSettings {
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            tick: std::time::Duration::from_secs(self.tick_secs),
            purge_interval: std::time::Duration::from_secs(self.purge_interval_hours * 3600),
            notify_lead: Duration::hours(self.notify_lead_hours),
            trigger_half_window: Duration::minutes(self.trigger_half_window_mins),
            suppression: Duration::hours(self.suppression_hours),
            ledger_ttl: Duration::hours(self.ledger_ttl_hours),
        }
    }

    pub fn offset(&self) -> Result<Option<FixedOffset>> {
        match self.utc_offset.as_deref() {
            None => Ok(None),
            Some(raw) => parse_utc_offset(raw)
                .map(Some)
                .with_context(|| format!("invalid schedule.utc_offset '{raw}'")),
        }
    }
}

/// Where the service-account key comes from
pub enum CredentialSource<'a> {
    File(String),
    Inline(&'a str),
}

impl Settings {
    /// Read the config file (if any) and the environment, then validate
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let path = shellexpand::tilde(&path).into_owned();

        let config = Config::builder()
            .add_source(File::new(&path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read settings (file: {path})"))?;

        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self> {
        let settings: Settings = config
            .try_deserialize()
            .context("failed to parse settings")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.telegram.bot_token.trim().is_empty(), "telegram.bot_token is required");
        ensure!(self.telegram.chat_id != 0, "telegram.chat_id is required");
        ensure!(
            !self.sheets.spreadsheet_id.trim().is_empty(),
            "sheets.spreadsheet_id is required"
        );
        ensure!(self.schedule.tick_secs > 0, "schedule.tick_secs must be positive");
        ensure!(
            self.schedule.purge_interval_hours > 0,
            "schedule.purge_interval_hours must be positive"
        );
        self.credential_source()?;
        self.schedule.offset()?;
        Ok(())
    }

    /// Exactly one of `credentials_file` / `credentials_json` must be set
    pub fn credential_source(&self) -> Result<CredentialSource<'_>> {
        match (&self.sheets.credentials_file, &self.sheets.credentials_json) {
            (Some(file), None) => Ok(CredentialSource::File(shellexpand::tilde(file).into_owned())),
            (None, Some(json)) => Ok(CredentialSource::Inline(json)),
            (Some(_), Some(_)) => {
                bail!("set only one of sheets.credentials_file and sheets.credentials_json")
            }
            (None, None) => bail!("sheets.credentials_file or sheets.credentials_json is required"),
        }
    }
}
