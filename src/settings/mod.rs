pub mod editor;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use editor::{EditorOutcome, SettingsEditor};

pub const DEFAULT_LEFT_BOUND: u32 = 5;
pub const DEFAULT_RIGHT_BOUND: u32 = 5;
pub const DEFAULT_SPEECH_RATE: f32 = 0.4;

/// Largest finger count either hand may be asked to show.
pub const MAX_BOUND: u32 = 100;

/// Highest count the alternate locale has a numeral glyph for.
pub const ALT_NUMERAL_LIMIT: u32 = 10;

/// Language used for prompts and spoken feedback.
///
/// Persisted as a flag: `false` is the default locale, `true` the alternate one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display)]
#[serde(from = "bool", into = "bool")]
pub enum Locale {
    #[default]
    #[strum(serialize = "en")]
    Default,
    #[strum(serialize = "zh")]
    Alt,
}

impl From<bool> for Locale {
    fn from(flag: bool) -> Self {
        if flag {
            Locale::Alt
        } else {
            Locale::Default
        }
    }
}

impl From<Locale> for bool {
    fn from(locale: Locale) -> Self {
        locale == Locale::Alt
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("Invalid format: must be an object")]
    NotAnObject,
    #[error("Invalid settings: {0}")]
    InvalidField(#[source] serde_json::Error),
    #[error("Invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    pub left_bound: u32,
    pub right_bound: u32,
    pub speech_rate: f32,
    pub locale: Locale,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            left_bound: DEFAULT_LEFT_BOUND,
            right_bound: DEFAULT_RIGHT_BOUND,
            speech_rate: DEFAULT_SPEECH_RATE,
            locale: Locale::Default,
        }
    }
}

impl GameSettings {
    /// Parse persisted query parameters. Each field falls back to its default on its own
    /// when missing or unusable.
    pub fn from_query(query: &str) -> Self {
        let mut settings = Self::default();
        let query = query.trim().trim_start_matches('?');

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let (raw_key, raw_value) = (raw_key.replace('+', " "), raw_value.replace('+', " "));
            let (Ok(key), Ok(value)) = (urlencoding::decode(&raw_key), urlencoding::decode(&raw_value))
            else {
                tracing::debug!(pair, "skipping undecodable query pair");
                continue;
            };
            let value = value.trim();

            // The older names are accepted so bookmarked links keep working.
            match &*key {
                "leftBound" | "maxLeftFingers" => {
                    if let Some(bound) = parse_bound(value) {
                        settings.left_bound = bound;
                    }
                }
                "rightBound" | "maxRightFingers" => {
                    if let Some(bound) = parse_bound(value) {
                        settings.right_bound = bound;
                    }
                }
                "speechRate" | "utteranceRate" => {
                    if let Some(rate) = parse_rate(value) {
                        settings.speech_rate = rate;
                    }
                }
                "locale" => {
                    settings.locale = Locale::from(matches!(value, "1" | "true" | "on" | "yes"));
                }
                other => tracing::debug!(key = other, "ignoring unknown query parameter"),
            }
        }

        settings
    }

    /// Query string holding only the fields that differ from the defaults.
    pub fn to_query(&self) -> String {
        let defaults = Self::default();
        let mut params: Vec<(&str, String)> = Vec::new();

        if self.left_bound != defaults.left_bound {
            params.push(("leftBound", self.left_bound.to_string()));
        }
        if self.right_bound != defaults.right_bound {
            params.push(("rightBound", self.right_bound.to_string()));
        }
        if self.speech_rate != defaults.speech_rate {
            params.push(("speechRate", self.speech_rate.to_string()));
        }
        if self.locale != defaults.locale {
            params.push(("locale", "1".to_string()));
        }

        params
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(&v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.left_bound == 0 || self.right_bound == 0 {
            return Err(SettingsError::Invalid(
                "leftBound and rightBound must be positive integers".into(),
            ));
        }
        if self.left_bound > MAX_BOUND || self.right_bound > MAX_BOUND {
            return Err(SettingsError::Invalid(format!(
                "leftBound and rightBound must be at most {}",
                MAX_BOUND
            )));
        }
        if !(self.speech_rate.is_finite() && self.speech_rate > 0.0) {
            return Err(SettingsError::Invalid(
                "speechRate must be a positive number".into(),
            ));
        }
        if self.locale == Locale::Alt
            && (self.left_bound > ALT_NUMERAL_LIMIT || self.right_bound > ALT_NUMERAL_LIMIT)
        {
            return Err(SettingsError::Invalid(format!(
                "the alternate locale only has numerals up to {}",
                ALT_NUMERAL_LIMIT
            )));
        }
        Ok(())
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

fn parse_bound(value: &str) -> Option<u32> {
    value
        .parse::<u32>()
        .ok()
        .filter(|b| (1..=MAX_BOUND).contains(b))
}

fn parse_rate(value: &str) -> Option<f32> {
    value
        .parse::<f32>()
        .ok()
        .filter(|r| r.is_finite() && *r > 0.0)
}

/// Merge the JSON object in `text` over `current`.
///
/// Keys present in the object replace the current values, unknown keys are ignored.
/// Anything other than a JSON object is rejected.
pub fn apply_json(current: &GameSettings, text: &str) -> Result<GameSettings, SettingsError> {
    let value: Value = serde_json::from_str(text).map_err(SettingsError::Json)?;
    let Value::Object(changes) = value else {
        return Err(SettingsError::NotAnObject);
    };

    let mut merged = serde_json::to_value(current).map_err(SettingsError::InvalidField)?;
    if let Some(fields) = merged.as_object_mut() {
        for (key, value) in changes {
            if fields.contains_key(&key) {
                fields.insert(key, value);
            } else {
                tracing::debug!(key = %key, "ignoring unknown settings key");
            }
        }
    }

    let next: GameSettings = serde_json::from_value(merged).map_err(SettingsError::InvalidField)?;
    next.validate()?;
    Ok(next)
}

pub trait SettingsStore {
    fn load(&self) -> GameSettings;
    fn save(&self, settings: &GameSettings) -> std::io::Result<()>;
}

/// Keeps the settings as a query string in a small file, mirroring how they appear on
/// the command line.
#[derive(Debug, Clone)]
pub struct QueryFileStore {
    path: PathBuf,
}

impl QueryFileStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "fingers") {
            pd.config_dir().join("settings.query")
        } else {
            PathBuf::from("fingers_settings.query")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for QueryFileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for QueryFileStore {
    fn load(&self) -> GameSettings {
        match fs::read_to_string(&self.path) {
            Ok(query) => GameSettings::from_query(&query),
            Err(_) => GameSettings::default(),
        }
    }

    fn save(&self, settings: &GameSettings) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, settings.to_query())
    }
}
