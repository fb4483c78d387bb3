use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use eurostat_error::{EurostatError, Result};
use eurostat_http::settings::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, HttpSettings};

use crate::fetch::FetchOptions;

pub const DEFAULT_BATCH_SIZE: usize = 2048;
pub const DEFAULT_LANGUAGE: &str = "en";

/// Configuration for reading from the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EurostatConfig {
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub max_concurrent_requests: u64,
    pub batch_size: u64,
    pub language: String,
}

impl Default for EurostatConfig {
    fn default() -> Self {
        EurostatConfig {
            http_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_concurrent_requests: 1,
            batch_size: DEFAULT_BATCH_SIZE as u64,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl EurostatConfig {
    pub fn set_from_str(&mut self, name: &str, value: &str) -> Result<()> {
        let func = get_functions(name)?;
        (func.set)(value, self)
    }

    pub fn get_as_string(&self, name: &str) -> Result<String> {
        let func = get_functions(name)?;
        Ok((func.get)(self))
    }

    pub fn reset(&mut self, name: &str) -> Result<()> {
        let def_conf = Self::default();
        let func = get_functions(name)?;
        let value = (func.get)(&def_conf);
        (func.set)(&value, self)
    }

    /// Set a setting from a `name=value` pair.
    pub fn set_from_pair(&mut self, pair: &str) -> Result<()> {
        let (name, value) = pair.split_once('=').ok_or_else(|| {
            EurostatError::invalid_input("Expected setting in the form 'name=value'")
                .with_field("setting", pair)
        })?;
        self.set_from_str(name.trim(), value.trim())
    }

    /// List all settings with their descriptions and current values, sorted
    /// by name.
    pub fn settings(&self) -> Vec<(&'static str, &'static str, String)> {
        let mut settings: Vec<_> = GET_SET_FUNCTIONS
            .iter()
            .map(|(name, func)| (*name, func.description, (func.get)(self)))
            .collect();
        settings.sort_by_key(|(name, _, _)| *name);
        settings
    }

    /// Http settings to capture before the first request.
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.http_timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }

    pub fn fetch_options(&self, derive_geo_level: bool) -> FetchOptions {
        FetchOptions {
            derive_geo_level,
            max_concurrent_requests: self.max_concurrent_requests as usize,
        }
    }
}

fn get_functions(name: &str) -> Result<&'static SettingFunctions> {
    GET_SET_FUNCTIONS.get(name).ok_or_else(|| {
        EurostatError::invalid_input(format!("Missing setting for '{name}'"))
    })
}

struct SettingFunctions {
    description: &'static str,
    set: fn(value: &str, conf: &mut EurostatConfig) -> Result<()>,
    get: fn(conf: &EurostatConfig) -> String,
}

impl SettingFunctions {
    const fn new<S: Setting>() -> Self {
        SettingFunctions {
            description: S::DESCRIPTION,
            set: S::set_from_str as _,
            get: S::get_as_string as _,
        }
    }
}

fn insert_setting<S: Setting>(map: &mut HashMap<&'static str, SettingFunctions>) {
    if map.insert(S::NAME, SettingFunctions::new::<S>()).is_some() {
        panic!("Duplicate settings names: {}", S::NAME);
    }
}

static GET_SET_FUNCTIONS: LazyLock<HashMap<&'static str, SettingFunctions>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    insert_setting::<HttpTimeoutSecs>(&mut map);
    insert_setting::<UserAgent>(&mut map);
    insert_setting::<MaxConcurrentRequests>(&mut map);
    insert_setting::<BatchSize>(&mut map);
    insert_setting::<Language>(&mut map);

    map
});

pub trait Setting: Sync + Send + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn set_from_str(value: &str, conf: &mut EurostatConfig) -> Result<()>;
    fn get_as_string(conf: &EurostatConfig) -> String;
}

fn parse_bounded(name: &str, value: &str, min: u64, max: u64) -> Result<u64> {
    let val = value.parse::<u64>().map_err(|_| {
        EurostatError::invalid_input(format!("Invalid value for '{name}', expected an integer"))
            .with_field("value", value)
    })?;

    if val < min {
        return Err(EurostatError::invalid_input(format!(
            "'{name}' cannot be less than {min}"
        )));
    }
    if val > max {
        return Err(EurostatError::invalid_input(format!(
            "'{name}' cannot be greater than {max}"
        )));
    }

    Ok(val)
}

pub struct HttpTimeoutSecs;

impl Setting for HttpTimeoutSecs {
    const NAME: &'static str = "http_timeout_secs";
    const DESCRIPTION: &'static str = "Timeout in seconds for each http request";

    fn set_from_str(value: &str, conf: &mut EurostatConfig) -> Result<()> {
        conf.http_timeout_secs = parse_bounded(Self::NAME, value, 1, 3600)?;
        Ok(())
    }

    fn get_as_string(conf: &EurostatConfig) -> String {
        conf.http_timeout_secs.to_string()
    }
}

pub struct UserAgent;

impl Setting for UserAgent {
    const NAME: &'static str = "user_agent";
    const DESCRIPTION: &'static str = "User agent sent with each http request";

    fn set_from_str(value: &str, conf: &mut EurostatConfig) -> Result<()> {
        if value.is_empty() {
            return Err(EurostatError::invalid_input("User agent cannot be empty"));
        }
        conf.user_agent = value.to_string();
        Ok(())
    }

    fn get_as_string(conf: &EurostatConfig) -> String {
        conf.user_agent.clone()
    }
}

pub struct MaxConcurrentRequests;

impl Setting for MaxConcurrentRequests {
    const NAME: &'static str = "max_concurrent_requests";
    const DESCRIPTION: &'static str =
        "Number of data requests in flight at once, 1 fetches sequentially";

    fn set_from_str(value: &str, conf: &mut EurostatConfig) -> Result<()> {
        conf.max_concurrent_requests = parse_bounded(Self::NAME, value, 1, 64)?;
        Ok(())
    }

    fn get_as_string(conf: &EurostatConfig) -> String {
        conf.max_concurrent_requests.to_string()
    }
}

const MIN_BATCH_SIZE: u64 = 1;
const MAX_BATCH_SIZE: u64 = 8192;

pub struct BatchSize;

impl Setting for BatchSize {
    const NAME: &'static str = "batch_size";
    const DESCRIPTION: &'static str = "Maximum number of rows in each output batch";

    fn set_from_str(value: &str, conf: &mut EurostatConfig) -> Result<()> {
        conf.batch_size = parse_bounded(Self::NAME, value, MIN_BATCH_SIZE, MAX_BATCH_SIZE)?;
        Ok(())
    }

    fn get_as_string(conf: &EurostatConfig) -> String {
        conf.batch_size.to_string()
    }
}

pub struct Language;

impl Setting for Language {
    const NAME: &'static str = "language";
    const DESCRIPTION: &'static str = "Language for labels, e.g. 'en', 'de' or 'fr'";

    fn set_from_str(value: &str, conf: &mut EurostatConfig) -> Result<()> {
        if value.len() != 2 || !value.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(EurostatError::invalid_input(
                "Language must be a two letter code",
            )
            .with_field("value", value));
        }
        conf.language = value.to_ascii_lowercase();
        Ok(())
    }

    fn get_as_string(conf: &EurostatConfig) -> String {
        conf.language.clone()
    }
}

#[cfg(test)]
mod tests {
    use eurostat_error::ErrorKind;

    use super::*;

    #[test]
    fn set_and_get() {
        let mut conf = EurostatConfig::default();
        conf.set_from_str("batch_size", "100").unwrap();
        conf.set_from_str("language", "DE").unwrap();
        conf.set_from_pair("max_concurrent_requests = 4").unwrap();

        assert_eq!("100", conf.get_as_string("batch_size").unwrap());
        assert_eq!("de", conf.get_as_string("language").unwrap());
        assert_eq!(4, conf.fetch_options(true).max_concurrent_requests);
    }

    #[test]
    fn reset_to_default() {
        let mut conf = EurostatConfig::default();
        conf.set_from_str("http_timeout_secs", "5").unwrap();
        assert_eq!(Duration::from_secs(5), conf.http_settings().timeout);

        conf.reset("http_timeout_secs").unwrap();
        assert_eq!(DEFAULT_TIMEOUT, conf.http_settings().timeout);
    }

    #[test]
    fn invalid_settings() {
        let mut conf = EurostatConfig::default();
        let cases = [
            ("nope", "1"),
            ("batch_size", "abc"),
            ("batch_size", "0"),
            ("batch_size", "100000"),
            ("max_concurrent_requests", "0"),
            ("language", "english"),
            ("user_agent", ""),
        ];
        for (name, value) in cases {
            let err = conf.set_from_str(name, value).unwrap_err();
            assert_eq!(ErrorKind::InvalidInput, err.kind(), "{name}={value}");
        }
        assert_eq!(EurostatConfig::default(), conf);

        conf.set_from_pair("batch_size").unwrap_err();
    }

    #[test]
    fn list_settings() {
        let names: Vec<_> = EurostatConfig::default()
            .settings()
            .into_iter()
            .map(|(name, _, _)| name)
            .collect();
        assert_eq!(
            vec![
                "batch_size",
                "http_timeout_secs",
                "language",
                "max_concurrent_requests",
                "user_agent"
            ],
            names
        );
    }
}
