//! Run configuration, read from the environment.
//!
//! Everything a run needs is collected here once and handed to the
//! collector, the source and the stores; nothing else reads the
//! environment.  A `.env` file in the working directory is honoured.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;

use crate::collector::CollectPolicy;
use crate::filter::KeywordFilter;
use crate::source::Credentials;
use crate::store::{OutputFormat, OutputTarget};

const DEFAULT_KEYWORDS: &str = "Day,ML";
const DEFAULT_OUTPUT: &str = "tweets.csv";
const DEFAULT_FEED_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug)]
pub struct Config {
    /// Profile whose feed is collected.
    pub profile: String,
    pub credentials: Credentials,
    pub keywords: KeywordFilter,
    pub policy: CollectPolicy,
    /// First entry is `OUTPUT_PATH`; the rest come from `EXTRA_OUTPUTS`.
    pub outputs: Vec<OutputTarget>,
    pub feed_base_url: String,
    pub session_timeout: Duration,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.log_summary();
        Ok(config)
    }

    /// Build from any key lookup.  Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| anyhow!("missing required environment variable {key}"))
        };

        let profile = required("TWEET_PROFILE")?;
        let credentials = Credentials::new(required("TWITTER_USERNAME")?, required("TWITTER_PASSWORD")?);

        let keywords = KeywordFilter::new(split_list(
            &get("TWEET_KEYWORDS").unwrap_or_else(|| DEFAULT_KEYWORDS.to_string()),
        ));

        let policy = CollectPolicy {
            max_items: parse_or(&get, "MAX_ITEMS", 100)?,
            max_stagnation: parse_or(&get, "MAX_STAGNATION", 5)?,
            settle_delay: Duration::from_millis(parse_or(&get, "SETTLE_DELAY_MS", 2000)?),
            initial_wait: Duration::from_secs(parse_or(&get, "CONTENT_TIMEOUT_SECS", 90)?),
        };
        if policy.max_items == 0 {
            bail!("MAX_ITEMS must be at least 1");
        }
        if policy.max_stagnation == 0 {
            bail!("MAX_STAGNATION must be at least 1");
        }

        let output_path = PathBuf::from(get("OUTPUT_PATH").unwrap_or_else(|| DEFAULT_OUTPUT.to_string()));
        let primary = match get("OUTPUT_FORMAT") {
            Some(name) => {
                let format = OutputFormat::from_str(&name)
                    .map_err(|e| anyhow!(e))
                    .context("invalid OUTPUT_FORMAT")?;
                OutputTarget::new(output_path, format)
            }
            None => OutputTarget::inferred(output_path),
        };
        let mut outputs = vec![primary];
        if let Some(extra) = get("EXTRA_OUTPUTS") {
            for path in split_list(&extra) {
                let target = OutputTarget::inferred(path);
                if !outputs.iter().any(|o| o.path == target.path) {
                    outputs.push(target);
                }
            }
        }

        Ok(Self {
            profile,
            credentials,
            keywords,
            policy,
            outputs,
            feed_base_url: get("FEED_BASE_URL").unwrap_or_else(|| DEFAULT_FEED_BASE_URL.to_string()),
            session_timeout: Duration::from_secs(parse_or(&get, "SESSION_TIMEOUT_SECS", 30)?),
            request_timeout: Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECS", 20)?),
        })
    }

    fn log_summary(&self) {
        info!("Config loaded:");
        info!("  profile           = {}", self.profile);
        info!("  username          = {}", self.credentials.username);
        info!("  keywords          = {:?}", self.keywords.keywords());
        info!("  max_items         = {}", self.policy.max_items);
        info!("  max_stagnation    = {}", self.policy.max_stagnation);
        info!("  settle_delay      = {:?}", self.policy.settle_delay);
        info!("  feed_base_url     = {}", self.feed_base_url);
        for out in &self.outputs {
            info!("  output            = {} ({})", out.path.display(), out.format);
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid value for {key}: `{raw}`")),
        None => Ok(default),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("TWEET_PROFILE", "wateriscoding"),
        ("TWITTER_USERNAME", "bot"),
        ("TWITTER_PASSWORD", "hunter2"),
    ];

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(env(BASE)).unwrap();

        assert_eq!(config.profile, "wateriscoding");
        assert_eq!(config.keywords.keywords(), &["day".to_string(), "ml".to_string()]);
        assert_eq!(config.policy, CollectPolicy::default());
        assert_eq!(
            config.outputs,
            vec![OutputTarget::new("tweets.csv", OutputFormat::Tabular)]
        );
        assert_eq!(config.feed_base_url, DEFAULT_FEED_BASE_URL);
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let err = Config::from_lookup(env(&[("TWEET_PROFILE", "x"), ("TWITTER_USERNAME", "bot")]))
            .unwrap_err();
        assert!(err.to_string().contains("TWITTER_PASSWORD"));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let mut pairs = BASE.to_vec();
        pairs.push(("MAX_ITEMS", "  "));
        let config = Config::from_lookup(env(&pairs)).unwrap();
        assert_eq!(config.policy.max_items, 100);
    }

    #[test]
    fn bad_number_names_the_variable() {
        let mut pairs = BASE.to_vec();
        pairs.push(("MAX_STAGNATION", "lots"));
        let err = Config::from_lookup(env(&pairs)).unwrap_err();
        assert!(format!("{err:#}").contains("MAX_STAGNATION"));
    }

    #[test]
    fn outputs_and_formats() {
        let mut pairs = BASE.to_vec();
        pairs.push(("OUTPUT_PATH", "waterIsCoding.txt"));
        pairs.push(("OUTPUT_FORMAT", "structured"));
        pairs.push(("EXTRA_OUTPUTS", "../client/WaterCodes.json, waterIsCoding.txt ,mirror.csv"));
        let config = Config::from_lookup(env(&pairs)).unwrap();

        assert_eq!(
            config.outputs,
            vec![
                OutputTarget::new("waterIsCoding.txt", OutputFormat::Structured),
                OutputTarget::new("../client/WaterCodes.json", OutputFormat::Structured),
                OutputTarget::new("mirror.csv", OutputFormat::Tabular),
            ]
        );
    }

    #[test]
    fn keywords_and_limits_are_configurable() {
        let mut pairs = BASE.to_vec();
        pairs.push(("TWEET_KEYWORDS", "Day, of ,Coding"));
        pairs.push(("MAX_ITEMS", "7"));
        pairs.push(("SETTLE_DELAY_MS", "0"));
        let config = Config::from_lookup(env(&pairs)).unwrap();

        assert!(config.keywords.matches("Day 3 of coding"));
        assert!(!config.keywords.matches("Day 3 of ML"));
        assert_eq!(config.policy.max_items, 7);
        assert_eq!(config.policy.settle_delay, Duration::ZERO);
    }

    #[test]
    fn zero_max_items_is_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("MAX_ITEMS", "0"));
        assert!(Config::from_lookup(env(&pairs)).is_err());
    }

    #[test]
    fn zero_max_stagnation_is_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("MAX_STAGNATION", "0"));
        let err = Config::from_lookup(env(&pairs)).unwrap_err();
        assert!(err.to_string().contains("MAX_STAGNATION"));
    }
}
