use anyhow::{bail, Context, Result};

/// Custom field ID overrides; anything left unset is discovered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldOverrides {
    pub status_summary: Option<String>,
    pub color_status: Option<String>,
    pub parent_link: Option<String>,
    pub epic_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraConfig {
    pub base_url: String,
    pub email: String,
    pub api_token: String,
    pub api_version: String,
    pub timeout_secs: u64,
    pub fields: FieldOverrides,
}

/// Application configuration loaded from environment variables.
/// Fails at startup on unparseable values or a partial Jira credential set.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// `None` disables the hierarchy report endpoint.
    pub jira: Option<JiraConfig>,
    pub lookback_days: u32,
    pub recency_half_life_days: f64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the config from any variable source. Blank values count as unset.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            var(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(Config {
            port: parse_or(&get, "PORT", 8080)?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            jira: jira_config(&get)?,
            lookback_days: parse_or(&get, "LOOKBACK_DAYS", 7)?,
            recency_half_life_days: parse_or(&get, "RECENCY_HALF_LIFE_DAYS", 7.0)?,
        })
    }
}

fn jira_config(get: &impl Fn(&str) -> Option<String>) -> Result<Option<JiraConfig>> {
    let base_url = get("JIRA_BASE_URL");
    let email = get("JIRA_EMAIL");
    let api_token = get("JIRA_API_TOKEN").or_else(|| get("JIRA_PASSWORD"));

    let (base_url, email, api_token) = match (base_url, email, api_token) {
        (None, None, None) => return Ok(None),
        (Some(base_url), Some(email), Some(api_token)) => (base_url, email, api_token),
        (base_url, email, api_token) => {
            let missing: Vec<&str> = [
                ("JIRA_BASE_URL", base_url.is_none()),
                ("JIRA_EMAIL", email.is_none()),
                ("JIRA_API_TOKEN", api_token.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            bail!(
                "Incomplete Jira configuration: {} not set",
                missing.join(", ")
            );
        }
    };

    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        bail!("JIRA_BASE_URL must start with http:// or https://");
    }

    Ok(Some(JiraConfig {
        base_url,
        email,
        api_token,
        api_version: get("JIRA_API_VERSION").unwrap_or_else(|| "2".to_string()),
        timeout_secs: parse_or(get, "JIRA_TIMEOUT_SECS", 20)?,
        fields: FieldOverrides {
            status_summary: get("JIRA_STATUS_SUMMARY_FIELD_ID"),
            color_status: get("JIRA_COLOR_STATUS_FIELD_ID"),
            parent_link: get("JIRA_PARENT_LINK_FIELD_ID"),
            epic_link: get("JIRA_EPIC_LINK_FIELD_ID"),
        },
    }))
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid value, got '{raw}'")),
        None => Ok(default),
    }
}
