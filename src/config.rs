// Configuration loaded once at process start. The binaries call
// `dotenvy::dotenv()` first so a `.env` file in the working directory
// behaves like real environment variables.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{PublishError, Result};

pub const DEFAULT_MEDIA_PATH: &str = "images";
pub const DEFAULT_XKCD_BASE_URL: &str = "https://xkcd.com";
pub const DEFAULT_VK_API_URL: &str = "https://api.vk.com/method";
pub const DEFAULT_VK_API_VERSION: &str = "5.131";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Immutable settings for one run of the publisher.
#[derive(Clone)]
pub struct Config {
    pub app_id: u64,
    pub access_token: String,
    /// Stored positive; see [`Config::wall_owner_id`].
    pub group_id: i64,
    pub media_path: PathBuf,
    pub xkcd_base_url: String,
    pub vk_api_url: String,
    pub vk_api_version: String,
    pub timeout: Duration,
}

impl Config {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Empty values
    /// count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout_secs = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => parse_number("HTTP_TIMEOUT_SECS", &raw)?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(PublishError::Config {
                name: "HTTP_TIMEOUT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Config {
            app_id: parse_number("VK_APP_ID", &required(&get, "VK_APP_ID")?)?,
            access_token: required(&get, "VK_ACCESS_TOKEN")?,
            group_id: parse_group_id(&required(&get, "VK_GROUP_ID")?)?,
            media_path: get("MEDIA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MEDIA_PATH)),
            xkcd_base_url: trim_base(get("XKCD_BASE_URL"), DEFAULT_XKCD_BASE_URL),
            vk_api_url: trim_base(get("VK_API_URL"), DEFAULT_VK_API_URL),
            vk_api_version: get("VK_API_VERSION")
                .unwrap_or_else(|| DEFAULT_VK_API_VERSION.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Owner id of the group wall. VK denotes group-owned walls with a
    /// negative id.
    pub fn wall_owner_id(&self) -> i64 {
        -self.group_id
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("app_id", &self.app_id)
            .field("access_token", &"<redacted>")
            .field("group_id", &self.group_id)
            .field("media_path", &self.media_path)
            .field("xkcd_base_url", &self.xkcd_base_url)
            .field("vk_api_url", &self.vk_api_url)
            .field("vk_api_version", &self.vk_api_version)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn required<F>(get: &F, name: &'static str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    get(name).ok_or_else(|| PublishError::Config {
        name,
        reason: "is not set".to_string(),
    })
}

fn parse_number<T: FromStr>(name: &'static str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| PublishError::Config {
        name,
        reason: format!("must be a positive integer, got {raw:?}"),
    })
}

/// Group ids are positive and must stay representable once negated.
fn parse_group_id(raw: &str) -> Result<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(PublishError::Config {
            name: "VK_GROUP_ID",
            reason: format!("must be a positive integer up to {}, got {raw:?}", i64::MAX),
        }),
    }
}

fn trim_base(value: Option<String>, default: &str) -> String {
    value
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}
