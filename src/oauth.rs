// Developer helper for obtaining a VK access token by hand: build the
// implicit-flow authorize URL and resolve it to the page the user should
// open in a browser.

use reqwest::blocking::Client;
use url::Url;

use crate::error::{PublishError, Result};
use crate::http::ensure_success;

pub const AUTHORIZE_URL: &str = "https://oauth.vk.com/authorize";
pub const SCOPE: &str = "photos,groups,wall";

pub fn authorize_url(base: &str, app_id: u64) -> Result<Url> {
    Url::parse_with_params(
        base,
        &[
            ("client_id", app_id.to_string()),
            ("scope", SCOPE.to_string()),
            ("response_type", "token".to_string()),
        ],
    )
    .map_err(|e| PublishError::malformed(base, e))
}

/// Request the authorize URL, following redirects, and return the final
/// URL the server landed on.
pub fn resolve_authorize_url(client: &Client, url: Url) -> Result<Url> {
    let res = ensure_success(client.get(url).send()?)?;
    Ok(res.url().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_client_and_scope() {
        let url = authorize_url(AUTHORIZE_URL, 51234).unwrap();
        assert_eq!(url.host_str(), Some("oauth.vk.com"));
        assert_eq!(url.path(), "/authorize");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".into(), "51234".into())));
        assert!(pairs.contains(&("scope".into(), "photos,groups,wall".into())));
        assert!(pairs.contains(&("response_type".into(), "token".into())));
    }

    #[test]
    fn invalid_base_is_rejected() {
        assert!(authorize_url("oauth.vk.com/authorize", 1).is_err());
    }
}
