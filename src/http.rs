// Shared blocking HTTP client. One `Client` is built per run and cloned
// into the catalog, downloader and VK helpers.

use std::time::Duration;

use reqwest::blocking::{Client, Response};

use crate::error::{PublishError, Result};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub fn build_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// Turn a non-success status into `RemoteFetch`, otherwise hand the
/// response back for decoding.
pub fn ensure_success(res: Response) -> Result<Response> {
    let status = res.status();
    if !status.is_success() {
        return Err(PublishError::RemoteFetch {
            url: res.url().to_string(),
            status: status.as_u16(),
        });
    }
    Ok(res)
}
