// Prints the VK authorize page for `VK_APP_ID`. Open it in a browser,
// grant access, and copy `access_token` from the redirect into `.env`.

use anyhow::Context;
use xkcd_vk_publisher::{http::build_client, init_logging, oauth};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let app_id: u64 = std::env::var("VK_APP_ID")
        .context("VK_APP_ID is not set")?
        .trim()
        .parse()
        .context("VK_APP_ID must be a positive integer")?;

    let url = oauth::authorize_url(oauth::AUTHORIZE_URL, app_id)?;
    let timeout = std::time::Duration::from_secs(xkcd_vk_publisher::config::DEFAULT_TIMEOUT_SECS);
    let client = build_client(timeout)?;
    let resolved = oauth::resolve_authorize_url(&client, url)?;
    tracing::debug!(%resolved, "resolved authorize url");

    println!("{resolved}");
    Ok(())
}
