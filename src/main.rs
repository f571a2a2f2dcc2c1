// Entrypoint for the publisher.
// - Loads `.env` and the configuration once, then runs the pipeline.
// - Returns `anyhow::Result` so any failure exits non-zero with its cause.

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use xkcd_vk_publisher::{init_logging, xkcd::pick_comic_id, Config, Publisher};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = Config::from_env().context("Failed to load configuration")?;
    let publisher = Publisher::new(&config)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = publisher.run(
        |latest| pick_comic_id(latest, &mut rand::thread_rng()),
        |stage| spinner.set_message(stage.to_string()),
    );
    spinner.finish_and_clear();

    let report = result.context("Publishing failed")?;
    println!(
        "Posted comic #{} as {} (post {})",
        report.comic_id, report.attachment, report.post_id
    );
    Ok(())
}
