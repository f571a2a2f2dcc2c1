// Library root
// -----------
// Publishes a random xkcd comic to a VK group wall. The binaries
// (`main.rs` and `bin/vk-auth-url.rs`) are thin wrappers around these
// modules.
//
// Module responsibilities:
// - `config`: one-time environment configuration.
// - `error`: the `PublishError` type returned by every step.
// - `http`: shared blocking HTTP client and status checking.
// - `xkcd`: catalog lookups and random comic selection.
// - `media`: image download and the self-removing local file.
// - `vk`: VK upload flow, wall post and embedded error checks.
// - `pipeline`: runs the steps above in order.
// - `oauth`: authorize URL helper for getting a token by hand.
pub mod config;
pub mod error;
pub mod http;
pub mod media;
pub mod oauth;
pub mod pipeline;
pub mod vk;
pub mod xkcd;

pub use config::Config;
pub use error::{PublishError, Result};
pub use pipeline::{PublishReport, Publisher, Stage};

/// Install the `tracing` subscriber used by both binaries. Log level comes
/// from `RUST_LOG` and defaults to `info`.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
