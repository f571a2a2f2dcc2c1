// The publisher pipeline: resolve a comic, download it, push it through
// the VK upload flow and post it on the group wall. Every step consumes
// the previous step's output, so the run stops at the first error.

use std::fmt;

use reqwest::blocking::Client;
use tracing::{info, info_span};

use crate::config::Config;
use crate::error::Result;
use crate::http::build_client;
use crate::media;
use crate::vk::{VkClient, WallPost};
use crate::xkcd::XkcdClient;

/// Pipeline stage, reported through the progress callback before it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolvingComic,
    Downloading,
    RequestingUploadServer,
    Uploading,
    SavingPhoto,
    Posting,
    CleaningUp,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Stage::ResolvingComic => "Picking a random comic...",
            Stage::Downloading => "Downloading image...",
            Stage::RequestingUploadServer => "Requesting upload server...",
            Stage::Uploading => "Uploading photo...",
            Stage::SavingPhoto => "Saving wall photo...",
            Stage::Posting => "Posting on the wall...",
            Stage::CleaningUp => "Removing local file...",
        };
        f.write_str(msg)
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub comic_id: u64,
    pub attachment: String,
    pub post_id: i64,
}

pub struct Publisher<'a> {
    config: &'a Config,
    http: Client,
    xkcd: XkcdClient,
    vk: VkClient,
}

impl<'a> Publisher<'a> {
    pub fn new(config: &'a Config) -> Result<Self> {
        let http = build_client(config.timeout)?;
        Ok(Self::with_client(config, http))
    }

    pub fn with_client(config: &'a Config, http: Client) -> Self {
        Self {
            config,
            xkcd: XkcdClient::new(http.clone(), &config.xkcd_base_url),
            vk: VkClient::from_config(http.clone(), config),
            http,
        }
    }

    /// Run the whole pipeline once. `choose` receives the latest comic
    /// number and returns the id to publish; `progress` is told about each
    /// stage before it starts.
    pub fn run<C, P>(&self, choose: C, mut progress: P) -> Result<PublishReport>
    where
        C: FnOnce(u64) -> Result<u64>,
        P: FnMut(Stage),
    {
        progress(Stage::ResolvingComic);
        let comic = self.xkcd.resolve(choose)?;
        let span = info_span!("publish", comic_id = comic.id);
        let _enter = span.enter();

        progress(Stage::Downloading);
        // Dropping `file` removes it, so any error below still cleans up.
        let file = media::download(&self.http, &comic.image_url, &self.config.media_path)?;
        info!(path = %file.path().display(), bytes = file.len(), "image downloaded");

        progress(Stage::RequestingUploadServer);
        let target = self.vk.wall_upload_server(self.config.app_id)?;

        progress(Stage::Uploading);
        let uploaded = self.vk.upload_photo(&target, &file)?;

        progress(Stage::SavingPhoto);
        let saved =
            self.vk
                .save_wall_photo(self.config.app_id, target.user_id, &uploaded, &comic.caption)?;
        let attachment = saved.attachment();

        progress(Stage::Posting);
        let created = self.vk.post_on_wall(&WallPost {
            owner_id: self.config.wall_owner_id(),
            from_group: true,
            attachment: &attachment,
            message: &comic.caption,
        })?;

        progress(Stage::CleaningUp);
        file.remove()?;

        Ok(PublishReport {
            comic_id: comic.id,
            attachment,
            post_id: created.post_id,
        })
    }
}
