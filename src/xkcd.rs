// Catalog resolver for xkcd. The catalog exposes `info.0.json` for the
// latest comic and `{id}/info.0.json` for a given one.

use rand::Rng;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{PublishError, Result};
use crate::http::ensure_success;

/// Metadata of a single comic, fetched once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComicMetadata {
    pub id: u64,
    pub image_url: String,
    pub caption: String,
}

/// Wire shape of `info.0.json`. Only the fields the publisher needs.
#[derive(Deserialize)]
struct ComicInfo {
    img: String,
    alt: String,
}

#[derive(Deserialize)]
struct LatestInfo {
    num: u64,
}

#[derive(Clone)]
pub struct XkcdClient {
    client: Client,
    base_url: String,
}

impl XkcdClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Number of the most recent comic.
    pub fn latest_id(&self) -> Result<u64> {
        let url = format!("{}/info.0.json", self.base_url);
        let latest: LatestInfo = self.get_json(&url)?;
        debug!(latest = latest.num, "fetched latest comic number");
        Ok(latest.num)
    }

    pub fn comic(&self, id: u64) -> Result<ComicMetadata> {
        let url = format!("{}/{}/info.0.json", self.base_url, id);
        let info: ComicInfo = self.get_json(&url)?;
        Ok(ComicMetadata {
            id,
            image_url: info.img,
            caption: info.alt,
        })
    }

    /// Resolve a comic: fetch the latest id, let `choose` pick one in
    /// `[1, latest]`, then fetch its metadata.
    pub fn resolve<F>(&self, choose: F) -> Result<ComicMetadata>
    where
        F: FnOnce(u64) -> Result<u64>,
    {
        let latest = self.latest_id()?;
        let id = choose(latest)?;
        if id == 0 || id > latest {
            return Err(PublishError::malformed(
                "comic picker",
                format!("chose {id}, outside 1..={latest}"),
            ));
        }
        info!(id, latest, "resolved comic");
        self.comic(id)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let res = ensure_success(self.client.get(url).send()?)?;
        let body = res.bytes()?;
        serde_json::from_slice(&body).map_err(|e| PublishError::malformed(url, e))
    }
}

/// Pick an id uniformly from `[1, latest]`. A catalog reporting zero
/// comics has nothing to pick from.
pub fn pick_comic_id<R: Rng + ?Sized>(latest: u64, rng: &mut R) -> Result<u64> {
    if latest == 0 {
        return Err(PublishError::malformed(
            "xkcd latest comic",
            "catalog reports no comics",
        ));
    }
    Ok(rng.gen_range(1..=latest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn picks_within_inclusive_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen_last = false;
        for _ in 0..2_000 {
            let id = pick_comic_id(5, &mut rng).unwrap();
            assert!((1..=5).contains(&id));
            seen_last |= id == 5;
        }
        assert!(seen_last, "upper bound should be reachable");
    }

    #[test]
    fn single_comic_always_picks_one() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            assert_eq!(pick_comic_id(1, &mut rng).unwrap(), 1);
        }
    }

    #[test]
    fn empty_catalog_is_malformed() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            pick_comic_id(0, &mut rng),
            Err(PublishError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn comic_info_ignores_extra_fields() {
        let raw = r#"{"month":"3","num":353,"link":"","year":"2007","news":"",
            "safe_title":"Python","transcript":"","alt":"I wrote 20 short programs in Python yesterday.",
            "img":"https://imgs.xkcd.com/comics/python.png","title":"Python","day":"5"}"#;
        let info: ComicInfo = serde_json::from_str(raw).unwrap();
        assert_eq!(info.img, "https://imgs.xkcd.com/comics/python.png");
    }

    #[test]
    fn comic_info_without_image_fails() {
        let raw = r#"{"alt":"caption"}"#;
        assert!(serde_json::from_str::<ComicInfo>(raw).is_err());
    }
}
