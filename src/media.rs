// Local media handling: derive a file name from the image URL, download
// the bytes, and hold the file in a guard that removes it when dropped.

use std::fs;
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use tracing::{debug, warn};
use url::Url;

use crate::error::{PublishError, Result};
use crate::http::ensure_success;

/// A downloaded file owned by the pipeline. The file is removed when the
/// guard is dropped, so every exit path cleans up after itself.
#[derive(Debug)]
pub struct LocalMediaFile {
    path: Option<PathBuf>,
    len: u64,
}

impl LocalMediaFile {
    /// Take ownership of an existing file on disk.
    pub fn adopt(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let len = fs::metadata(&path)
            .map_err(|e| PublishError::io(&path, e))?
            .len();
        Ok(Self {
            path: Some(path),
            len,
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn file_name(&self) -> String {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Remove the file now and report failures instead of logging them.
    pub fn remove(mut self) -> Result<()> {
        match self.path.take() {
            Some(path) => fs::remove_file(&path).map_err(|e| PublishError::io(path, e)),
            None => Ok(()),
        }
    }
}

impl Drop for LocalMediaFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "removed temporary media file"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove temporary media file"),
            }
        }
    }
}

/// Final path segment of `url`, used as the local file name.
pub fn file_name_from_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| PublishError::malformed(url, e))?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| PublishError::malformed(url, "image URL has no file name"))
}

/// Download `url` into `dir`, creating the directory if needed and
/// overwriting any file of the same name.
pub fn download(client: &Client, url: &str, dir: &Path) -> Result<LocalMediaFile> {
    let name = file_name_from_url(url)?;
    fs::create_dir_all(dir).map_err(|e| PublishError::io(dir, e))?;
    let path = dir.join(name);

    let res = ensure_success(client.get(url).send()?)?;
    let bytes = res.bytes()?;
    let file = store(path, &bytes)?;
    debug!(path = %file.path().display(), bytes = file.len(), "downloaded media");
    Ok(file)
}

/// Write `bytes` to `path` under a guard, so a partial write is removed
/// along with the error.
fn store(path: PathBuf, bytes: &[u8]) -> Result<LocalMediaFile> {
    let mut file = LocalMediaFile {
        path: Some(path),
        len: 0,
    };
    fs::write(file.path(), bytes).map_err(|e| PublishError::io(file.path(), e))?;
    file.len = bytes.len() as u64;
    Ok(file)
}
