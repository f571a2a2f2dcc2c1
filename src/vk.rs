// VK API client: the three-step wall photo upload (upload server, raw
// upload, save) and the wall post that attaches the saved photo.
//
// VK answers most failures with HTTP 200 and an `error` object in the
// body, so every reply goes through `check_embedded_error` before it is
// decoded.

use std::fmt;
use std::fs::File;
use std::path::Path;

use reqwest::blocking::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{PublishError, Result};
use crate::media::LocalMediaFile;

/// HTTP verb used for a VK method call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// One-time upload destination returned by `photos.getWallUploadServer`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UploadTarget {
    pub upload_url: String,
    pub user_id: i64,
}

/// Descriptor returned by the upload server, consumed by `photos.saveWallPhoto`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UploadedMedia {
    #[serde(rename = "photo")]
    pub photo_token: String,
    #[serde(rename = "server", deserialize_with = "string_or_number")]
    pub server_id: String,
    pub hash: String,
}

/// Durable photo reference that can be attached to posts.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SavedPhoto {
    pub owner_id: i64,
    #[serde(rename = "id")]
    pub photo_id: i64,
}

impl SavedPhoto {
    /// Attachment reference for `wall.post`, e.g. `photo-100_55`.
    pub fn attachment(&self) -> String {
        format!("photo{}_{}", self.owner_id, self.photo_id)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PostCreated {
    pub post_id: i64,
}

/// A new wall post with a single attachment.
#[derive(Debug, Clone)]
pub struct WallPost<'a> {
    pub owner_id: i64,
    pub from_group: bool,
    pub attachment: &'a str,
    pub message: &'a str,
}

#[derive(Deserialize)]
struct Envelope<T> {
    response: T,
}

/// Client holding the blocking HTTP client, the method endpoint root and
/// the credentials sent with every call.
#[derive(Clone)]
pub struct VkClient {
    client: Client,
    api_url: String,
    access_token: String,
    version: String,
}

impl fmt::Debug for VkClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VkClient")
            .field("api_url", &self.api_url)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl VkClient {
    pub fn new(
        client: Client,
        api_url: impl Into<String>,
        access_token: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            version: version.into(),
        }
    }

    pub fn from_config(client: Client, config: &Config) -> Self {
        Self::new(
            client,
            &config.vk_api_url,
            &config.access_token,
            &config.vk_api_version,
        )
    }

    /// Call a VK method and decode its `response` member. Credentials and
    /// API version are added to `params`.
    pub fn call<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        name: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}/{}", self.api_url, name);
        let mut query: Vec<(&str, String)> = vec![
            ("access_token", self.access_token.clone()),
            ("v", self.version.clone()),
        ];
        query.extend(params.iter().cloned());

        debug!(method = ?method, name, "calling VK method");
        let req = match method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        };
        let res = req.query(&query).send().map_err(without_url)?;

        let status = res.status();
        if !status.is_success() {
            // The URL carries the access token, so only the method name is reported.
            return Err(PublishError::RemoteFetch {
                url: name.to_string(),
                status: status.as_u16(),
            });
        }
        let envelope: Envelope<T> = decode(name, res)?;
        Ok(envelope.response)
    }

    /// Step 1: request a one-time upload URL for a wall photo.
    pub fn wall_upload_server(&self, group_id: u64) -> Result<UploadTarget> {
        self.call(
            HttpMethod::Get,
            "photos.getWallUploadServer",
            &[("group_id", group_id.to_string())],
        )
    }

    /// Step 2: send the file as multipart field `photo` to the upload URL.
    pub fn upload_photo(&self, target: &UploadTarget, file: &LocalMediaFile) -> Result<UploadedMedia> {
        let part = photo_part(file.path(), file.file_name())?;
        let form = multipart::Form::new().part("photo", part);

        let res = self.client.post(&target.upload_url).multipart(form).send().map_err(without_url)?;
        let status = res.status();
        if !status.is_success() {
            return Err(PublishError::Upload {
                status: status.as_u16(),
            });
        }
        let uploaded: UploadedMedia = decode("photo upload", res)?;
        // The upload server reports a rejected file as an empty photo list.
        if uploaded.photo_token.is_empty() || uploaded.photo_token == "[]" {
            return Err(PublishError::malformed(
                "photo upload",
                "upload server accepted no photo",
            ));
        }
        debug!(server = %uploaded.server_id, "photo uploaded");
        Ok(uploaded)
    }

    /// Step 3: turn the upload descriptor into a saved wall photo.
    pub fn save_wall_photo(
        &self,
        group_id: u64,
        user_id: i64,
        uploaded: &UploadedMedia,
        caption: &str,
    ) -> Result<SavedPhoto> {
        let saved: Vec<SavedPhoto> = self.call(
            HttpMethod::Post,
            "photos.saveWallPhoto",
            &[
                ("group_id", group_id.to_string()),
                ("user_id", user_id.to_string()),
                ("photo", uploaded.photo_token.clone()),
                ("server", uploaded.server_id.clone()),
                ("hash", uploaded.hash.clone()),
                ("caption", caption.to_string()),
            ],
        )?;
        saved
            .into_iter()
            .next()
            .ok_or_else(|| PublishError::malformed("photos.saveWallPhoto", "no saved photo in response"))
    }

    /// Publish a post on a wall. A negative owner id targets a group wall.
    pub fn post_on_wall(&self, post: &WallPost<'_>) -> Result<PostCreated> {
        let created: PostCreated = self.call(
            HttpMethod::Get,
            "wall.post",
            &[
                ("owner_id", post.owner_id.to_string()),
                ("from_group", u8::from(post.from_group).to_string()),
                ("attachments", post.attachment.to_string()),
                ("message", post.message.to_string()),
            ],
        )?;
        info!(owner_id = post.owner_id, post_id = created.post_id, "wall post created");
        Ok(created)
    }
}

/// Fail if a VK reply carries an `error` member. VK methods send
/// `{"error": {"error_code": .., "error_msg": ..}}`; upload servers may
/// send a bare string instead.
pub fn check_embedded_error(body: &Value) -> Result<()> {
    let Some(error) = body.get("error") else {
        return Ok(());
    };
    match error {
        Value::Null => Ok(()),
        Value::String(message) => Err(PublishError::embedded(0, message.clone())),
        Value::Object(fields) => {
            let code = fields.get("error_code").and_then(Value::as_i64).unwrap_or(0);
            let message = fields
                .get("error_msg")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            Err(PublishError::embedded(code, message))
        }
        other => Err(PublishError::embedded(0, other.to_string())),
    }
}

fn decode<T: DeserializeOwned>(context: &str, res: Response) -> Result<T> {
    let body = res.bytes().map_err(without_url)?;
    let value: Value =
        serde_json::from_slice(&body).map_err(|e| PublishError::malformed(context, e))?;
    check_embedded_error(&value)?;
    serde_json::from_value(value).map_err(|e| PublishError::malformed(context, e))
}

/// Method URLs carry the access token and upload URLs carry signed
/// parameters, so neither is kept in the error.
fn without_url(err: reqwest::Error) -> PublishError {
    PublishError::Http(err.without_url())
}

fn photo_part(path: &Path, file_name: String) -> Result<multipart::Part> {
    let file = File::open(path).map_err(|e| PublishError::io(path, e))?;
    let mime = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("png") => "image/png",
        Some(ext) if ext.eq_ignore_ascii_case("gif") => "image/gif",
        Some(ext) if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") => {
            "image/jpeg"
        }
        _ => "application/octet-stream",
    };
    let part = multipart::Part::reader(file)
        .file_name(file_name)
        .mime_str(mime)?;
    Ok(part)
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transport_error_does_not_expose_token() {
        let client = crate::http::build_client(std::time::Duration::from_secs(2)).unwrap();
        let vk = VkClient::new(client, "http://127.0.0.1:1/method", "SECRET-TOKEN-123", "5.131");

        let err = vk.wall_upload_server(1).unwrap_err();
        assert!(matches!(err, PublishError::Http(_)));

        let mut chain = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            chain.push_str(&format!(": {cause}"));
            source = cause.source();
        }
        assert!(!chain.contains("SECRET-TOKEN-123"), "token in error: {chain}");
    }

    #[test]
    fn attachment_string_uses_owner_and_photo_id() {
        let saved = SavedPhoto {
            owner_id: -100,
            photo_id: 55,
        };
        assert_eq!(saved.attachment(), "photo-100_55");
    }

    #[test]
    fn reply_without_error_passes() {
        let body = json!({"response": {"upload_url": "https://up", "user_id": 1}});
        assert!(check_embedded_error(&body).is_ok());
    }

    #[test]
    fn error_object_surfaces_message() {
        let body = json!({"error": {"error_code": 100, "error_msg": "One of the parameters specified was missing or invalid"}});
        match check_embedded_error(&body) {
            Err(PublishError::Platform { code, message }) => {
                assert_eq!(code, 100);
                assert_eq!(message, "One of the parameters specified was missing or invalid");
            }
            other => panic!("expected platform error, got {other:?}"),
        }
    }

    #[test]
    fn auth_error_object_becomes_auth_error() {
        let body = json!({"error": {"error_code": 5, "error_msg": "User authorization failed: invalid access_token (4)."}});
        assert!(matches!(
            check_embedded_error(&body),
            Err(PublishError::Auth { code: 5, .. })
        ));
    }

    #[test]
    fn bare_string_error_is_surfaced() {
        let body = json!({"error": "ERR_UPLOAD_BAD_IMAGE_SIZE: market photo min size 400x400"});
        match check_embedded_error(&body) {
            Err(PublishError::Platform { message, .. }) => {
                assert!(message.starts_with("ERR_UPLOAD_BAD_IMAGE_SIZE"));
            }
            other => panic!("expected platform error, got {other:?}"),
        }
    }

    #[test]
    fn uploaded_media_accepts_numeric_server() {
        let media: UploadedMedia =
            serde_json::from_value(json!({"photo": "[{\"photo\":\"abc\"}]", "server": 852136, "hash": "f0e1"}))
                .unwrap();
        assert_eq!(media.server_id, "852136");

        let media: UploadedMedia =
            serde_json::from_value(json!({"photo": "p", "server": "s", "hash": "h"})).unwrap();
        assert_eq!(media.server_id, "s");
        assert_eq!(media.photo_token, "p");
    }

    #[test]
    fn saved_photo_reads_id_field() {
        let envelope: Envelope<Vec<SavedPhoto>> =
            serde_json::from_value(json!({"response": [{"owner_id": -100, "id": 55, "album_id": -14}]}))
                .unwrap();
        assert_eq!(
            envelope.response,
            vec![SavedPhoto {
                owner_id: -100,
                photo_id: 55
            }]
        );
    }
}
