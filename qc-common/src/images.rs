//! Lot image storage
//!
//! Images go either to the plant's image server or into a local directory
//! tree keyed by blend code. The server contract is:
//! - `POST {base}/upload`, multipart fields `image` (file), `blend_id`,
//!   `lot_number`; a 200 response carries JSON `{"image_path": "..."}`
//! - `GET {base}/images/{blend_id}/{lot_number}` returns the stored image

use crate::config::ImageSource;
use crate::{Error, Result};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("qc-press/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct UploadResponse {
    image_path: Option<String>,
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Client for the image upload server
#[derive(Debug, Clone)]
pub struct ImageServerClient {
    http_client: reqwest::Client,
    base_url: Url,
}

impl ImageServerClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid image server URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("Image server URL '{}' cannot be a base", base_url)));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Conventional retrieval URL for a lot's image
    pub fn image_url(&self, blend_id: &str, lot_number: i64) -> String {
        self.endpoint(&["images", blend_id, &lot_number.to_string()])
            .to_string()
    }

    /// Upload an image file and return the path the server stored it under
    pub async fn upload(&self, blend_id: &str, lot_number: i64, file: &Path) -> Result<String> {
        let bytes = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for(file))?;
        let form = reqwest::multipart::Form::new()
            .part("image", part)
            .text("blend_id", blend_id.to_string())
            .text("lot_number", lot_number.to_string());

        let url = self.endpoint(&["upload"]);
        debug!(blend_id, lot_number, %url, "Uploading lot image");

        let response = self.http_client.post(url).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            warn!("Image upload rejected with status {}", status);
            return Err(Error::Upload(status.as_u16(), body));
        }

        let parsed: UploadResponse = serde_json::from_str(&body).map_err(|e| {
            Error::Upload(status.as_u16(), format!("unreadable response ({}): {}", e, body))
        })?;

        match parsed.image_path {
            Some(path) if !path.is_empty() => {
                info!("Uploaded lot {} image for {} -> {}", lot_number, blend_id, path);
                Ok(path)
            }
            _ => Err(Error::Upload(
                status.as_u16(),
                "response has no image_path".to_string(),
            )),
        }
    }

    /// Absolute URL for an image location recorded from an upload
    ///
    /// Full URLs are used as-is; server-relative paths such as
    /// `/images/B1/3` are resolved against the base URL.
    pub fn resolve(&self, location: &str) -> Result<Url> {
        let joined = if is_url(location) {
            Url::parse(location)
        } else {
            let mut base = self.base_url.clone();
            if !base.path().ends_with('/') {
                let dir = format!("{}/", base.path());
                base.set_path(&dir);
            }
            base.join(location)
        };
        joined.map_err(|e| {
            Error::InvalidInput(format!("image location '{}' is not a valid URL: {}", location, e))
        })
    }

    /// Download an image by URL or server-relative path
    pub async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        let url = self.resolve(location)?;
        debug!(%url, "Fetching image");
        let response = self.http_client.get(url.clone()).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("image {}", url)));
        }
        if !status.is_success() {
            return Err(Error::Fetch(status.as_u16(), format!("GET {} failed", url)));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Images kept under `{root}/{blend_code}/{lot_number}.{ext}`
#[derive(Debug, Clone)]
pub struct LocalImageDir {
    root: PathBuf,
}

impl LocalImageDir {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blend_dir(&self, blend_code: &str) -> Result<PathBuf> {
        let unsafe_component = blend_code.is_empty()
            || blend_code == "."
            || blend_code == ".."
            || blend_code.contains(['/', '\\']);
        if unsafe_component {
            return Err(Error::InvalidInput(format!(
                "blend code '{}' cannot be used as a directory name",
                blend_code
            )));
        }
        Ok(self.root.join(blend_code))
    }

    /// Copy `file` into the blend's directory as the given lot
    pub async fn store(&self, blend_code: &str, lot_number: i64, file: &Path) -> Result<String> {
        let dir = self.blend_dir(blend_code)?;
        tokio::fs::create_dir_all(&dir).await?;

        let extension = file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_else(|| "img".to_string());
        let dest = dir.join(format!("{}.{}", lot_number, extension));

        tokio::fs::copy(file, &dest).await?;
        info!("Stored lot {} image for {} at {}", lot_number, blend_code, dest.display());
        Ok(dest.to_string_lossy().into_owned())
    }

    /// Find the stored file for a lot, whatever its extension
    pub async fn locate(&self, blend_code: &str, lot_number: i64) -> Result<Option<String>> {
        let dir = self.blend_dir(blend_code)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let wanted = lot_number.to_string();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.file_stem().and_then(|s| s.to_str()) == Some(wanted.as_str()) {
                return Ok(Some(path.to_string_lossy().into_owned()));
            }
        }
        Ok(None)
    }
}

/// The configured image store
#[derive(Debug, Clone)]
pub enum ImageRepository {
    Server(ImageServerClient),
    Local(LocalImageDir),
}

impl ImageRepository {
    pub fn from_source(source: &ImageSource) -> Result<Self> {
        match source {
            ImageSource::Server { url, timeout } => {
                Ok(ImageRepository::Server(ImageServerClient::new(url, *timeout)?))
            }
            ImageSource::LocalDir(dir) => Ok(ImageRepository::Local(LocalImageDir::new(dir))),
        }
    }

    /// Store an image for a lot and return the location to record
    pub async fn store(&self, blend_code: &str, lot_number: i64, file: &Path) -> Result<String> {
        if !file.is_file() {
            return Err(Error::NotFound(format!("image file {}", file.display())));
        }
        match self {
            ImageRepository::Server(client) => client.upload(blend_code, lot_number, file).await,
            ImageRepository::Local(dir) => dir.store(blend_code, lot_number, file).await,
        }
    }

    /// Where a lot's image is expected when no location was recorded
    pub async fn location_for(&self, blend_code: &str, lot_number: i64) -> Result<Option<String>> {
        match self {
            ImageRepository::Server(client) => Ok(Some(client.image_url(blend_code, lot_number))),
            ImageRepository::Local(dir) => dir.locate(blend_code, lot_number).await,
        }
    }

    /// Read image bytes for a recorded location
    ///
    /// With a server every location is remote, including server-relative
    /// paths. Locally, locations are file paths.
    pub async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        match self {
            ImageRepository::Server(client) => client.fetch(location).await,
            ImageRepository::Local(_) if is_url(location) => Err(Error::Config(format!(
                "no image server configured to fetch {}",
                location
            ))),
            _ => match tokio::fs::read(location).await {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(Error::NotFound(format!("image {}", location)))
                }
                Err(e) => Err(e.into()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_url_encodes_segments() {
        let client = ImageServerClient::new("http://10.1.2.3:25050/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.image_url("B100", 42), "http://10.1.2.3:25050/images/B100/42");
        assert_eq!(
            client.image_url("B 7/x", 1),
            "http://10.1.2.3:25050/images/B%207%2Fx/1"
        );
    }

    #[test]
    fn test_recorded_locations_resolve_against_base() {
        let client = ImageServerClient::new("http://10.1.2.3:25050", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.resolve("/images/B1/3").unwrap().as_str(),
            "http://10.1.2.3:25050/images/B1/3"
        );
        assert_eq!(
            client.resolve("http://cdn.plant/B1/3.jpg").unwrap().as_str(),
            "http://cdn.plant/B1/3.jpg"
        );

        let nested = ImageServerClient::new("http://10.1.2.3/qc", Duration::from_secs(5)).unwrap();
        assert_eq!(
            nested.resolve("stored/B1/3.jpg").unwrap().as_str(),
            "http://10.1.2.3/qc/stored/B1/3.jpg"
        );
    }

    #[test]
    fn test_invalid_server_url_is_config_error() {
        let result = ImageServerClient::new("not a url", Duration::from_secs(5));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_mime_guess() {
        assert_eq!(mime_for(Path::new("a/B.JPG")), "image/jpeg");
        assert_eq!(mime_for(Path::new("scan.png")), "image/png");
        assert_eq!(mime_for(Path::new("noext")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_local_store_and_locate() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("photo.JPG");
        std::fs::write(&src, b"jpeg bytes").unwrap();

        let images = LocalImageDir::new(&dir.path().join("images"));
        let stored = images.store("B100", 7, &src).await.unwrap();
        assert!(stored.ends_with("7.jpg"), "unexpected path {}", stored);

        assert_eq!(images.locate("B100", 7).await.unwrap(), Some(stored.clone()));
        assert_eq!(images.locate("B100", 8).await.unwrap(), None);
        assert_eq!(images.locate("B999", 1).await.unwrap(), None);

        let repo = ImageRepository::Local(images);
        assert_eq!(repo.fetch(&stored).await.unwrap(), b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_local_store_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("photo.jpg");
        std::fs::write(&src, b"x").unwrap();

        let images = LocalImageDir::new(dir.path());
        assert!(matches!(
            images.store("../etc", 1, &src).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(images.store("..", 1, &src).await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_local_repository_cannot_fetch_urls() {
        let repo = ImageRepository::Local(LocalImageDir::new(Path::new("images")));
        let result = repo.fetch("http://example.invalid/images/B1/1").await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
