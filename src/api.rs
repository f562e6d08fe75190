// API client module: the publish steps that sit on top of the chunked
// uploader. Each one pushes the archive (and preview image) in chunks, puts
// the returned URLs into the record, and POSTs the record to the backend.

use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::UploadError;
use crate::ui;
use crate::upload::transport::ensure_success;
use crate::upload::{ChunkedUploader, HttpTransport, RetryPolicy};

pub const APPLICATIONS_PATH: &str = "/api/applications/";
pub const APPLICATIONS_CHUNKED_UPLOAD_PATH: &str = "/api/applications/chunked_upload/";
pub const BUILDS_PATH: &str = "/api/v2/application-builds/";
pub const BUILDS_CHUNKED_UPLOAD_PATH: &str = "/api/v2/application-builds/chunked_upload/";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TargetPlatform {
    Windows,
    Android,
}

impl TargetPlatform {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetPlatform::Windows => "windows",
            TargetPlatform::Android => "android",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationType {
    Unity,
    Unreal,
    Other,
}

impl ApplicationType {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationType::Unity => "unity",
            ApplicationType::Unreal => "unreal",
            ApplicationType::Other => "other",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum XrPlatform {
    WinVr,
    WinNonVr,
    Quest,
    Wave,
    Pico,
}

/// Build record sent to the v2 builds endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApplicationBuild {
    pub application: String,
    pub version: String,
    pub target_platform: TargetPlatform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    pub supported_xr_platforms: Vec<XrPlatform>,
    pub supports_arbitrary_cli_args: bool,
    pub launch_args: String,
    pub changelog: String,
    /// Filled in with the uploaded archive's URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_archive: Option<String>,
}

/// Application record for the v1 applications endpoint, sent as form data.
#[derive(Debug, Clone, PartialEq)]
pub struct Application {
    pub name: String,
    pub description: Option<String>,
    pub version: String,
    pub identity: Option<String>,
    pub current_version: Option<String>,
    pub application_type: ApplicationType,
    pub tags: Vec<String>,
    pub target_platform: TargetPlatform,
    pub package_name: Option<String>,
    pub executable_path: Option<String>,
    pub panoramic_preview_image: Option<PathBuf>,
    pub organization_ids: Vec<String>,
}

impl Application {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("Application name not provided. Cannot continue.");
        }
        if self.version.trim().is_empty() {
            bail!("'version' not provided. Cannot continue.");
        }
        if self.target_platform == TargetPlatform::Windows && self.executable_path.is_none() {
            bail!("'executable_path' not provided. Cannot continue.");
        }
        Ok(())
    }

    /// Form fields for the publish request. List values repeat their key.
    pub fn form_fields(
        &self,
        archive_url: &str,
        preview_image_url: Option<&str>,
    ) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("name", self.name.clone()),
            ("version", self.version.clone()),
            ("application_type", self.application_type.as_str().to_string()),
            ("target_platform", self.target_platform.as_str().to_string()),
            ("application_archive", archive_url.to_string()),
        ];
        let optional = [
            ("description_html", self.description.as_deref()),
            ("identity", self.identity.as_deref()),
            ("current_version", self.current_version.as_deref()),
            ("package_name", self.package_name.as_deref()),
            ("executable_path", self.executable_path.as_deref()),
            ("panoramic_preview_image", preview_image_url),
        ];
        fields.extend(
            optional
                .into_iter()
                .filter_map(|(key, value)| value.map(|v| (key, v.to_string()))),
        );
        fields.extend(self.tags.iter().map(|t| ("tags", t.clone())));
        fields.extend(
            self.organization_ids
                .iter()
                .map(|id| ("organization_ids", id.clone())),
        );
        fields
    }
}

/// Applications are published from `.zip` or `.apk` archives only.
pub fn validate_application_archive(archive: &Path) -> Result<()> {
    let extension = archive
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    if !matches!(extension.as_deref(), Some("zip") | Some("apk")) {
        bail!(
            "{} does not lead to a .zip or .apk file. Cannot continue.",
            archive.display()
        );
    }
    if !archive.is_file() {
        bail!("No file found under {}. Cannot continue.", archive.display());
    }
    Ok(())
}

/// A preview image path that does not point at a file is taken relative to
/// the archive's directory.
pub fn resolve_preview_image(archive: &Path, image: &Path) -> PathBuf {
    if image.is_file() {
        return image.to_path_buf();
    }
    archive
        .parent()
        .map(|dir| dir.join(image))
        .unwrap_or_else(|| image.to_path_buf())
}

/// Holds a blocking client, the resolved settings and the authorization
/// header attached to every request.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    settings: Settings,
    authorization: String,
}

impl ApiClient {
    pub fn new(settings: Settings, authorization: String) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient {
            client,
            settings,
            authorization,
        })
    }

    fn uploader(&self, url: &str, file_name: &str) -> ChunkedUploader {
        let transport = HttpTransport::with_client(self.client.clone(), url, &self.authorization);
        ChunkedUploader::with_transport(transport)
            .retry_policy(self.settings.retry.clone())
            .progress(ui::upload_progress(file_name, self.settings.quiet))
    }

    /// Chunk-upload `path` to the collection at `url` and return the URL of
    /// the assembled file.
    pub fn upload_file(&self, url: &str, path: &Path) -> Result<String> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.uploader(url, &file_name)
            .upload_chunked_file(path, self.settings.chunk_size)
            .with_context(|| format!("Failed to upload {}", path.display()))
    }

    /// Upload a build archive and register the build.
    pub fn upload_application_build(
        &self,
        archive: &Path,
        mut build: ApplicationBuild,
    ) -> Result<Value> {
        let chunked_url = self.settings.api_url(BUILDS_CHUNKED_UPLOAD_PATH)?;
        let builds_url = self.settings.api_url(BUILDS_PATH)?;

        build.application_archive = Some(self.upload_file(chunked_url.as_str(), archive)?);

        self.publish("publish of application build", &RetryPolicy::none(), || {
            self.client.post(builds_url.clone()).json(&build)
        })
    }

    /// Upload an application archive plus optional panoramic preview image
    /// and publish the application.
    pub fn upload_application(&self, archive: &Path, app: &Application) -> Result<Value> {
        validate_application_archive(archive)?;
        app.validate()?;

        let chunked_url = self.settings.api_url(APPLICATIONS_CHUNKED_UPLOAD_PATH)?;
        let applications_url = self.settings.api_url(APPLICATIONS_PATH)?;

        let archive_url = self.upload_file(chunked_url.as_str(), archive)?;
        let preview_url = match &app.panoramic_preview_image {
            Some(image) => {
                let image = resolve_preview_image(archive, image);
                Some(self.upload_file(chunked_url.as_str(), &image)?)
            }
            None => None,
        };

        let fields = app.form_fields(&archive_url, preview_url.as_deref());
        self.publish("publish of application", &self.settings.retry, || {
            self.client.post(applications_url.clone()).form(&fields)
        })
    }

    /// POST a record, retrying per `retry`, and return the response body as
    /// JSON (or as a JSON string when it is not JSON).
    fn publish(
        &self,
        operation: &str,
        retry: &RetryPolicy,
        request: impl Fn() -> RequestBuilder,
    ) -> Result<Value> {
        let spinner = ui::spinner("Publishing...", self.settings.quiet);
        let result = retry.retry(operation, |_| {
            let res = request()
                .header(AUTHORIZATION, &self.authorization)
                .send()
                .map_err(UploadError::from_reqwest)?;
            ensure_success(res)
        });
        spinner.finish_and_clear();

        let res = result.with_context(|| format!("The {operation} failed"))?;
        let text = res.text().context("Failed to read publish response")?;
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn application() -> Application {
        Application {
            name: "Showroom".into(),
            description: Some("<p>Demo</p>".into()),
            version: "1.2.0".into(),
            identity: None,
            current_version: None,
            application_type: ApplicationType::Unity,
            tags: vec!["vr".into(), "demo".into()],
            target_platform: TargetPlatform::Windows,
            package_name: None,
            executable_path: Some("Showroom.exe".into()),
            panoramic_preview_image: None,
            organization_ids: vec!["4".into()],
        }
    }

    #[test]
    fn windows_applications_need_an_executable() {
        let mut app = application();
        assert!(app.validate().is_ok());

        app.executable_path = None;
        assert!(app.validate().is_err());

        app.target_platform = TargetPlatform::Android;
        assert!(app.validate().is_ok());
    }

    #[test]
    fn form_fields_repeat_list_keys() {
        let fields = application().form_fields("https://cdn.example/app.zip", None);

        assert!(fields.contains(&("application_archive", "https://cdn.example/app.zip".into())));
        assert!(fields.contains(&("description_html", "<p>Demo</p>".into())));
        assert!(fields.contains(&("application_type", "unity".into())));
        assert_eq!(fields.iter().filter(|(k, _)| *k == "tags").count(), 2);
        assert!(fields.contains(&("organization_ids", "4".into())));
        assert!(!fields.iter().any(|(k, _)| *k == "panoramic_preview_image"));
        assert!(!fields.iter().any(|(k, _)| *k == "identity"));
    }

    #[test]
    fn build_record_serializes_platform_names() {
        let build = ApplicationBuild {
            application: "12".into(),
            version: "2.0.0".into(),
            target_platform: TargetPlatform::Android,
            executable_path: None,
            package_name: Some("com.example.app".into()),
            supported_xr_platforms: vec![XrPlatform::WinNonVr, XrPlatform::Quest],
            supports_arbitrary_cli_args: true,
            launch_args: String::new(),
            changelog: "Fixes".into(),
            application_archive: Some("https://cdn.example/app.apk".into()),
        };
        let json = serde_json::to_value(&build).unwrap();
        assert_eq!(json["target_platform"], "android");
        assert_eq!(json["supported_xr_platforms"], serde_json::json!(["win-non-vr", "quest"]));
        assert_eq!(json["application_archive"], "https://cdn.example/app.apk");
        assert!(json.get("executable_path").is_none());
    }

    #[test]
    fn archive_must_be_an_existing_zip_or_apk() {
        let dir = tempfile::tempdir().unwrap();
        let zip = dir.path().join("app.zip");
        fs::write(&zip, b"PK").unwrap();
        let exe = dir.path().join("app.exe");
        fs::write(&exe, b"MZ").unwrap();

        assert!(validate_application_archive(&zip).is_ok());
        assert!(validate_application_archive(&exe).is_err());
        assert!(validate_application_archive(&dir.path().join("missing.apk")).is_err());
    }

    #[test]
    fn preview_image_falls_back_to_archive_directory() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("app.zip");
        let image = dir.path().join("preview.jpg");
        fs::write(&image, b"jpg").unwrap();

        assert_eq!(
            resolve_preview_image(&archive, Path::new("preview-does-not-exist.jpg")),
            dir.path().join("preview-does-not-exist.jpg")
        );
        assert_eq!(resolve_preview_image(&archive, &image), image);
    }
}
