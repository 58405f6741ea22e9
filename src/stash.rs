//! GraphQL client for the host media server.
//!
//! [`StashClient`] implements [`Host`] over the server's `/graphql` endpoint,
//! authenticating with the session cookie (or API key) the server hands to
//! the plugin in its [`ServerConnection`].

use reqwest::{
    blocking::Client,
    header::{CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue},
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};

use crate::{
    error::CaptureError,
    host::{Host, ImageRecord, ImageUpdate, JobStatus, SceneRecord, VideoFileRecord},
};

const FIND_SCENE_QUERY: &str = "query FindScene($id: ID!) {
  findScene(id: $id) {
    id
    title
    date
    files { path duration width height frame_rate }
    galleries { id }
    tags { id }
  }
}";

const FIND_IMAGES_QUERY: &str = "query FindImages($filter: FindFilterType, $image_filter: ImageFilterType) {
  findImages(filter: $filter, image_filter: $image_filter) {
    count
    images {
      id
      visual_files {
        ... on ImageFile { path }
        ... on VideoFile { path }
      }
    }
  }
}";

const IMAGE_UPDATE_MUTATION: &str = "mutation ImageUpdate($input: ImageUpdateInput!) {
  imageUpdate(input: $input) { id }
}";

const METADATA_SCAN_MUTATION: &str = "mutation MetadataScan($input: ScanMetadataInput!) {
  metadataScan(input: $input)
}";

const FIND_JOB_QUERY: &str = "query FindJob($input: FindJobInput!) {
  findJob(input: $input) { id status progress }
}";

/// How to reach the host server, as passed to the plugin on stdin.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServerConnection {
    /// `http` or `https`.
    #[serde(rename = "Scheme", default = "default_scheme")]
    pub scheme: String,
    /// Host name; `0.0.0.0` or empty means the local machine.
    #[serde(rename = "Host", default)]
    pub host: String,
    /// TCP port.
    #[serde(rename = "Port")]
    pub port: u16,
    /// Session cookie of the user who started the task.
    #[serde(rename = "SessionCookie", default)]
    pub session_cookie: Option<SessionCookie>,
    /// API key, when the server is configured with one.
    #[serde(rename = "ApiKey", default)]
    pub api_key: Option<String>,
    /// Server working directory.
    #[serde(rename = "Dir", default)]
    pub dir: Option<String>,
    /// Directory the plugin is installed in.
    #[serde(rename = "PluginDir", default)]
    pub plugin_dir: Option<String>,
}

/// A session cookie.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SessionCookie {
    /// Cookie name.
    #[serde(rename = "Name")]
    pub name: String,
    /// Cookie value.
    #[serde(rename = "Value")]
    pub value: String,
}

fn default_scheme() -> String {
    "http".to_string()
}

impl ServerConnection {
    /// URL of the GraphQL endpoint.
    pub fn endpoint(&self) -> String {
        let host = match self.host.trim() {
            "" | "0.0.0.0" => "localhost",
            host => host,
        };
        format!("{}://{}:{}/graphql", self.scheme, host, self.port)
    }
}

/// [`Host`] implementation talking GraphQL to the media server.
#[derive(Debug, Clone)]
pub struct StashClient {
    endpoint: String,
    http: Client,
}

impl StashClient {
    /// Build a client for `connection`.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Host`] if the credentials are not valid header
    /// values or the HTTP client cannot be built.
    pub fn new(connection: &ServerConnection) -> Result<Self, CaptureError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(cookie) = &connection.session_cookie {
            let value = HeaderValue::from_str(&format!("{}={}", cookie.name, cookie.value))
                .map_err(|error| CaptureError::Host(format!("invalid session cookie: {error}")))?;
            headers.insert(COOKIE, value);
        }
        if let Some(api_key) = connection.api_key.as_deref().filter(|key| !key.is_empty()) {
            let value = HeaderValue::from_str(api_key)
                .map_err(|error| CaptureError::Host(format!("invalid API key: {error}")))?;
            headers.insert("ApiKey", value);
        }

        let http = Client::builder().default_headers(headers).build()?;
        Ok(Self {
            endpoint: connection.endpoint(),
            http,
        })
    }

    /// URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn call<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T, CaptureError> {
        log::trace!("GraphQL request to {}: {}", self.endpoint, variables);
        let response: GraphQlResponse<T> = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }))
            .send()?
            .error_for_status()?
            .json()?;

        if !response.errors.is_empty() {
            let messages: Vec<String> = response
                .errors
                .into_iter()
                .map(|error| error.message)
                .collect();
            return Err(CaptureError::Host(messages.join("; ")));
        }
        response
            .data
            .ok_or_else(|| CaptureError::Host("response carried no data".to_string()))
    }

    fn find_images(&self, value: &str, modifier: &str, per_page: i64) -> Result<Vec<ImageRecord>, CaptureError> {
        let data: FindImagesData = self.call(
            FIND_IMAGES_QUERY,
            json!({
                "filter": { "per_page": per_page },
                "image_filter": { "path": { "value": value, "modifier": modifier } },
            }),
        )?;
        Ok(data
            .find_images
            .images
            .into_iter()
            .map(|image| ImageRecord {
                id: image.id,
                paths: image
                    .visual_files
                    .into_iter()
                    .filter_map(|file| file.path)
                    .collect(),
            })
            .collect())
    }
}

impl Host for StashClient {
    fn find_scene(&self, scene_id: &str) -> Result<Option<SceneRecord>, CaptureError> {
        let data: FindSceneData = self.call(FIND_SCENE_QUERY, json!({ "id": scene_id }))?;
        Ok(data.find_scene.map(|scene| SceneRecord {
            id: scene.id,
            title: scene.title.filter(|title| !title.is_empty()),
            date: scene.date,
            files: scene
                .files
                .into_iter()
                .map(|file| VideoFileRecord {
                    path: file.path,
                    duration: file.duration.unwrap_or(0.0),
                    width: file.width.unwrap_or(0),
                    height: file.height.unwrap_or(0),
                    frame_rate: file.frame_rate.unwrap_or(0.0),
                })
                .collect(),
            gallery_ids: scene.galleries.into_iter().map(|gallery| gallery.id).collect(),
            tag_ids: scene.tags.into_iter().map(|tag| tag.id).collect(),
        }))
    }

    fn find_images_by_path_regex(&self, pattern: &str) -> Result<Vec<ImageRecord>, CaptureError> {
        self.find_images(pattern, "MATCHES_REGEX", -1)
    }

    fn find_image_by_path(&self, path: &str) -> Result<Option<ImageRecord>, CaptureError> {
        Ok(self.find_images(path, "EQUALS", 1)?.into_iter().next())
    }

    fn update_image(&self, update: &ImageUpdate) -> Result<Option<String>, CaptureError> {
        let mut input = json!({ "id": update.id });
        if !update.gallery_ids.is_empty() {
            input["gallery_ids"] = json!(update.gallery_ids);
        }
        if !update.tag_ids.is_empty() {
            input["tag_ids"] = json!(update.tag_ids);
        }
        if let Some(date) = &update.date {
            input["date"] = json!(date);
        }

        let data: ImageUpdateData = self.call(IMAGE_UPDATE_MUTATION, json!({ "input": input }))?;
        Ok(data.image_update.map(|image| image.id))
    }

    fn metadata_scan(&self, paths: &[String]) -> Result<String, CaptureError> {
        let data: MetadataScanData =
            self.call(METADATA_SCAN_MUTATION, json!({ "input": { "paths": paths } }))?;
        Ok(data.metadata_scan)
    }

    fn find_job(&self, job_id: &str) -> Result<Option<JobStatus>, CaptureError> {
        let data: FindJobData = self.call(FIND_JOB_QUERY, json!({ "input": { "id": job_id } }))?;
        Ok(data
            .find_job
            .map(|job| job.status.parse().unwrap_or(JobStatus::Other(job.status))))
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct IdWire {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindSceneData {
    find_scene: Option<SceneWire>,
}

#[derive(Debug, Deserialize)]
struct SceneWire {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    files: Vec<VideoFileWire>,
    #[serde(default)]
    galleries: Vec<IdWire>,
    #[serde(default)]
    tags: Vec<IdWire>,
}

#[derive(Debug, Deserialize)]
struct VideoFileWire {
    path: String,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    frame_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindImagesData {
    find_images: FindImagesWire,
}

#[derive(Debug, Deserialize)]
struct FindImagesWire {
    #[serde(default)]
    images: Vec<ImageWire>,
}

#[derive(Debug, Deserialize)]
struct ImageWire {
    id: String,
    #[serde(default)]
    visual_files: Vec<VisualFileWire>,
}

#[derive(Debug, Deserialize)]
struct VisualFileWire {
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageUpdateData {
    image_update: Option<IdWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataScanData {
    metadata_scan: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindJobData {
    find_job: Option<JobWire>,
}

#[derive(Debug, Deserialize)]
struct JobWire {
    status: String,
}
