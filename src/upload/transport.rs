// Wire side of the chunked upload. `HttpTransport` speaks to the backend
// over blocking reqwest; tests swap in their own `ChunkTransport`.

use reqwest::blocking::{multipart, Client, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_RANGE};
use serde::{Deserialize, Serialize};

use crate::error::{UploadError, UploadResult};
use crate::upload::chunk::{Chunk, ClonedChunk};

/// Body of the request that asks the backend to assemble the chunks.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FinalizeRequest {
    pub filename: String,
    pub total_size: u64,
    pub chunk_count: usize,
    pub complete: bool,
}

/// The assembled remote file. Older backends name the field `file`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    #[serde(alias = "file")]
    pub url: String,
}

/// The two requests a chunked upload is made of.
pub trait ChunkTransport {
    /// Send one chunk. `body` is a fresh copy of `chunk.data` and is consumed
    /// by the call.
    fn send_chunk(&self, chunk: &Chunk, body: ClonedChunk) -> UploadResult<()>;

    /// Signal that every chunk was sent and return the assembled file.
    fn finalize(&self, request: &FinalizeRequest) -> UploadResult<UploadedFile>;
}

/// Sends chunks as multipart POSTs to a single collection URL.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    url: String,
    authorization: String,
}

impl HttpTransport {
    pub fn new(url: &str, authorization: &str) -> UploadResult<Self> {
        let client = Client::builder().build().map_err(UploadError::Request)?;
        Ok(Self::with_client(client, url, authorization))
    }

    /// Reuse an existing client (and its connection pool).
    pub fn with_client(client: Client, url: &str, authorization: &str) -> Self {
        HttpTransport {
            client,
            url: url.to_string(),
            authorization: authorization.to_string(),
        }
    }
}

impl ChunkTransport for HttpTransport {
    fn send_chunk(&self, chunk: &Chunk, body: ClonedChunk) -> UploadResult<()> {
        let file_name = body.name().to_string();
        let length = body.len();
        let part = multipart::Part::reader_with_length(body, length)
            .file_name(file_name.clone())
            .mime_str("application/octet-stream")
            .map_err(UploadError::Request)?;
        let form = multipart::Form::new()
            .text("index", chunk.index.to_string())
            .text("offset", chunk.offset.to_string())
            .text("total_size", chunk.total_size.to_string())
            .text("filename", file_name)
            .part("chunk", part);

        let res = self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, &self.authorization)
            .header(CONTENT_RANGE, chunk.content_range())
            .multipart(form)
            .send()
            .map_err(UploadError::from_reqwest)?;
        ensure_success(res)?;
        Ok(())
    }

    fn finalize(&self, request: &FinalizeRequest) -> UploadResult<UploadedFile> {
        let res = self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, &self.authorization)
            .json(request)
            .send()
            .map_err(UploadError::from_reqwest)?;
        let res = ensure_success(res)?;

        let uploaded: UploadedFile = res
            .json()
            .map_err(|e| UploadError::InvalidResponse(format!("finalize response: {e}")))?;
        if uploaded.url.is_empty() {
            return Err(UploadError::InvalidResponse(
                "finalize response has an empty url".into(),
            ));
        }
        Ok(uploaded)
    }
}

/// Turn a non-2xx response into an `Application` error carrying the body.
pub(crate) fn ensure_success(res: Response) -> UploadResult<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().unwrap_or_default();
    Err(UploadError::Application {
        status: status.as_u16(),
        body,
    })
}
