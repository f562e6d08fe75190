// Drives one upload: reads the file chunk by chunk, sends each chunk with
// retry, then asks the backend to assemble them.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use indicatif::ProgressBar;
use tracing::{debug, info};

use crate::error::{UploadError, UploadResult};
use crate::upload::chunk::{Chunk, ChunkReader};
use crate::upload::retry::RetryPolicy;
use crate::upload::transport::{ChunkTransport, FinalizeRequest, HttpTransport};

/// Default size of one chunk: 2 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 2 * 1024 * 1024;

/// Uploads one file at a time, chunk by chunk, in order.
///
/// Each chunk send is retried on transport failures according to the
/// configured [`RetryPolicy`], with a fresh copy of the chunk bytes for every
/// attempt. Once all chunks are accepted a single finalize request is made
/// and the URL of the assembled file is returned.
pub struct ChunkedUploader<T = HttpTransport> {
    transport: T,
    retry: RetryPolicy,
    progress: ProgressBar,
}

impl ChunkedUploader<HttpTransport> {
    /// Uploader that POSTs chunks and the finalize call to `base_url`.
    pub fn new(base_url: &str, authorization_header: &str) -> UploadResult<Self> {
        Ok(Self::with_transport(HttpTransport::new(
            base_url,
            authorization_header,
        )?))
    }
}

impl<T: ChunkTransport> ChunkedUploader<T> {
    pub fn with_transport(transport: T) -> Self {
        ChunkedUploader {
            transport,
            retry: RetryPolicy::default(),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Report sent bytes on `progress`. Its length is set per upload.
    pub fn progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Upload the file at `file_path` and return the assembled file's URL.
    ///
    /// The file is opened once and closed on every exit path. Nothing is sent
    /// if it cannot be opened.
    pub fn upload_chunked_file(
        &self,
        file_path: &Path,
        chunk_size_bytes: usize,
    ) -> UploadResult<String> {
        if chunk_size_bytes == 0 {
            return Err(UploadError::InvalidChunkSize);
        }
        let local_io = |source| UploadError::LocalIo {
            path: file_path.to_path_buf(),
            source,
        };

        let file = File::open(file_path).map_err(local_io)?;
        let metadata = file.metadata().map_err(local_io)?;
        if !metadata.is_file() {
            return Err(local_io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }
        let total_size = metadata.len();
        let name = file_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("upload");

        self.upload_source(file, total_size, name, chunk_size_bytes, file_path)
    }

    /// Upload `total_size` bytes from `source` under the given file name.
    pub fn upload_reader<R: Read>(
        &self,
        source: R,
        total_size: u64,
        name: &str,
        chunk_size_bytes: usize,
    ) -> UploadResult<String> {
        self.upload_source(source, total_size, name, chunk_size_bytes, Path::new(name))
    }

    fn upload_source<R: Read>(
        &self,
        source: R,
        total_size: u64,
        name: &str,
        chunk_size_bytes: usize,
        origin: &Path,
    ) -> UploadResult<String> {
        let mut chunks = ChunkReader::new(source, total_size, chunk_size_bytes)?;
        let chunk_count = chunks.chunk_count();
        debug!(name, total_size, chunk_count, "starting chunked upload");

        self.progress.set_length(total_size);
        self.progress.set_position(0);

        let result = self
            .send_all(&mut chunks, name, origin)
            .and_then(|()| self.finalize(name, total_size, chunk_count));

        match &result {
            Ok(url) => {
                self.progress.finish_and_clear();
                info!(name, url = %url, "upload finalized");
            }
            Err(_) => self.progress.abandon(),
        }
        result
    }

    fn send_all<R: Read>(
        &self,
        chunks: &mut ChunkReader<R>,
        name: &str,
        origin: &Path,
    ) -> UploadResult<()> {
        while let Some(chunk) = chunks.next_chunk().map_err(|source| UploadError::LocalIo {
            path: origin.to_path_buf(),
            source,
        })? {
            self.upload_chunk(&chunk, name)?;
            self.progress.inc(chunk.len() as u64);
        }
        Ok(())
    }

    /// Send a single chunk, retrying transport failures. Every attempt gets
    /// its own unread copy of the chunk bytes.
    pub fn upload_chunk(&self, chunk: &Chunk, name: &str) -> UploadResult<()> {
        let operation = format!("upload of chunk {} of {name}", chunk.index);
        self.retry.retry(&operation, |attempt| {
            debug!(
                index = chunk.index,
                offset = chunk.offset,
                bytes = chunk.len(),
                attempt,
                "sending chunk"
            );
            self.transport.send_chunk(chunk, chunk.body(name))
        })
    }

    fn finalize(&self, name: &str, total_size: u64, chunk_count: usize) -> UploadResult<String> {
        let request = FinalizeRequest {
            filename: name.to_string(),
            total_size,
            chunk_count,
            complete: true,
        };
        Ok(self.transport.finalize(&request)?.url)
    }
}
