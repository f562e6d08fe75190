// Chunked file upload.
// A file is read lazily in fixed-size chunks, each chunk is POSTed with
// retry on transport failures, and a final request asks the backend to
// assemble the pieces. The resulting URL is what callers store in their
// publish payloads.

pub mod chunk;
pub mod retry;
pub mod transport;
pub mod uploader;

pub use chunk::{clone_chunk, clone_stream, Chunk, ChunkReader, ClonedChunk};
pub use retry::RetryPolicy;
pub use transport::{ChunkTransport, FinalizeRequest, HttpTransport, UploadedFile};
pub use uploader::{ChunkedUploader, DEFAULT_CHUNK_SIZE};
