// Chunks of a source file and the per-attempt copies of their bytes that
// become request bodies.

use std::io::{self, Cursor, Read, Seek, SeekFrom};

use crate::error::{UploadError, UploadResult};

/// One contiguous slice of the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 0-based position in the upload sequence.
    pub index: usize,
    /// Byte offset of the first byte of `data` in the source.
    pub offset: u64,
    pub data: Vec<u8>,
    /// Size of the whole source, repeated on every chunk.
    pub total_size: u64,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value for the `Content-Range` header, e.g. `bytes 0-1023/4096`.
    pub fn content_range(&self) -> String {
        let end = (self.offset + self.data.len() as u64).saturating_sub(1);
        format!("bytes {}-{}/{}", self.offset, end, self.total_size)
    }

    /// Fresh, unread body for one send attempt.
    pub fn body(&self, name: &str) -> ClonedChunk {
        clone_chunk(&self.data, name)
    }
}

/// Reads a source in fixed-size chunks without loading it all at once.
///
/// The number of bytes read is bounded by the `total_size` captured when the
/// reader is created; a source that ends early is an error.
pub struct ChunkReader<R> {
    source: R,
    chunk_size: usize,
    total_size: u64,
    offset: u64,
    index: usize,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(source: R, total_size: u64, chunk_size: usize) -> UploadResult<Self> {
        if chunk_size == 0 {
            return Err(UploadError::InvalidChunkSize);
        }
        Ok(Self {
            source,
            chunk_size,
            total_size,
            offset: 0,
            index: 0,
        })
    }

    /// Reads the next chunk. Returns `None` once `total_size` bytes were read.
    pub fn next_chunk(&mut self) -> io::Result<Option<Chunk>> {
        let remaining = self.total_size.saturating_sub(self.offset);
        if remaining == 0 {
            return Ok(None);
        }

        let want = remaining.min(self.chunk_size as u64);
        let mut data = Vec::with_capacity(want as usize);
        (&mut self.source).take(want).read_to_end(&mut data)?;
        if (data.len() as u64) < want {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "source ended at byte {} of {}",
                    self.offset + data.len() as u64,
                    self.total_size
                ),
            ));
        }

        let chunk = Chunk {
            index: self.index,
            offset: self.offset,
            data,
            total_size: self.total_size,
        };
        self.offset += want;
        self.index += 1;
        Ok(Some(chunk))
    }

    /// Number of chunks the whole source splits into.
    pub fn chunk_count(&self) -> usize {
        self.total_size.div_ceil(self.chunk_size as u64) as usize
    }
}

impl<R: Read> Iterator for ChunkReader<R> {
    type Item = io::Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}

/// An independently readable copy of a chunk's bytes, tagged with a name.
///
/// An HTTP body reads its source to exhaustion. Every send attempt therefore
/// gets its own `ClonedChunk`, positioned at the start; reading one never
/// affects another built from the same bytes.
#[derive(Debug)]
pub struct ClonedChunk {
    name: String,
    cursor: Cursor<Vec<u8>>,
}

impl ClonedChunk {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full length of the payload, regardless of the read position.
    pub fn len(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }
}

impl Read for ClonedChunk {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Seek for ClonedChunk {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}

/// Copies `data` into a new container positioned at its start.
pub fn clone_chunk(data: &[u8], name: &str) -> ClonedChunk {
    ClonedChunk {
        name: name.to_string(),
        cursor: Cursor::new(data.to_vec()),
    }
}

/// Copies the full contents of a seekable stream, whatever its current
/// position, into a new container. The stream's position is left unchanged.
///
/// For callers that hold a reader instead of the chunk bytes, e.g. a body
/// stream a previous attempt already consumed. `ChunkedUploader` keeps each
/// chunk's bytes in memory and goes through [`clone_chunk`] instead.
pub fn clone_stream<S: Read + Seek>(source: &mut S, name: &str) -> UploadResult<ClonedChunk> {
    let to_clone_error = |source: io::Error| UploadError::Clone {
        name: name.to_string(),
        source,
    };

    let position = source.stream_position().map_err(to_clone_error)?;
    source.seek(SeekFrom::Start(0)).map_err(to_clone_error)?;
    let mut data = Vec::new();
    source.read_to_end(&mut data).map_err(to_clone_error)?;
    source.seek(SeekFrom::Start(position)).map_err(to_clone_error)?;

    Ok(ClonedChunk {
        name: name.to_string(),
        cursor: Cursor::new(data),
    })
}
