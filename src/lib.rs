// Library root
// -----------
// The binary (`main.rs`) parses arguments and hands off to `cli::run`;
// everything it does lives here so it can be tested without a terminal.
//
// Module responsibilities:
// - `upload`: chunked file upload (chunk reading, body cloning, retry,
//   HTTP transport, finalize).
// - `api`: publish steps that upload archives and register applications
//   and builds.
// - `auth`: `Authorization` header from environment variables.
// - `config`: backend endpoint and upload settings.
// - `ui`: progress bars and spinners on stderr.
// - `cli`: clap command definitions and dispatch.
pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod ui;
pub mod upload;

pub use error::{UploadError, UploadResult};
pub use upload::{ChunkedUploader, RetryPolicy, DEFAULT_CHUNK_SIZE};
