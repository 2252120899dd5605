//! # scroll-reader
//! The pipeline of an in-browser e-book reader: a packaged document (a zip
//! container with an XML manifest) is decoded, every entry is published under a
//! stable URL, and the spine is composed into one continuous, scrollable
//! reading surface.
//!
//! ## Pipeline
//! 1. [`archive`]: decodes the zip container.
//! 2. [`publish`]: serves every entry at `<base-url>/<path>`, with the
//!    wrapper directory stripped, through a [`ResourceStore`](publish::ResourceStore).
//! 3. [`manifest`]: reads `META-INF/container.xml` and the package document
//!    back through the store and yields the spine and language.
//! 4. [`render`]: fetches each spine document in order, waits for every image
//!    to settle, then restores the persisted scroll offset.
//!
//! A [`ReaderSession`] runs these stages in order; a [`Reader`] serializes
//! concurrent load requests in front of it.
//!
//! ## Examples
//! Loading a book and listing the composed blocks:
//! ```
//! use scroll_reader::{LoadOutcome, ReaderSession, ReaderSettings};
//! # async fn run(bytes: Vec<u8>) -> scroll_reader::errors::ReaderResult<()> {
//!
//! let mut session = ReaderSession::new(
//!     ReaderSettings::builder().base_url("https://reader.example/app"),
//! );
//!
//! match session.load_archive(&bytes).await? {
//!     LoadOutcome::Rendered(report) => println!("{} blocks", report.blocks),
//!     LoadOutcome::NothingLoaded(error) => println!("Nothing to show: {error}"),
//! }
//!
//! for block in session.surface().blocks() {
//!     println!("{} <- {}", block.id(), block.url());
//! }
//! # Ok(())
//! # }
//! ```

mod parser;
mod util;

pub mod archive;
pub mod errors;
pub mod fetch;
pub mod manifest;
pub mod publish;
pub mod render;
pub mod session;
pub mod state;

pub use self::{
    render::ReadingSurface,
    session::{LoadOutcome, Reader, ReaderSession, ReaderSettings},
};
