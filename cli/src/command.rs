use clap::{Args, Subcommand};
use std::path::PathBuf;

mod entries;
mod publish;
mod render;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the entries recorded in a book's archive.
    Entries(entries::EntriesCommand),
    /// Publish a book and list the URLs its resources are served at.
    Publish(publish::PublishCommand),
    /// Run the whole pipeline and print the composed reading surface.
    Render(render::RenderCommand),
}

#[derive(Debug, Args)]
pub struct BookPath {
    /// A packaged document (EPUB file)
    pub book_path: PathBuf,
}

impl BookPath {
    async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.book_path).await
    }
}

#[derive(Debug, Args)]
pub struct BookArgs {
    #[command(flatten)]
    pub path: BookPath,

    /// Prefix of every published URL
    #[arg(long, default_value = "/")]
    pub base_url: String,
}

impl BookArgs {
    async fn read(&self) -> std::io::Result<Vec<u8>> {
        self.path.read().await
    }
}
