use crate::command::BookArgs;
use clap::Args;
use scroll_reader::render::{ImageState, ReadingSurface};
use scroll_reader::{ReaderSession, ReaderSettings};
use std::error::Error;
use std::time::Duration;

#[derive(Debug, Args)]
pub struct RenderCommand {
    #[command(flatten)]
    pub book: BookArgs,

    /// Upper bound for every fetch, in milliseconds
    #[arg(long, default_value_t = 30_000)]
    pub timeout_ms: u64,

    /// Print the markup of every block
    #[arg(long)]
    pub markup: bool,
}

impl RenderCommand {
    pub async fn run(&self) -> Result<(), Box<dyn Error>> {
        let bytes = self.book.read().await?;
        let mut session = ReaderSession::new(
            ReaderSettings::builder()
                .base_url(self.book.base_url.as_str())
                .fetch_timeout(Duration::from_millis(self.timeout_ms)),
        );

        let report = session.load_archive(&bytes).await?.into_report()?;

        println!(
            "language: {}",
            session.surface().language().unwrap_or("(undeclared)")
        );
        println!(
            "blocks: {}, images: {} ({} failed)",
            report.blocks, report.images, report.failed_images,
        );
        self.show_surface(session.surface());
        Ok(())
    }

    fn show_surface(&self, surface: &ReadingSurface) {
        for block in surface.blocks() {
            println!("\n[{}] {}", block.id(), block.url());

            for image in block.images() {
                let state = match image.state() {
                    ImageState::Loaded => "loaded",
                    ImageState::Failed => "failed",
                    ImageState::Pending => "pending",
                };
                println!("  {state:<7} {}", image.url());
            }
            if self.markup {
                println!("{}", block.markup());
            }
        }
    }
}
