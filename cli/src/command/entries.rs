use crate::command::BookPath;
use clap::Args;
use scroll_reader::archive::ArchiveDecoder;
use std::error::Error;

#[derive(Debug, Args)]
pub struct EntriesCommand {
    #[command(flatten)]
    pub book: BookPath,
}

impl EntriesCommand {
    pub async fn run(&self) -> Result<(), Box<dyn Error>> {
        let bytes = self.book.read().await?;
        let decoder = ArchiveDecoder::new(&bytes)?;

        for entry in decoder.entries() {
            println!(
                "{:>10} {:>10} {:<12} {}",
                entry.compressed_size(),
                entry.uncompressed_size(),
                entry.compression().to_string(),
                entry.path(),
            );
        }
        Ok(())
    }
}
