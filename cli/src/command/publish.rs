use crate::command::BookArgs;
use clap::Args;
use scroll_reader::ReaderSettings;
use scroll_reader::archive::ArchiveDecoder;
use scroll_reader::publish::{Generation, ResourcePublisher, ResourceStore};
use std::error::Error;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct PublishCommand {
    #[command(flatten)]
    pub book: BookArgs,
}

impl PublishCommand {
    pub async fn run(&self) -> Result<(), Box<dyn Error>> {
        let bytes = self.book.read().await?;
        let (entries, _) = ArchiveDecoder::new(&bytes)?.decode_all();

        let settings = ReaderSettings::builder()
            .base_url(self.book.base_url.as_str())
            .build();
        let publisher = ResourcePublisher::new(Arc::new(ResourceStore::new()), &settings);

        for resource in publisher.publish(Generation::new(1), entries)? {
            println!(
                "{:<28} {:>10} {}",
                resource.content_type(),
                resource.content_length(),
                resource.public_url(),
            );
        }
        Ok(())
    }
}
