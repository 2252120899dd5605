use clap::Parser;
use scroll_reader_cli::Cli;
use scroll_reader_cli::command::Commands;
use std::error::Error;
use tracing::Level;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    match cli.commands {
        Commands::Entries(entries) => entries.run().await?,
        Commands::Publish(publish) => publish.run().await?,
        Commands::Render(render) => render.run().await?,
    }

    Ok(())
}
