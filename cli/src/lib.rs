use clap::Parser;

pub mod command;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log pipeline internals, such as skipped entries and image settles
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub commands: command::Commands,
}
