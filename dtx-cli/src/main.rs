use clap::Parser;
use dtx_cli::Cli;

fn main() -> miette::Result<()> {
    dtx_cli::init_tracing();
    Cli::parse().run()
}
