use clap::Parser;
use serial_stream::cli::{self, Cli};
use serial_stream::logging::init_tracing;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = cli::run(&cli) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
