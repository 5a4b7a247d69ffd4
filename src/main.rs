use clap::Parser;
use tracing_subscriber::EnvFilter;

use rectify::cli::{self, args::RectifyArgs, Outcome};
use rectify::errors::print_error;

fn main() {
    let args = RectifyArgs::parse();
    init_tracing(args.global.verbose);

    match cli::run(args) {
        Ok(Outcome::Clean) => {}
        Ok(Outcome::Findings) => std::process::exit(1),
        Err(error) => {
            print_error(error);
            std::process::exit(2);
        }
    }
}

/// Installs the `fmt` subscriber on stderr. `RUST_LOG` overrides the `-v` count.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "rectify=debug",
        _ => "rectify=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
