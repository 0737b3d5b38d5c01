// Entrypoint for the CLI application.
// - Keeps `main` small: parse arguments, set up logging, hand off to `cli::run`.
// - Library errors carry their own exit code; anything else exits 1.

use clap::Parser;
use v2ctl::cli::{self, Cli};
use v2ctl::{ui, Error};

fn main() {
    let cli = Cli::parse();
    cli::init_logging(cli.verbose);

    if let Err(err) = cli::run(cli) {
        ui::error(&format!("{err:#}"));
        let code = err.downcast_ref::<Error>().map(Error::exit_code).unwrap_or(1);
        std::process::exit(code);
    }
}
