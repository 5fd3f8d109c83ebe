#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::process::ExitCode;

use clap::Parser as _;
use pagefetch::{Config, Error};
use pagefetch_transport::TransportContext;

fn main() -> ExitCode {
    pretty_env_logger::init();

    let config = Config::parse();
    log::debug!("config={config:?}");

    match fetch(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn fetch(config: &Config) -> Result<(), Error> {
    let context = TransportContext::new()?;
    let stdout = std::io::stdout();

    pagefetch::run(config, &context, &mut stdout.lock())
}
