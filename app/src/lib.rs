#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::io::Write;

use clap::Parser;
use pagefetch_transport::TransportContext;

pub const DEFAULT_URL: &str = "https://example.com";
pub const EXCERPT_LEN: usize = 300;

const CONTENT_START: &str = "===== Page Content Start =====";
const CONTENT_END: &str = "===== Page Content End =====";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] pagefetch_transport::Error),
    #[error(transparent)]
    IO(#[from] std::io::Error),
}

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// The page to fetch
    #[arg(index = 1, default_value = DEFAULT_URL)]
    pub url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
        }
    }
}

/// Fetches `config.url` through `context` and writes the framed excerpt to
/// `out`. The handle is released before this returns, on every path.
///
/// # Errors
///
/// * If the transport handle cannot be acquired
/// * If the fetch fails
/// * If writing to `out` fails
pub fn run(config: &Config, context: &TransportContext, out: &mut impl Write) -> Result<(), Error> {
    let mut handle = context.handle()?;

    writeln!(out, "Fetching {}...", config.url)?;
    out.flush()?;

    let body = handle.fetch(&config.url)?;

    write_excerpt(out, &body)?;

    Ok(())
}

/// Writes at most the first [`EXCERPT_LEN`] bytes of `body` followed by an
/// ellipsis, between the page content markers.
///
/// # Errors
///
/// * If writing to `out` fails
pub fn write_excerpt(out: &mut impl Write, body: &[u8]) -> std::io::Result<()> {
    writeln!(out, "{CONTENT_START}")?;
    out.write_all(excerpt(body))?;
    writeln!(out, "...")?;
    writeln!(out, "{CONTENT_END}")?;
    out.flush()
}

#[must_use]
pub fn excerpt(body: &[u8]) -> &[u8] {
    &body[..body.len().min(EXCERPT_LEN)]
}
