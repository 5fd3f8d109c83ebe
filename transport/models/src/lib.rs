#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

#[cfg(feature = "reqwest")]
pub mod reqwest;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Outcome of a transfer as reported by a transport backend.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    UnsupportedProtocol,
    UrlMalformat,
    CouldntResolveHost,
    CouldntConnect,
    SslConnectError,
    OperationTimedOut,
    TooManyRedirects,
    SendError,
    RecvError,
    WriteError,
    FailedInit,
    Unknown,
}

impl ResultCode {
    /// Human-readable diagnostic for this code.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnsupportedProtocol => "Unsupported protocol",
            Self::UrlMalformat => "URL using bad/illegal format or missing URL",
            Self::CouldntResolveHost => "Could not resolve hostname",
            Self::CouldntConnect => "Could not connect to server",
            Self::SslConnectError => "SSL connect error",
            Self::OperationTimedOut => "Timeout was reached",
            Self::TooManyRedirects => "Number of redirects hit maximum amount",
            Self::SendError => "Failed sending data to the peer",
            Self::RecvError => "Failure when receiving data from the peer",
            Self::WriteError => "Failed writing received data to disk/application",
            Self::FailedInit => "Failed initialization",
            Self::Unknown => "Unknown error",
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn description_is_never_empty() {
        for code in [
            ResultCode::UnsupportedProtocol,
            ResultCode::UrlMalformat,
            ResultCode::CouldntResolveHost,
            ResultCode::CouldntConnect,
            ResultCode::SslConnectError,
            ResultCode::OperationTimedOut,
            ResultCode::TooManyRedirects,
            ResultCode::SendError,
            ResultCode::RecvError,
            ResultCode::WriteError,
            ResultCode::FailedInit,
            ResultCode::Unknown,
        ] {
            assert!(!code.description().is_empty(), "{code} has no description");
        }
    }

    #[test]
    fn display_uses_screaming_snake_case() {
        assert_eq!(ResultCode::CouldntResolveHost.to_string(), "COULDNT_RESOLVE_HOST");
        assert_eq!(
            ResultCode::from_str("WRITE_ERROR").unwrap(),
            ResultCode::WriteError
        );
    }

    #[test]
    fn serializes_like_display() {
        let json = serde_json::to_string(&ResultCode::TooManyRedirects).unwrap();
        assert_eq!(json, "\"TOO_MANY_REDIRECTS\"");
    }
}
