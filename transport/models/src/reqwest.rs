use std::error::Error as _;

use crate::ResultCode;

impl From<&reqwest::Error> for ResultCode {
    fn from(value: &reqwest::Error) -> Self {
        if value.is_timeout() {
            Self::OperationTimedOut
        } else if value.is_redirect() {
            Self::TooManyRedirects
        } else if value.is_builder() {
            Self::UrlMalformat
        } else if value.is_connect() {
            if caused_by_dns(value) {
                Self::CouldntResolveHost
            } else if caused_by_tls(value) {
                Self::SslConnectError
            } else {
                Self::CouldntConnect
            }
        } else if value.is_body() || value.is_decode() {
            Self::RecvError
        } else if value.is_request() {
            Self::SendError
        } else {
            Self::Unknown
        }
    }
}

impl From<reqwest::Error> for ResultCode {
    fn from(value: reqwest::Error) -> Self {
        (&value).into()
    }
}

// hyper-util reports resolver failures as a connect error whose source reads "dns error"
fn caused_by_dns(error: &reqwest::Error) -> bool {
    let mut source = error.source();

    while let Some(cause) = source {
        if cause.to_string().starts_with("dns error") {
            return true;
        }
        source = cause.source();
    }

    false
}

// `io::Error::source` skips the wrapped error, so look inside it explicitly
fn caused_by_tls(error: &reqwest::Error) -> bool {
    let mut source = error.source();

    while let Some(cause) = source {
        let wrapped = cause
            .downcast_ref::<std::io::Error>()
            .and_then(std::io::Error::get_ref);
        if cause.is::<rustls::Error>() || wrapped.is_some_and(|inner| inner.is::<rustls::Error>()) {
            return true;
        }
        source = cause.source();
    }

    false
}
