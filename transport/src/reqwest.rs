use std::{error::Error as _, io::Read as _, time::Duration};

use pagefetch_transport_models::ResultCode;
use reqwest::{Url, blocking::Client, redirect::Policy};

use crate::{GenericHandle, GenericTransport, HandleOption, PerformError};

pub const MAX_REDIRECTS: usize = 30;
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(300);

const CHUNK_SIZE: usize = 16 * 1024;

impl From<reqwest::Error> for PerformError {
    fn from(value: reqwest::Error) -> Self {
        Self::new((&value).into(), error_chain(&value))
    }
}

#[derive(Debug, Default)]
pub struct ReqwestTransport;

impl ReqwestTransport {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl GenericTransport for ReqwestTransport {
    fn global_init(&self) -> Result<(), PerformError> {
        log::debug!("reqwest transport has no global state to initialize");
        Ok(())
    }

    fn global_cleanup(&self) {
        log::debug!("reqwest transport has no global state to clean up");
    }

    fn create_handle(&self) -> Result<Box<dyn GenericHandle>, PerformError> {
        Ok(Box::new(ReqwestHandle::new()?))
    }
}

/// A `reqwest` blocking client plus the options applied to it. The client
/// keeps its connection pool across transfers on the same handle.
pub struct ReqwestHandle {
    client: Client,
    follow_location: bool,
    url: Option<Url>,
}

impl ReqwestHandle {
    /// # Errors
    ///
    /// * If the underlying `reqwest::blocking::Client` fails to build
    pub fn new() -> Result<Self, PerformError> {
        Ok(Self {
            client: build_client(true)?,
            follow_location: true,
            url: None,
        })
    }
}

impl GenericHandle for ReqwestHandle {
    fn set_option(&mut self, option: HandleOption) -> Result<(), PerformError> {
        log::trace!("set_option {option:?}");

        match option {
            HandleOption::Url(url) => {
                let parsed = Url::parse(&url).map_err(|e| {
                    PerformError::new(ResultCode::UrlMalformat, format!("{url}: {e}"))
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(PerformError::new(
                        ResultCode::UnsupportedProtocol,
                        format!("Protocol \"{}\" not supported", parsed.scheme()),
                    ));
                }
                self.url = Some(parsed);
            }
            HandleOption::FollowLocation(follow) => {
                if follow != self.follow_location {
                    self.client = build_client(follow)?;
                    self.follow_location = follow;
                }
            }
        }

        Ok(())
    }

    fn perform(&mut self, write: &mut dyn FnMut(&[u8]) -> usize) -> Result<(), PerformError> {
        let url = self
            .url
            .clone()
            .ok_or_else(|| PerformError::new(ResultCode::UrlMalformat, "No URL set"))?;

        let mut response = self.client.get(url).send()?;
        log::debug!(
            "Received status={} from url={}",
            response.status(),
            response.url()
        );

        let mut chunk = vec![0_u8; CHUNK_SIZE];

        loop {
            let count = response
                .read(&mut chunk)
                .map_err(|e| PerformError::new(ResultCode::RecvError, e.to_string()))?;
            if count == 0 {
                break;
            }

            log::trace!("delivering chunk len={count}");
            let accepted = write(&chunk[..count]);
            if accepted != count {
                return Err(PerformError::short_write(accepted, count));
            }
        }

        Ok(())
    }
}

fn build_client(follow_location: bool) -> Result<Client, PerformError> {
    let policy = if follow_location {
        Policy::limited(MAX_REDIRECTS)
    } else {
        Policy::none()
    };

    Client::builder()
        .redirect(policy)
        .timeout(None::<Duration>)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| PerformError::new(ResultCode::FailedInit, error_chain(&e)))
}

fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();

    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    message
}
