#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

#[cfg(feature = "reqwest")]
pub mod reqwest;

#[cfg(feature = "simulator")]
pub mod simulator;

mod buffer;

use std::{
    marker::PhantomData,
    sync::atomic::{AtomicBool, Ordering},
};

use bytes::Bytes;
use thiserror::Error;

pub use buffer::ResponseBuffer;
pub use pagefetch_transport_models::ResultCode;

static CONTEXT_ACTIVE: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Initialization(String),
    #[error("{message}")]
    Transport { code: ResultCode, message: String },
    #[error("Transport handle has already been released")]
    HandleReleased,
}

impl From<PerformError> for Error {
    fn from(value: PerformError) -> Self {
        Self::Transport {
            code: value.code,
            message: value.to_string(),
        }
    }
}

/// Failure reported by a transport backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {detail}", .code.description())]
pub struct PerformError {
    pub code: ResultCode,
    pub detail: String,
}

impl PerformError {
    #[must_use]
    pub fn new(code: ResultCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }

    /// The write callback accepted fewer bytes than it was handed.
    #[must_use]
    pub fn short_write(accepted: usize, delivered: usize) -> Self {
        Self::new(
            ResultCode::WriteError,
            format!("write callback accepted {accepted} of {delivered} bytes"),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOption {
    Url(String),
    FollowLocation(bool),
}

/// Process-wide side of a transport backend.
pub trait GenericTransport {
    /// # Errors
    ///
    /// * If the backend fails to set up its global state
    fn global_init(&self) -> Result<(), PerformError>;

    fn global_cleanup(&self);

    /// # Errors
    ///
    /// * If the backend fails to allocate a new handle
    fn create_handle(&self) -> Result<Box<dyn GenericHandle>, PerformError>;
}

/// One reusable request context. Dropping it releases the backend resource.
pub trait GenericHandle: Send {
    /// # Errors
    ///
    /// * If the backend rejects the option value
    fn set_option(&mut self, option: HandleOption) -> Result<(), PerformError>;

    /// Runs the configured transfer to completion, handing every body chunk to
    /// `write` in arrival order. `write` returns how many bytes it accepted;
    /// anything short of the chunk length aborts the transfer.
    ///
    /// # Errors
    ///
    /// * If the transfer fails or `write` accepts fewer bytes than delivered
    fn perform(&mut self, write: &mut dyn FnMut(&[u8]) -> usize) -> Result<(), PerformError>;
}

/// Global transport state. Only one may be live per process, and every
/// [`Handle`] borrows it, so it always outlives its handles.
pub struct TransportContext {
    transport: Box<dyn GenericTransport>,
}

impl std::fmt::Debug for TransportContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportContext").finish_non_exhaustive()
    }
}

impl TransportContext {
    /// Initializes the `reqwest` transport for process-wide use.
    ///
    /// # Errors
    ///
    /// * If another `TransportContext` is still live
    /// * If the backend fails to initialize
    #[cfg(feature = "reqwest")]
    pub fn new() -> Result<Self, Error> {
        Self::with_transport(reqwest::ReqwestTransport::new())
    }

    /// # Errors
    ///
    /// * If another `TransportContext` is still live
    /// * If the backend fails to initialize
    pub fn with_transport(transport: impl GenericTransport + 'static) -> Result<Self, Error> {
        if CONTEXT_ACTIVE.swap(true, Ordering::SeqCst) {
            return Err(Error::Initialization(
                "Transport context is already initialized".to_string(),
            ));
        }

        if let Err(e) = transport.global_init() {
            CONTEXT_ACTIVE.store(false, Ordering::SeqCst);
            return Err(Error::Initialization(format!(
                "Failed to initialize transport globally: {e}"
            )));
        }

        log::debug!("Initialized global transport context");

        Ok(Self {
            transport: Box::new(transport),
        })
    }

    /// # Errors
    ///
    /// * If the backend fails to allocate a handle
    pub fn handle(&self) -> Result<Handle<'_>, Error> {
        let inner = self.transport.create_handle().map_err(|e| {
            Error::Initialization(format!("Failed to initialize transport handle: {e}"))
        })?;

        log::debug!("Acquired transport handle");

        Ok(Handle {
            inner: Some(inner),
            _context: PhantomData,
        })
    }
}

impl Drop for TransportContext {
    fn drop(&mut self) {
        self.transport.global_cleanup();
        CONTEXT_ACTIVE.store(false, Ordering::SeqCst);
        log::debug!("Cleaned up global transport context");
    }
}

/// Owns one backend handle for the lifetime of the borrowed context.
pub struct Handle<'ctx> {
    inner: Option<Box<dyn GenericHandle>>,
    _context: PhantomData<&'ctx TransportContext>,
}

impl std::fmt::Debug for Handle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}

impl Handle<'_> {
    /// Performs a blocking GET of `url`, following redirects, and returns the
    /// complete response body.
    ///
    /// # Errors
    ///
    /// * If the handle has been released
    /// * If `url` is empty or rejected by the backend
    /// * If the transfer fails
    pub fn fetch(&mut self, url: &str) -> Result<Bytes, Error> {
        let handle = self.inner.as_mut().ok_or(Error::HandleReleased)?;

        if url.is_empty() {
            return Err(PerformError::new(ResultCode::UrlMalformat, "No URL set").into());
        }

        handle.set_option(HandleOption::Url(url.to_string()))?;
        handle.set_option(HandleOption::FollowLocation(true))?;

        let mut body = ResponseBuffer::new();

        handle
            .perform(&mut |chunk: &[u8]| body.write(chunk))
            .inspect_err(|e| log::warn!("Failed to fetch url={url}: {e}"))?;

        log::info!("Fetched url={url} len={}", body.len());

        Ok(body.into_bytes())
    }

    /// Releases the backend handle. Calling this more than once is a no-op.
    pub fn release(&mut self) {
        if self.inner.take().is_some() {
            log::debug!("Released transport handle");
        }
    }

    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.inner.is_none()
    }
}

impl Drop for Handle<'_> {
    fn drop(&mut self) {
        self.release();
    }
}
