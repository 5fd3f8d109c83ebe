use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use bytes::Bytes;
use pagefetch_transport_models::ResultCode;

use crate::{GenericHandle, GenericTransport, HandleOption, PerformError};

pub const MAX_REDIRECTS: usize = 30;

/// Lifecycle transitions observed by a [`SimulatorTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    GlobalInit,
    HandleCreated(u64),
    HandleReleased(u64),
    GlobalCleanup,
}

#[derive(Debug, Clone)]
enum Route {
    Body(Vec<Bytes>),
    Redirect(String),
    Failure(ResultCode, String),
}

#[derive(Debug, Default)]
struct State {
    routes: BTreeMap<String, Route>,
    events: Vec<Event>,
    next_handle_id: u64,
    fail_global_init: bool,
    fail_handle_creation: bool,
}

/// In-memory transport serving scripted routes. Clones share state, so a
/// clone kept by the caller can inspect [`events`](Self::events) after the
/// original has been handed to a context.
#[derive(Debug, Clone, Default)]
pub struct SimulatorTransport {
    state: Arc<Mutex<State>>,
}

impl SimulatorTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `chunks` for `url`, one write callback invocation per chunk.
    #[must_use]
    pub fn body<I, B>(self, url: impl Into<String>, chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let chunks = chunks.into_iter().map(Into::into).collect();
        self.route(url.into(), Route::Body(chunks))
    }

    #[must_use]
    pub fn redirect(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.route(from.into(), Route::Redirect(to.into()))
    }

    #[must_use]
    pub fn failure(
        self,
        url: impl Into<String>,
        code: ResultCode,
        detail: impl Into<String>,
    ) -> Self {
        self.route(url.into(), Route::Failure(code, detail.into()))
    }

    #[must_use]
    pub fn fail_global_init(self) -> Self {
        self.lock().fail_global_init = true;
        self
    }

    #[must_use]
    pub fn fail_handle_creation(self) -> Self {
        self.lock().fail_handle_creation = true;
        self
    }

    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    fn route(self, url: String, route: Route) -> Self {
        self.lock().routes.insert(url, route);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }
}

impl GenericTransport for SimulatorTransport {
    fn global_init(&self) -> Result<(), PerformError> {
        let mut state = self.lock();

        if state.fail_global_init {
            return Err(PerformError::new(
                ResultCode::FailedInit,
                "simulated global init failure",
            ));
        }

        state.events.push(Event::GlobalInit);
        Ok(())
    }

    fn global_cleanup(&self) {
        self.lock().events.push(Event::GlobalCleanup);
    }

    fn create_handle(&self) -> Result<Box<dyn GenericHandle>, PerformError> {
        let mut state = self.lock();

        if state.fail_handle_creation {
            return Err(PerformError::new(
                ResultCode::FailedInit,
                "simulated handle creation failure",
            ));
        }

        let id = state.next_handle_id;
        state.next_handle_id += 1;
        state.events.push(Event::HandleCreated(id));

        Ok(Box::new(SimulatorHandle {
            id,
            state: self.state.clone(),
            url: None,
            follow_location: false,
        }))
    }
}

pub struct SimulatorHandle {
    id: u64,
    state: Arc<Mutex<State>>,
    url: Option<String>,
    follow_location: bool,
}

impl GenericHandle for SimulatorHandle {
    fn set_option(&mut self, option: HandleOption) -> Result<(), PerformError> {
        log::trace!("handle {} set_option {option:?}", self.id);

        match option {
            HandleOption::Url(url) => self.url = Some(url),
            HandleOption::FollowLocation(follow) => self.follow_location = follow,
        }

        Ok(())
    }

    fn perform(&mut self, write: &mut dyn FnMut(&[u8]) -> usize) -> Result<(), PerformError> {
        let mut url = self
            .url
            .clone()
            .ok_or_else(|| PerformError::new(ResultCode::UrlMalformat, "No URL set"))?;
        let mut redirects = 0;

        loop {
            let route = lock(&self.state).routes.get(&url).cloned();

            match route {
                None => {
                    return Err(PerformError::new(
                        ResultCode::CouldntResolveHost,
                        format!("Could not resolve host: {}", host(&url)),
                    ));
                }
                Some(Route::Failure(code, detail)) => {
                    return Err(PerformError::new(code, detail));
                }
                Some(Route::Redirect(location)) => {
                    if !self.follow_location {
                        log::debug!("not following redirect from {url} to {location}");
                        return Ok(());
                    }
                    if redirects == MAX_REDIRECTS {
                        return Err(PerformError::new(
                            ResultCode::TooManyRedirects,
                            format!("Maximum ({MAX_REDIRECTS}) redirects followed"),
                        ));
                    }
                    log::debug!("following redirect from {url} to {location}");
                    redirects += 1;
                    url = location;
                }
                Some(Route::Body(chunks)) => {
                    for chunk in chunks {
                        log::trace!("delivering chunk len={}", chunk.len());
                        let accepted = write(&chunk);
                        if accepted != chunk.len() {
                            return Err(PerformError::short_write(accepted, chunk.len()));
                        }
                    }
                    return Ok(());
                }
            }
        }
    }
}

impl Drop for SimulatorHandle {
    fn drop(&mut self) {
        lock(&self.state).events.push(Event::HandleReleased(self.id));
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn host(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.split(['/', ':', '?', '#']).next().unwrap_or(rest)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn handle(transport: &SimulatorTransport, url: &str, follow: bool) -> Box<dyn GenericHandle> {
        let mut handle = transport.create_handle().unwrap();
        handle.set_option(HandleOption::Url(url.to_string())).unwrap();
        handle
            .set_option(HandleOption::FollowLocation(follow))
            .unwrap();
        handle
    }

    #[test]
    fn short_write_aborts_transfer() {
        let transport = SimulatorTransport::new().body("http://test/", ["AB", "CD"]);
        let mut handle = handle(&transport, "http://test/", true);
        let mut calls = 0;

        let error = handle
            .perform(&mut |chunk: &[u8]| {
                calls += 1;
                chunk.len() - 1
            })
            .unwrap_err();

        assert_eq!(error.code, ResultCode::WriteError);
        assert_eq!(calls, 1);
    }

    #[test]
    fn redirect_is_not_followed_when_disabled() {
        let transport = SimulatorTransport::new()
            .redirect("http://test/old", "http://test/new")
            .body("http://test/new", ["new"]);
        let mut handle = handle(&transport, "http://test/old", false);
        let mut received = Vec::new();

        handle
            .perform(&mut |chunk: &[u8]| {
                received.extend_from_slice(chunk);
                chunk.len()
            })
            .unwrap();

        assert!(received.is_empty());
    }

    #[test]
    fn perform_without_url_fails() {
        let transport = SimulatorTransport::new();
        let mut handle = transport.create_handle().unwrap();

        let error = handle.perform(&mut |chunk: &[u8]| chunk.len()).unwrap_err();

        assert_eq!(error.code, ResultCode::UrlMalformat);
    }

    #[test]
    fn dropping_handle_records_release() {
        let transport = SimulatorTransport::new();

        drop(transport.create_handle().unwrap());
        drop(transport.create_handle().unwrap());

        assert_eq!(
            transport.events(),
            vec![
                Event::HandleCreated(0),
                Event::HandleReleased(0),
                Event::HandleCreated(1),
                Event::HandleReleased(1),
            ]
        );
    }

    #[test]
    fn host_is_extracted_from_url() {
        assert_eq!(host("https://example.com/path"), "example.com");
        assert_eq!(host("http://localhost:8080"), "localhost");
        assert_eq!(host("example.org?q=1"), "example.org");
    }
}
