//! Fake collaborators and option builders for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use regsync::transfer::{TransferError, TransferRequest};
use regsync::{
    ConnectionContext, DestinationTransport, ImageTransfer, RegistryError, RegistryReference,
    RetryPolicy, SourceTransport, SyncOptions, TagLister,
};

/// How the fake registry answers a tag listing for one repository.
#[derive(Debug, Clone)]
pub enum Listing {
    Tags(Vec<String>),
    Unauthorized,
    /// HTTP error status; 5xx is retryable.
    Status(u16),
    /// Fails with a retryable error `failures` times, then returns `tags`.
    Flaky { failures: u32, tags: Vec<String> },
}

/// Tag lister answering from a fixed table keyed by `domain/path`.
#[derive(Default)]
pub struct FakeTagLister {
    listings: HashMap<String, Listing>,
    calls: Mutex<Vec<(String, ConnectionContext)>>,
}

impl FakeTagLister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags(mut self, repository: &str, tags: &[&str]) -> Self {
        self.listings.insert(
            repository.to_string(),
            Listing::Tags(tags.iter().map(|t| t.to_string()).collect()),
        );
        self
    }

    pub fn with_listing(mut self, repository: &str, listing: Listing) -> Self {
        self.listings.insert(repository.to_string(), listing);
        self
    }

    /// Repository names listed so far, in call order.
    pub fn listed(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Context used for the most recent listing of `repository`.
    pub fn context_for(&self, repository: &str) -> Option<ConnectionContext> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(name, _)| name == repository)
            .map(|(_, ctx)| ctx.clone())
    }

    fn attempts(&self, repository: &str) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == repository)
            .count() as u32
    }
}

#[async_trait]
impl TagLister for FakeTagLister {
    async fn list_tags(
        &self,
        ctx: &ConnectionContext,
        repository: &RegistryReference,
    ) -> Result<Vec<String>, RegistryError> {
        let name = repository.name();
        self.calls.lock().unwrap().push((name.clone(), ctx.clone()));

        match self.listings.get(&name) {
            Some(Listing::Tags(tags)) => Ok(tags.clone()),
            Some(Listing::Unauthorized) => Err(RegistryError::Unauthorized(format!(
                "listing {} is not allowed",
                name
            ))),
            Some(Listing::Status(status)) => Err(RegistryError::Status {
                status: *status,
                message: "fake registry error".to_string(),
            }),
            Some(Listing::Flaky { failures, tags }) => {
                if self.attempts(&name) <= *failures {
                    Err(RegistryError::Network("connection reset".to_string()))
                } else {
                    Ok(tags.clone())
                }
            }
            None => Err(RegistryError::NotFound(name)),
        }
    }
}

/// How the fake transfer treats one source reference.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Always fails with a retryable error.
    AlwaysFail,
    /// Fails with a non-retryable error.
    Reject,
    /// Fails with a retryable error `n` times, then succeeds.
    FailTimes(u32),
    /// Never completes.
    Hang,
}

/// Transfer that records each attempt and succeeds unless told otherwise.
#[derive(Default)]
pub struct FakeTransfer {
    outcomes: HashMap<String, Outcome>,
    attempts: Mutex<Vec<(String, String)>>,
    completed: Mutex<Vec<(String, String)>>,
}

impl FakeTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `source` is the transport-qualified source, e.g. `docker://quay.io/a:1`.
    pub fn with_outcome(mut self, source: &str, outcome: Outcome) -> Self {
        self.outcomes.insert(source.to_string(), outcome);
        self
    }

    /// Every attempt as `(from, to)`, including failed ones.
    pub fn attempts(&self) -> Vec<(String, String)> {
        self.attempts.lock().unwrap().clone()
    }

    /// Successful transfers as `(from, to)`.
    pub fn completed(&self) -> Vec<(String, String)> {
        self.completed.lock().unwrap().clone()
    }

    pub fn attempts_for(&self, source: &str) -> usize {
        self.attempts()
            .iter()
            .filter(|(from, _)| from == source)
            .count()
    }
}

#[async_trait]
impl ImageTransfer for FakeTransfer {
    async fn transfer(&self, request: &TransferRequest<'_>) -> Result<(), TransferError> {
        let from = request.source.to_string();
        let to = request.destination.to_string();
        self.attempts.lock().unwrap().push((from.clone(), to.clone()));

        match self.outcomes.get(&from) {
            Some(Outcome::AlwaysFail) => {
                return Err(TransferError::transient(format!("{} keeps failing", from)))
            }
            Some(Outcome::Reject) => {
                return Err(TransferError::permanent(format!("{} rejected", from)))
            }
            Some(Outcome::FailTimes(n)) if self.attempts_for(&from) <= *n as usize => {
                return Err(TransferError::transient("connection reset"))
            }
            Some(Outcome::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            _ => {}
        }

        self.completed.lock().unwrap().push((from, to));
        Ok(())
    }
}

/// Sync options with instant retries, for tests.
pub fn options(source: SourceTransport, destination: DestinationTransport) -> SyncOptions {
    let mut options = SyncOptions::new(source, destination);
    options.retry = RetryPolicy::new(2, Some(Duration::ZERO));
    options
}

/// A valid sha256 digest for test references.
pub const DIGEST: &str =
    "sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
