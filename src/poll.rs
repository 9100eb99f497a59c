//! Deadline-bounded address polling.
//!
//! A run authenticates once, resolves the machine name once when needed, and
//! then repeats the two-stage address lookup until an address appears, the
//! wait budget is spent, or a remote call fails. With no wait budget exactly
//! one lookup is made.

use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError, Transport};
use crate::auth::{AuthError, CredentialResolver};
use crate::machine::{self, MachineError, MachineId, MachineSelector};

/// Default pause between unsuccessful lookups.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Terminal state of a polling run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PollOutcome {
    /// At least one address was found; addresses are in discovery order.
    Found(Vec<String>),
    /// The wait budget elapsed without any address appearing.
    TimedOut {
        /// Wait budget that was exhausted.
        waited: Duration,
    },
    /// The single lookup made without a wait budget found nothing.
    NoWaitNoResult,
}

impl PollOutcome {
    /// Converts the outcome into the addresses found, treating every other
    /// terminal state as an error.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Timeout`] for [`Self::TimedOut`] and
    /// [`LookupError::NoResult`] for [`Self::NoWaitNoResult`].
    pub fn into_addresses(self) -> Result<Vec<String>, LookupError> {
        match self {
            Self::Found(addresses) => Ok(addresses),
            Self::TimedOut { waited } => Err(LookupError::Timeout { waited }),
            Self::NoWaitNoResult => Err(LookupError::NoResult),
        }
    }
}

/// Errors that end a run without an address.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum LookupError {
    /// No usable API token could be obtained.
    #[error(transparent)]
    Authentication(#[from] AuthError),
    /// The machine name matched no VM.
    #[error("machine '{name}' not found")]
    NotFound {
        /// Name that matched nothing.
        name: String,
    },
    /// A remote call failed or returned an unexpected payload.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The wait budget elapsed with no address.
    #[error("timed out waiting for an IP address after {}s", .waited.as_secs())]
    Timeout {
        /// Wait budget that was exhausted.
        waited: Duration,
    },
    /// The single no-wait lookup found nothing.
    #[error("no addresses found")]
    NoResult,
}

impl From<MachineError> for LookupError {
    fn from(value: MachineError) -> Self {
        match value {
            MachineError::NotFound { name } => Self::NotFound { name },
            MachineError::Api(err) => Self::Api(err),
        }
    }
}

/// Converts a timeout in whole seconds into a wait budget; zero or negative
/// values mean "do not wait".
#[must_use]
pub fn wait_budget(timeout_secs: i64) -> Option<Duration> {
    u64::try_from(timeout_secs)
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// Drives credential acquisition, name resolution, and the address poll
/// loop for one run.
#[derive(Debug)]
pub struct Poller<T> {
    client: ApiClient<T>,
    resolver: CredentialResolver,
    poll_interval: Duration,
}

impl<T: Transport> Poller<T> {
    /// Creates a poller using [`DEFAULT_POLL_INTERVAL`].
    #[must_use]
    pub const fn new(client: ApiClient<T>, resolver: CredentialResolver) -> Self {
        Self {
            client,
            resolver,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Overrides the pause between unsuccessful lookups.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Runs the lookup for `selector`, waiting up to `wait` for an address.
    ///
    /// `None` performs exactly one lookup. With a budget, lookups repeat every
    /// poll interval until one succeeds or the time since the first lookup
    /// reaches the budget. A request in flight when the budget runs out is
    /// allowed to finish.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] when authentication, name resolution, or any
    /// remote call fails. Empty results are reported through
    /// [`PollOutcome`], not as errors.
    pub async fn run(
        &self,
        selector: &MachineSelector,
        wait: Option<Duration>,
    ) -> Result<PollOutcome, LookupError> {
        let token = self.resolver.resolve(&self.client).await?;
        let machine = self.resolve_machine(&token, selector).await?;

        let started = Instant::now();
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            debug!("address lookup attempt {attempt} for machine {machine}");
            let addresses = machine::resolve_addresses(&self.client, &token, machine).await?;
            if !addresses.is_empty() {
                return Ok(PollOutcome::Found(addresses));
            }

            let Some(budget) = wait else {
                return Ok(PollOutcome::NoWaitNoResult);
            };

            let elapsed = started.elapsed();
            if elapsed >= budget {
                return Ok(PollOutcome::TimedOut { waited: budget });
            }

            info!(
                "waiting for IP... ({}/{}s)",
                elapsed.as_secs(),
                budget.as_secs()
            );
            sleep(self.poll_interval).await;
        }
    }

    async fn resolve_machine(
        &self,
        token: &str,
        selector: &MachineSelector,
    ) -> Result<MachineId, LookupError> {
        match selector {
            MachineSelector::Id(id) => Ok(*id),
            MachineSelector::Name(name) => {
                let id = machine::resolve_by_name(&self.client, token, name).await?;
                info!("resolved '{name}' to machine ID {id}");
                Ok(id)
            }
        }
    }
}
