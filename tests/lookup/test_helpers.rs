//! Shared fixtures for lookup BDD scenarios.

use std::time::Duration;

use rstest::fixture;
use verge_ip::test_support::ScriptedTransport;
use verge_ip::Credentials;

/// Poll interval used by every scenario.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LookupResult {
    Found(Vec<String>),
    Failed(String),
}

#[derive(Clone, Debug)]
pub struct LookupContext {
    pub transport: ScriptedTransport,
    pub credentials: Credentials,
    pub outcome: Option<LookupResult>,
    pub elapsed: Option<Duration>,
}

#[fixture]
pub fn lookup_context() -> LookupContext {
    LookupContext {
        transport: ScriptedTransport::new(),
        credentials: Credentials::default(),
        outcome: None,
        elapsed: None,
    }
}
