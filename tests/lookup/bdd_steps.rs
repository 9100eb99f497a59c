//! BDD step definitions for the address lookup.

use std::time::Duration;

use rstest_bdd_macros::{given, then, when};
use serde_json::json;
use tokio::runtime::Builder;
use tokio::time::Instant;
use verge_ip::api::API_PREFIX;
use verge_ip::test_support::{json_addresses, json_nics, json_token, json_vms};
use verge_ip::{
    ApiClient, CredentialResolver, Credentials, MachineId, MachineSelector, PollOutcome, Poller,
    wait_budget,
};

use super::test_helpers::{LookupContext, LookupResult, POLL_INTERVAL};

const BASE_URL: &str = "https://verge.test";

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("runtime setup failed: {0}")]
    Runtime(String),
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a configured API token")]
fn configured_token(mut lookup_context: LookupContext) -> LookupContext {
    lookup_context.credentials = Credentials {
        token: Some(String::from("configured-token")),
        user: None,
        password: None,
    };
    lookup_context
}

#[given("login credentials \"{user}\" and \"{password}\"")]
fn login_credentials(
    mut lookup_context: LookupContext,
    user: String,
    password: String,
) -> LookupContext {
    lookup_context.credentials = Credentials {
        token: None,
        user: Some(user),
        password: Some(password),
    };
    lookup_context
}

#[given("the primary token path answers with status \"{status}\"")]
fn primary_path_status(lookup_context: LookupContext, status: u16) -> LookupContext {
    lookup_context.transport.push_status(status, "primary rejected");
    lookup_context
}

#[given("the secondary token path answers with status \"{status}\"")]
fn secondary_path_status(lookup_context: LookupContext, status: u16) -> LookupContext {
    lookup_context.transport.push_status(status, "secondary rejected");
    lookup_context
}

#[given("the secondary token path issues token \"{token}\"")]
fn secondary_path_token(lookup_context: LookupContext, token: String) -> LookupContext {
    lookup_context.transport.push_json(&json_token(&token));
    lookup_context
}

#[given("the name resolves to machine \"{machine}\"")]
fn name_resolves(lookup_context: LookupContext, machine: u64) -> LookupContext {
    lookup_context.transport.push_json(&json_vms(&[machine]));
    lookup_context
}

#[given("the name matches no machine")]
fn name_matches_nothing(lookup_context: LookupContext) -> LookupContext {
    lookup_context.transport.push_json(&json!([]));
    lookup_context
}

#[given("the machine has an interface with MAC \"{mac}\" bound to \"{ip}\"")]
fn interface_bound(lookup_context: LookupContext, mac: String, ip: String) -> LookupContext {
    lookup_context.transport.push_json(&json_nics(&[Some(mac.as_str())]));
    lookup_context
        .transport
        .push_json(&json_addresses(&mac, &[ip.as_str()]));
    lookup_context
}

#[given("the machine has no interfaces")]
fn no_interfaces(lookup_context: LookupContext) -> LookupContext {
    lookup_context.transport.push_json(&json_nics(&[]));
    lookup_context
}

#[given("interface lookups stay empty \"{count}\" times")]
fn interfaces_stay_empty(lookup_context: LookupContext, count: usize) -> LookupContext {
    for _ in 0..count {
        lookup_context.transport.push_json(&json_nics(&[]));
    }
    lookup_context
}

#[when("I look up machine ID \"{machine}\" with timeout \"{timeout}\"")]
fn look_up_by_id(
    lookup_context: LookupContext,
    machine: u64,
    timeout: i64,
) -> Result<LookupContext, StepError> {
    run_lookup(
        lookup_context,
        &MachineSelector::Id(MachineId(machine)),
        timeout,
    )
}

#[when("I look up machine name \"{name}\" with timeout \"{timeout}\"")]
fn look_up_by_name(
    lookup_context: LookupContext,
    name: String,
    timeout: i64,
) -> Result<LookupContext, StepError> {
    run_lookup(lookup_context, &MachineSelector::Name(name), timeout)
}

fn run_lookup(
    lookup_context: LookupContext,
    selector: &MachineSelector,
    timeout: i64,
) -> Result<LookupContext, StepError> {
    let runtime = Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .map_err(|err| StepError::Runtime(err.to_string()))?;

    let poller = Poller::new(
        ApiClient::new(BASE_URL, lookup_context.transport.clone()),
        CredentialResolver::new(lookup_context.credentials.clone()),
    )
    .with_poll_interval(POLL_INTERVAL);

    let (result, elapsed) = runtime.block_on(async {
        let started = Instant::now();
        let result = poller
            .run(selector, wait_budget(timeout))
            .await
            .and_then(PollOutcome::into_addresses);
        (result, started.elapsed())
    });
    let outcome = match result {
        Ok(addresses) => LookupResult::Found(addresses),
        Err(err) => LookupResult::Failed(err.to_string()),
    };

    Ok(LookupContext {
        outcome: Some(outcome),
        elapsed: Some(elapsed),
        ..lookup_context
    })
}

#[then("the addresses are \"{expected}\"")]
fn addresses_are(lookup_context: &LookupContext, expected: String) -> Result<(), StepError> {
    let expected: Vec<String> = expected.split(',').map(str::to_owned).collect();
    match &lookup_context.outcome {
        Some(LookupResult::Found(addresses)) if *addresses == expected => Ok(()),
        Some(LookupResult::Found(addresses)) => Err(StepError::Assertion(format!(
            "expected {expected:?}, got {addresses:?}"
        ))),
        Some(LookupResult::Failed(message)) => Err(StepError::Assertion(format!(
            "expected addresses, got failure: {message}"
        ))),
        None => Err(StepError::Assertion(String::from("missing outcome"))),
    }
}

#[then("the lookup fails with \"{message}\"")]
fn lookup_fails(lookup_context: &LookupContext, message: String) -> Result<(), StepError> {
    match &lookup_context.outcome {
        Some(LookupResult::Failed(actual)) if actual.contains(&message) => Ok(()),
        Some(LookupResult::Failed(actual)) => Err(StepError::Assertion(format!(
            "expected error containing '{message}', got: {actual}"
        ))),
        Some(LookupResult::Found(addresses)) => Err(StepError::Assertion(format!(
            "expected failure, got addresses {addresses:?}"
        ))),
        None => Err(StepError::Assertion(String::from("missing outcome"))),
    }
}

#[then("\"{count}\" requests were made")]
fn requests_made(lookup_context: &LookupContext, count: usize) -> Result<(), StepError> {
    let made = lookup_context.transport.request_count();
    if made == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} requests, got {made}"
        )))
    }
}

#[then("every API call carries token \"{token}\"")]
fn every_call_carries_token(lookup_context: &LookupContext, token: String) -> Result<(), StepError> {
    let requests = lookup_context.transport.requests();
    let collection_calls: Vec<_> = requests
        .iter()
        .filter(|request| request.url.contains(API_PREFIX))
        .collect();
    if collection_calls.is_empty() {
        return Err(StepError::Assertion(String::from(
            "no collection requests were recorded",
        )));
    }
    match collection_calls
        .iter()
        .find(|request| request.token.as_deref() != Some(token.as_str()))
    {
        Some(request) => Err(StepError::Assertion(format!(
            "request to {} carried {:?}",
            request.url, request.token
        ))),
        None => Ok(()),
    }
}

#[then("the run lasted between \"{low}\" and \"{high}\" seconds")]
fn run_lasted(lookup_context: &LookupContext, low: u64, high: u64) -> Result<(), StepError> {
    let elapsed = lookup_context
        .elapsed
        .ok_or_else(|| StepError::Assertion(String::from("missing elapsed time")))?;
    if elapsed >= Duration::from_secs(low) && elapsed < Duration::from_secs(high) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected a run between {low}s and {high}s, took {elapsed:?}"
        )))
    }
}
