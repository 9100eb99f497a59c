//! BDD scenarios for the address lookup.

use rstest_bdd_macros::scenario;

use super::test_helpers::{LookupContext, lookup_context};

#[scenario(
    path = "tests/features/lookup.feature",
    name = "Report the address bound to a machine selected by ID"
)]
fn scenario_lookup_by_id(lookup_context: LookupContext) {
    drop(lookup_context);
}

#[scenario(
    path = "tests/features/lookup.feature",
    name = "Fail fast when a named machine has no interfaces"
)]
fn scenario_fail_fast(lookup_context: LookupContext) {
    drop(lookup_context);
}

#[scenario(
    path = "tests/features/lookup.feature",
    name = "Stop when the machine name matches nothing"
)]
fn scenario_unknown_name(lookup_context: LookupContext) {
    drop(lookup_context);
}

#[scenario(
    path = "tests/features/lookup.feature",
    name = "Fall back to the secondary token path"
)]
fn scenario_token_fallback(lookup_context: LookupContext) {
    drop(lookup_context);
}

#[scenario(
    path = "tests/features/lookup.feature",
    name = "Give up once the wait budget is spent"
)]
fn scenario_timeout(lookup_context: LookupContext) {
    drop(lookup_context);
}

#[scenario(
    path = "tests/features/lookup.feature",
    name = "Report rejection when both token paths fail"
)]
fn scenario_auth_rejected(lookup_context: LookupContext) {
    drop(lookup_context);
}
