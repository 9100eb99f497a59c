//! Step definitions, fixtures, and scenarios for the address lookup.

mod bdd_steps;
mod scenarios;
mod test_helpers;
