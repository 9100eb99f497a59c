//! Behavioural scenarios for the machine address lookup.

mod lookup;
