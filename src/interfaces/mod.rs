//! Adapters that move payout commands in and payout listings out of the CLI.

pub mod csv;
