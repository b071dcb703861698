//! Domain types and the ports the application layer depends on.

pub mod ledger;
pub mod money;
pub mod payout;
pub mod ports;
