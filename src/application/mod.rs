// Application layer: the rental ledger and the errors it reports.
// The CLI only talks to `RentalLedger`; storage stays behind it.

pub mod config;
pub mod error;
pub mod service;

pub use config::*;
pub use error::*;
pub use service::*;
