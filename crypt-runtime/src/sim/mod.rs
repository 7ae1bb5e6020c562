//! In-memory collaborators for paper runs and tests: an asset ledger and a
//! yield venue accruing at a fixed APR.

pub mod token;
pub mod venue;

pub use token::SimToken;
pub use venue::SimVenue;
