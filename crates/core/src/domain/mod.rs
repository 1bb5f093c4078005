pub mod diff;
pub mod filter;
pub mod query;
pub mod snapshot;
pub mod table;
