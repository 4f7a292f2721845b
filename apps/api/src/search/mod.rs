pub mod distributor;
pub mod executor;
pub mod handlers;
pub mod ledger;
pub mod session;
