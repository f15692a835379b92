// store

mod single_use_ledger;

pub use single_use_ledger::*;

// repo

mod auth_repo;

pub use auth_repo::*;
