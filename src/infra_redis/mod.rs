mod single_use_ledger_redis;

pub use single_use_ledger_redis::*;
