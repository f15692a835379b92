mod single_use_ledger_memory;

pub use single_use_ledger_memory::*;
