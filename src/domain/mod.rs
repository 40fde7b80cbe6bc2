pub mod account;
pub mod entry;
pub mod operation;

pub use account::{Account, AccountBalance};
pub use entry::{status, LedgerEntry};
pub use operation::{Operation, OperationKind};
