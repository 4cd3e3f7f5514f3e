pub mod entities;
pub mod ledger;

pub use entities::*;
pub use ledger::*;
