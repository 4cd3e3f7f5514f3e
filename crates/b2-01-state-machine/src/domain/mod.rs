pub mod entities;
pub mod errors;
pub mod machine;
pub mod parser;

pub use entities::*;
pub use errors::*;
pub use machine::*;
pub use parser::*;
