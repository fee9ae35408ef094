pub mod compiler;
pub mod error;
pub mod mimi;
pub mod project;

pub use compiler::Compiler;
pub use error::Error;
