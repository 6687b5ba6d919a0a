pub mod catalog;
pub mod resolver;

pub use catalog::*;
pub use resolver::*;
