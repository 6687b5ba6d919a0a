pub mod cache;
pub mod client;
pub mod parse;
pub mod table;

pub use cache::*;
pub use client::*;
pub use parse::*;
pub use table::*;
