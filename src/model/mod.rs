pub mod book;
pub mod history;
pub mod patch;

pub use book::*;
pub use history::*;
pub use patch::*;
