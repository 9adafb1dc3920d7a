pub mod concept;
pub mod description;

pub use concept::*;
pub use description::*;
