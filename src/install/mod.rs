pub mod manifest;
pub mod paths;

pub use manifest::*;
pub use paths::*;
