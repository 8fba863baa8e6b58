pub mod enrichment;
pub mod manifest;

pub use enrichment::*;
pub use manifest::*;
