pub mod citation;
pub mod posting;

pub use citation::CitationNote;
pub use posting::*;
