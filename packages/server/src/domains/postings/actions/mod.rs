mod cite;
mod submit;
mod terminate;

pub use cite::{cite_posting, CitationRequest};
pub use submit::{submit_posting, PostingReceipt, PostingSubmission};
pub use terminate::terminate_posting;
