//! Shared vocabulary for the BinExplorer console: identifiers, the remote
//! query seam, the console transcript, and the analysis payload readers.

mod error;
mod identifiers;
pub mod payload;
pub mod query;
mod transcript;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::CoreError;
pub use identifiers::{FunctionId, RequestId};
pub use payload::{
    diagram_nodes, statement_addresses, statement_comments, DiagramNode, DiagramStatement,
    StatementComment,
};
pub use query::{
    payload_display_text, payload_is_empty, QueryDescriptor, QueryResponse, QueryStatus,
    RemoteQueryClient,
};
pub use transcript::{Transcript, TranscriptEntry, TRANSCRIPT_PROMPT};
