//! Process supervision: analyzer launch and output streaming.
//!
//! - [`AnalyzerCommand`]: how an external analyzer is invoked (program +
//!   args carrying the video source and serialized lane list).
//! - [`ProcessSupervisor`]: launches one analyzer, streams its
//!   newline-delimited JSON output, persists every record, and honors
//!   registry-polled cancellation.

mod analyzer;
mod supervisor;

pub use analyzer::AnalyzerCommand;
pub use supervisor::{ProcessSupervisor, SuperviseJob};
