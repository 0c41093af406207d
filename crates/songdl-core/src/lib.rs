//! songdl-core – download orchestration shared by the songdl services.
//!
//! The crate owns everything between "a validated request arrived" and
//! "a file sits in the output directory with a known name":
//!
//! - [`converter`]: the external download tool behind the [`Converter`] trait.
//! - [`process`]: subprocess execution with a bounded timeout.
//! - [`job`]: job tokens, the canonical naming convention and the registry
//!   that keeps concurrent jobs from claiming each other's files.
//! - [`discovery`]: locating (and if needed renaming) a job's artifact.
//! - [`janitor`]: deferred, cancellable artifact deletion.
//! - [`orchestrator`]: the end-to-end `handle_download` operation.

pub mod converter;
pub mod discovery;
pub mod error;
pub mod format;
pub mod janitor;
pub mod job;
pub mod metadata;
pub mod orchestrator;
pub mod process;
pub mod resolve;

pub use converter::{Converter, Invocation, SpotDl, SpotDlSettings, ToolOutput};
pub use discovery::Artifact;
pub use error::{DownloadError, classify_failure};
pub use format::AudioFormat;
pub use janitor::Janitor;
pub use job::{DownloadJob, JobGuard, JobRegistry, JobToken};
pub use metadata::TrackInfo;
pub use orchestrator::{DownloadOutcome, DownloadRequest, Orchestrator, OrchestratorSettings};
pub use process::{ProcessError, ProcessOutput};
pub use resolve::{resolve_within, ResolveError};
