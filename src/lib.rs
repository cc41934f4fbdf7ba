//! REDCap API client library.
//!
//! A Rust library for the REDCap clinical-data-capture API: one fixed
//! endpoint URL, form-POST requests, and a layered error model that
//! distinguishes transport failures, wrong-URL responses, and
//! application-level rejections the server reports inside
//! HTTP-successful bodies.
//!
//! # Quick Start
//!
//! ```no_run
//! use redcapi::{ExportRecordsQuery, RedcapClient, RedcapProject};
//!
//! #[tokio::main]
//! async fn main() -> redcapi::Result<()> {
//!     let client = RedcapClient::new("https://redcap.example.edu/api/")?;
//!     let project = RedcapProject::new(client, "1234567890ABCDEF1234567890ABCDEF")?;
//!
//!     // Export all records, decoded
//!     let records = project.export_records(&ExportRecordsQuery::default()).await?;
//!     println!("{} records", records.len());
//!
//!     // Large projects: export in bounded batches to stay inside
//!     // server time/memory limits
//!     let records = project
//!         .export_records_in_batches(500, &ExportRecordsQuery::default())
//!         .await?;
//!     println!("{} records", records.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`RedcapClient`] - the connection: owns the endpoint URL, TLS
//!   settings, and timeouts; every request funnels through its single
//!   [`call`](RedcapClient::call) operation, which classifies transport
//!   and HTTP failures and returns the raw body with per-call
//!   diagnostics ([`CallInfo`]).
//! - [`RedcapProject`] - operations on one project (records, metadata,
//!   files, project configuration), each validating its arguments
//!   before any I/O and checking responses for the server's
//!   `{"error": ...}` envelope.
//! - [`RecordIdBatches`] - lazy partitioning of a record-id universe
//!   into bounded batches for bulk export/import.
//! - [`Transport`] - the seam the connection performs I/O through;
//!   tests substitute their own implementation to simulate failures.
//!
//! # Errors
//!
//! Every failure is one [`RedcapError`] variant carrying the detail
//! available where it arose: validation problems surface before any
//! request is made, transport errors keep the transport's numeric code
//! and message verbatim, and server-side rejections
//! ([`RedcapError::ApiError`]) are distinct from "the host was wrong"
//! ([`RedcapError::InvalidUrl`]). Nothing is retried internally.

mod batch;
mod client;
mod error;
mod params;
mod project;
mod transport;
mod validate;

// Re-export core types
pub use batch::{stitch_tabular, RecordIdBatches};
pub use client::{CallInfo, CallOutcome, ClientBuilder, RedcapClient};
pub use error::{application_error, RedcapError, Result};
pub use params::RequestParameters;
pub use transport::{
    FileUpload, Transport, TransportError, TransportRequest, TransportResponse,
};
pub use validate::{ApiToken, Format, TokenKind};

// Re-export project operations
pub use project::{
    DateFormat,
    ExportRecordsQuery,
    ImportRecordsOptions,
    ImportResult,
    MetadataQuery,
    RawOrLabel,
    RecordType,
    Redcap,
    RedcapProject,
    ReturnContent,
};
