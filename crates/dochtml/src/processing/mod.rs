//! Asynchronous conversion jobs and the parallel batch entrypoint

mod batch;
mod job;
mod orchestrator;
mod pipeline;
mod worker;

pub use batch::{batch_process, batch_process_with, find_documents, BatchSummary, BATCH_SUMMARY_FILE};
pub use job::{ConversionJob, JobWriter};
pub use orchestrator::JobOrchestrator;
pub use pipeline::{convert_document, DocumentReport};
pub use worker::JobWorker;
