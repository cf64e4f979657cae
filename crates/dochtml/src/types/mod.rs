//! Core data types

pub mod format;
pub mod job;
pub mod settings;

pub use format::{DocumentFormat, FormatDetector};
pub use job::{
    ConversionResult, FileDescriptor, FileStatus, JobSnapshot, JobStatus, TextStatus,
};
pub use settings::Settings;
