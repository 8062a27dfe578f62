//! Slidepost Core - content-addressed slide storage with quota enforcement and expiry

pub mod error;
pub mod formatter;
pub mod operations;
pub mod options;
pub mod storage;
pub mod sweeper;

pub use error::{Result, SlideError};
pub use formatter::{DocumentFormatter, FormatError};
pub use operations::*;
pub use options::{
    DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_HOURS, DEFAULT_MAX_QUOTA, DEFAULT_SWEEP_INTERVAL,
    ServiceOptions,
};
pub use storage::{
    BlobEntry, ContentStore, PutBlobResult, QuotaAccounting, SLIDES_DIR, compute_key,
    sanitize_key,
};
pub use sweeper::{ExpirySweeper, SweepReport, SweeperHandle, SweeperState, SweeperStatus};
