use thiserror::Error;

use super::types::{FileId, PageId, Rid};

/// Storage engine error types
#[derive(Error, Debug)]
pub enum QuarryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No free frame in buffer pool")]
    NoFreeFrame,

    #[error("Record not found at {0}")]
    RecordMiss(Rid),

    #[error("Record already exists at {0}")]
    RecordExists(Rid),

    #[error("Invalid page ID: {0}")]
    PageMiss(PageId),

    #[error("File {0} not registered with the disk manager")]
    FileNotFound(FileId),

    #[error("File {0:?} already exists")]
    FileExists(String),

    #[error("Invalid table file: {0}")]
    InvalidTableFile(String),

    #[error("Field {0:?} not found in schema")]
    FieldMiss(String),

    #[error("Value does not fit field type: {0}")]
    ValueMismatch(String),

    #[error("Chunk scan requires the PAX storage model")]
    ChunkUnsupported,
}

pub type Result<T> = std::result::Result<T, QuarryError>;
