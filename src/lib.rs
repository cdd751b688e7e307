//! Quarry - a paged, disk-oriented relational storage core
//!
//! The crate implements the storage and execution spine of a relational
//! engine: tables live in page files on disk, a fixed-size buffer pool caches
//! pages in memory with a pluggable replacement policy, and queries run as
//! pull-based iterator trees over the table heap.
//!
//! # Architecture
//!
//! - **Storage** (`storage`): disk I/O and page interpretation
//!   - `DiskManager`: page-granular reads and writes over registered files
//!   - `NAryPageHandle` / `PaxPageHandle`: row-store and column-banded
//!     in-page layouts behind one tagged `PageHandle`
//!
//! - **Buffer pool** (`buffer`): memory management for database pages
//!   - `BufferPoolManager`: fetches pages on demand and caches them
//!   - `LruReplacer` / `LruKReplacer`: replacement policies behind the
//!     `Replacer` trait
//!   - `PageGuard`: RAII pin that unpins exactly once, on every exit path
//!
//! - **Records** (`record`): fixed-width schemas, values, records, chunks
//!
//! - **Tables** (`table`): the heap-table handle; free pages are threaded
//!   through page headers and cached in the table header
//!
//! - **Execution** (`execution`): `SeqScan`, `Filter`, `Projection`, `Sort`,
//!   and the one-shot DML operators `Insert` / `Update` / `Delete`
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use parking_lot::RwLock;
//! use quarry::buffer::BufferPoolManager;
//! use quarry::common::{DEFAULT_BUFFER_POOL_SIZE, DEFAULT_REPLACER, INVALID_RID};
//! use quarry::execution::{Executor, SeqScanExecutor};
//! use quarry::record::{schema_of, DataType, Record, Value};
//! use quarry::storage::disk::DiskManager;
//! use quarry::table::{StorageModel, TableHandle};
//!
//! let disk = Arc::new(DiskManager::new("db").unwrap());
//! let fid = disk.create_file("users.tbl").unwrap();
//! let bpm = Arc::new(BufferPoolManager::new(
//!     disk,
//!     DEFAULT_BUFFER_POOL_SIZE,
//!     DEFAULT_REPLACER,
//! ));
//!
//! let schema = schema_of(&[("id", DataType::Int), ("name", DataType::Char(16))]);
//! let mut table = TableHandle::create(bpm, fid, schema, StorageModel::NAry).unwrap();
//! let row = Record::from_values(
//!     Arc::clone(table.schema()),
//!     &[Value::Int(1), Value::from("ada")],
//!     INVALID_RID,
//! )
//! .unwrap();
//! table.insert_record(&row).unwrap();
//!
//! let mut scan = SeqScanExecutor::new(Arc::new(RwLock::new(table)));
//! scan.init().unwrap();
//! while !scan.is_end() {
//!     if let Some(rec) = scan.record() {
//!         println!("{:?}", rec.values());
//!     }
//!     scan.next().unwrap();
//! }
//! ```

pub mod buffer;
pub mod common;
pub mod execution;
pub mod index;
pub mod record;
pub mod storage;
pub mod table;

// Re-export commonly used types at the crate root
pub use common::{FileId, PageId, QuarryError, Result, Rid, SlotId};
