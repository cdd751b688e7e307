use std::sync::Arc;

use crate::common::Result;
use crate::record::{Record, RecordSchema};

/// One node of a pull-based iterator tree.
///
/// Protocol: after `init`, if `!is_end()`, `record` yields the first result.
/// The caller then alternates `record` / `next` until `is_end` is true:
///
/// ```text
/// exec.init()?;
/// while !exec.is_end() {
///     if let Some(rec) = exec.record() { /* consume */ }
///     exec.next()?;
/// }
/// ```
///
/// `init` restarts iteration from scratch. Each parent exclusively owns its
/// children; errors from the storage layer bubble to the query driver.
pub trait Executor {
    /// Prepares (or restarts) iteration.
    fn init(&mut self) -> Result<()>;

    /// Advances to the next result.
    fn next(&mut self) -> Result<()>;

    /// The current result, or None when exhausted.
    fn record(&self) -> Option<Record>;

    fn is_end(&self) -> bool;

    /// Schema of the records this executor produces.
    fn out_schema(&self) -> &Arc<RecordSchema>;
}

pub type BoxedExecutor = Box<dyn Executor>;
