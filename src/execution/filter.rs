use std::sync::Arc;

use crate::common::Result;
use crate::record::{Record, RecordSchema};

use super::{BoxedExecutor, Executor};

/// Record predicate of the filter executor
pub type Predicate = Box<dyn Fn(&Record) -> bool>;

/// Yields the child's records that satisfy a predicate, in child order.
pub struct FilterExecutor {
    child: BoxedExecutor,
    predicate: Predicate,
    record: Option<Record>,
}

impl FilterExecutor {
    pub fn new(child: BoxedExecutor, predicate: Predicate) -> Self {
        Self {
            child,
            predicate,
            record: None,
        }
    }

    /// Leaves the child positioned on the next matching record, if any.
    fn advance_to_match(&mut self) -> Result<()> {
        while !self.child.is_end() {
            if let Some(rec) = self.child.record() {
                if (self.predicate)(&rec) {
                    self.record = Some(rec);
                    return Ok(());
                }
            }
            self.child.next()?;
        }
        self.record = None;
        Ok(())
    }
}

impl Executor for FilterExecutor {
    fn init(&mut self) -> Result<()> {
        self.child.init()?;
        self.record = None;
        self.advance_to_match()
    }

    fn next(&mut self) -> Result<()> {
        self.record = None;
        if self.child.is_end() {
            return Ok(());
        }
        self.child.next()?;
        self.advance_to_match()
    }

    fn record(&self) -> Option<Record> {
        self.record.clone()
    }

    fn is_end(&self) -> bool {
        self.record.is_none()
    }

    fn out_schema(&self) -> &Arc<RecordSchema> {
        self.child.out_schema()
    }
}
