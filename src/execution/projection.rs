use std::sync::Arc;

use crate::common::Result;
use crate::record::{Record, RecordSchema};

use super::{BoxedExecutor, Executor};

/// Narrows each child record to an output schema, preserving child order.
/// The output schema must name a subset of the child's fields.
pub struct ProjectionExecutor {
    child: BoxedExecutor,
    out_schema: Arc<RecordSchema>,
    record: Option<Record>,
}

impl ProjectionExecutor {
    pub fn new(child: BoxedExecutor, out_schema: Arc<RecordSchema>) -> Self {
        Self {
            child,
            out_schema,
            record: None,
        }
    }

    fn project_current(&mut self) -> Result<()> {
        self.record = None;
        if !self.child.is_end() {
            if let Some(rec) = self.child.record() {
                self.record = Some(Record::project(Arc::clone(&self.out_schema), &rec)?);
            }
        }
        Ok(())
    }
}

impl Executor for ProjectionExecutor {
    fn init(&mut self) -> Result<()> {
        self.child.init()?;
        self.project_current()
    }

    fn next(&mut self) -> Result<()> {
        self.child.next()?;
        self.project_current()
    }

    fn record(&self) -> Option<Record> {
        self.record.clone()
    }

    fn is_end(&self) -> bool {
        self.child.is_end() || self.record.is_none()
    }

    fn out_schema(&self) -> &Arc<RecordSchema> {
        &self.out_schema
    }
}
