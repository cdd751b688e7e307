use std::sync::Arc;

use crate::common::Result;
use crate::record::{Record, RecordSchema};

use super::{BoxedExecutor, Executor};

/// In-memory sort: drains the child into a buffer on `init`, orders it by a
/// key schema (fields compared in key order, descending when `is_desc`), and
/// replays the buffer. The sort is stable, so key ties keep child order.
///
/// Inputs larger than memory would need an external merge pass; this
/// executor materializes everything.
pub struct SortExecutor {
    child: BoxedExecutor,
    key_schema: Arc<RecordSchema>,
    is_desc: bool,
    buffer: Vec<Record>,
    buf_idx: usize,
    is_sorted: bool,
    record: Option<Record>,
}

impl SortExecutor {
    pub fn new(child: BoxedExecutor, key_schema: Arc<RecordSchema>, is_desc: bool) -> Self {
        Self {
            child,
            key_schema,
            is_desc,
            buffer: Vec::new(),
            buf_idx: 0,
            is_sorted: false,
            record: None,
        }
    }
}

impl Executor for SortExecutor {
    fn init(&mut self) -> Result<()> {
        self.buf_idx = 0;
        self.is_sorted = false;
        self.buffer.clear();
        self.record = None;

        self.child.init()?;
        let mut keyed: Vec<(Record, Record)> = Vec::new();
        while !self.child.is_end() {
            if let Some(rec) = self.child.record() {
                let key = Record::project(Arc::clone(&self.key_schema), &rec)?;
                keyed.push((key, rec));
            }
            self.child.next()?;
        }

        keyed.sort_by(|(a, _), (b, _)| {
            let ord = a.compare(b);
            if self.is_desc {
                ord.reverse()
            } else {
                ord
            }
        });
        self.buffer = keyed.into_iter().map(|(_, rec)| rec).collect();

        if !self.buffer.is_empty() {
            self.is_sorted = true;
            self.record = Some(self.buffer[0].clone());
        }
        Ok(())
    }

    fn next(&mut self) -> Result<()> {
        if !self.is_sorted || self.buf_idx + 1 >= self.buffer.len() {
            self.record = None;
            self.buf_idx = self.buffer.len();
            return Ok(());
        }
        self.buf_idx += 1;
        self.record = Some(self.buffer[self.buf_idx].clone());
        Ok(())
    }

    fn record(&self) -> Option<Record> {
        self.record.clone()
    }

    fn is_end(&self) -> bool {
        !self.is_sorted || self.record.is_none() || self.buf_idx >= self.buffer.len()
    }

    fn out_schema(&self) -> &Arc<RecordSchema> {
        self.child.out_schema()
    }
}
