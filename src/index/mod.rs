use crate::common::Result;
use crate::record::Record;

/// Opaque contract for secondary index maintenance.
///
/// DML executors call through this trait for every index registered on the
/// table they mutate. The engine treats index failures as best-effort: the
/// first error aborts the running operator, and with no transaction layer the
/// mutations already applied are not rolled back.
pub trait IndexHandle: Send + Sync {
    fn insert_record(&self, record: &Record) -> Result<()>;

    fn delete_record(&self, record: &Record) -> Result<()>;

    fn update_record(&self, old: &Record, new: &Record) -> Result<()>;
}
