//! Source of records for the continuous ingestion loop.

use crate::record::LogRecord;

/// Produces one record per call.
///
/// Returning `None` means the source is exhausted; live generators never
/// do. Any iterator of records is a source.
pub trait RecordSource: Send {
    fn next_record(&mut self) -> Option<LogRecord>;
}

impl<I> RecordSource for I
where
    I: Iterator<Item = LogRecord> + Send,
{
    fn next_record(&mut self) -> Option<LogRecord> {
        self.next()
    }
}
