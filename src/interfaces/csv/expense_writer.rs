use crate::domain::expense::CommittedRecord;
use std::io::Write;

/// Writes committed expense records as CSV (`id,amount,note,tag,date`).
pub struct ExpenseWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ExpenseWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes the header even when there are no records.
    pub fn write_records(&mut self, records: Vec<CommittedRecord>) -> Result<(), csv::Error> {
        if records.is_empty() {
            self.writer.write_record(["id", "amount", "note", "tag", "date"])?;
        }
        for record in records {
            self.writer.serialize(record)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
