//! Ordered destinations for run records.
//!
//! A sink receives exactly one record per completed run, in generation order,
//! and must never reorder them. [`ResultSink::finish`] is called once after
//! the last record so streaming sinks can flush.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::mpsc::{self, SyncSender};
use std::thread::{self, JoinHandle};

use crate::error::SinkError;
use crate::model::RunRecord;

pub trait ResultSink {
    /// Take ownership of the next record
    fn accept(&mut self, record: RunRecord) -> Result<(), SinkError>;

    /// Flush anything buffered. Called once at the end of a batch.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn accept(&mut self, record: RunRecord) -> Result<(), SinkError> {
        (**self).accept(record)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn accept(&mut self, record: RunRecord) -> Result<(), SinkError> {
        (**self).accept(record)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }
}

// ============================================================================
// In-memory and callback sinks
// ============================================================================

/// Keeps every record in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Vec<RunRecord>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    #[must_use]
    pub fn into_records(self) -> Vec<RunRecord> {
        self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ResultSink for MemorySink {
    fn accept(&mut self, record: RunRecord) -> Result<(), SinkError> {
        self.records.push(record);
        Ok(())
    }
}

/// Forwards each record to a closure
pub struct CallbackSink<F> {
    callback: F,
}

impl<F> CallbackSink<F>
where
    F: FnMut(RunRecord) -> Result<(), SinkError>,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ResultSink for CallbackSink<F>
where
    F: FnMut(RunRecord) -> Result<(), SinkError>,
{
    fn accept(&mut self, record: RunRecord) -> Result<(), SinkError> {
        (self.callback)(record)
    }
}

// ============================================================================
// Streaming file sinks
// ============================================================================

/// Writes one delimited line per record: input values, then output display
/// values. Each record is written through as it arrives.
#[derive(Debug)]
pub struct CsvSink<W: Write> {
    writer: W,
    delimiter: char,
    header: bool,
    header_written: bool,
    line: String,
}

impl CsvSink<BufWriter<File>> {
    /// Create (or truncate) a file at `path`
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            delimiter: ',',
            header: false,
            header_written: false,
            line: String::new(),
        }
    }

    /// Emit a header row of column names before the first record
    #[must_use]
    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line<'f>(&mut self, fields: impl Iterator<Item = &'f str>) -> Result<(), SinkError> {
        self.line.clear();
        for (i, field) in fields.enumerate() {
            if i > 0 {
                self.line.push(self.delimiter);
            }
            push_field(&mut self.line, field, self.delimiter);
        }
        self.line.push('\n');
        self.writer.write_all(self.line.as_bytes())?;
        Ok(())
    }
}

impl<W: Write> ResultSink for CsvSink<W> {
    fn accept(&mut self, record: RunRecord) -> Result<(), SinkError> {
        if self.header && !self.header_written {
            let columns: Vec<&str> = record
                .assignment
                .keys()
                .chain(record.outputs.keys())
                .collect();
            self.write_line(columns.into_iter())?;
            self.header_written = true;
        }

        let inputs: Vec<String> = record.assignment.values().map(ToString::to_string).collect();
        let fields = inputs
            .iter()
            .map(String::as_str)
            .chain(record.outputs.iter().map(|(_, v)| v.display.as_str()));
        self.write_line(fields)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Append `field`, quoting it when it contains the delimiter, a quote or a
/// line break
fn push_field(line: &mut String, field: &str, delimiter: char) {
    let needs_quotes = field
        .chars()
        .any(|c| c == delimiter || c == '"' || c == '\n' || c == '\r');
    if !needs_quotes {
        line.push_str(field);
        return;
    }
    line.push('"');
    for c in field.chars() {
        if c == '"' {
            line.push('"');
        }
        line.push(c);
    }
    line.push('"');
}

/// Writes one JSON object per line per record
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl JsonLinesSink<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultSink for JsonLinesSink<W> {
    fn accept(&mut self, record: RunRecord) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

// ============================================================================
// Bounded hand-off to a writer thread
// ============================================================================

/// Moves records to a background thread that owns the inner sink.
///
/// The channel holds at most `capacity` records, so `accept` blocks once the
/// writer falls that far behind instead of buffering without bound. A failure
/// in the inner sink surfaces on the next `accept` or on `finish`.
pub struct BoundedSink<S> {
    sender: Option<SyncSender<RunRecord>>,
    worker: Option<JoinHandle<Result<S, SinkError>>>,
    finished: Option<S>,
}

impl<S> BoundedSink<S>
where
    S: ResultSink + Send + 'static,
{
    /// Start the writer thread for `inner`
    pub fn spawn(inner: S, capacity: usize) -> Result<Self, SinkError> {
        let (sender, receiver) = mpsc::sync_channel::<RunRecord>(capacity);
        let worker = thread::Builder::new()
            .name("batchsim-sink".to_string())
            .spawn(move || {
                let mut inner = inner;
                for record in receiver {
                    inner.accept(record)?;
                }
                inner.finish()?;
                Ok(inner)
            })?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            finished: None,
        })
    }

    /// Finish the writer (if still running) and return the inner sink
    pub fn into_inner(mut self) -> Result<S, SinkError> {
        self.join()?;
        self.finished.take().ok_or(SinkError::Closed)
    }

    fn join(&mut self) -> Result<(), SinkError> {
        // Dropping the sender ends the writer's receive loop
        self.sender.take();
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        match worker.join() {
            Ok(Ok(inner)) => {
                self.finished = Some(inner);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SinkError::WriterPanicked),
        }
    }
}

impl<S> ResultSink for BoundedSink<S>
where
    S: ResultSink + Send + 'static,
{
    fn accept(&mut self, record: RunRecord) -> Result<(), SinkError> {
        let Some(sender) = &self.sender else {
            return Err(SinkError::Closed);
        };
        if sender.send(record).is_err() {
            // The writer hung up early, which only happens when it failed
            self.join()?;
            return Err(SinkError::Closed);
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.join()
    }
}

impl<S> Drop for BoundedSink<S> {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
