// Destinations for simulation events. The logger worker owns exactly one sink.

use indicatif::ProgressBar;
use parking_lot::Mutex;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

pub trait LogSink: Send + fmt::Debug {
    fn emit(&mut self, message: &str) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Prints `[LOG] <message>`. With a progress bar attached, lines go above the bar.
#[derive(Default)]
pub struct ConsoleSink {
    progress: Option<ProgressBar>,
}

impl fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleSink")
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(progress: ProgressBar) -> Self {
        Self { progress: Some(progress) }
    }
}

impl LogSink for ConsoleSink {
    fn emit(&mut self, message: &str) -> io::Result<()> {
        match &self.progress {
            Some(pb) if !pb.is_hidden() => {
                pb.println(format!("[LOG] {}", message));
                Ok(())
            }
            _ => writeln!(io::stdout().lock(), "[LOG] {}", message),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

/// Appends `[EVENT] <timestamp> <message>` lines to a file.
#[derive(Debug)]
pub struct FileSink {
    writer: BufWriter<File>,
}

impl FileSink {
    pub fn append(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl LogSink for FileSink {
    fn emit(&mut self, message: &str) -> io::Result<()> {
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        writeln!(self.writer, "[EVENT] {} {}", stamp, message)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Keeps every message in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for MemorySink {
    fn emit(&mut self, message: &str) -> io::Result<()> {
        self.lines.lock().push(message.to_string());
        Ok(())
    }
}

/// Sends each message to every inner sink. One failing sink doesn't stop the
/// others; the first error is reported after all of them ran.
#[derive(Debug, Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn LogSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn LogSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl LogSink for FanoutSink {
    fn emit(&mut self, message: &str) -> io::Result<()> {
        let mut first_err = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.emit(message) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut first_err = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.flush() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
