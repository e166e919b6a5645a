use super::MetricsSnapshot;
use anyhow::{Context, Result};
use csv::Writer;
use std::io::Write;
use std::path::Path;

/// Writes per-interval population statistics as CSV.
pub struct StatsWriter<W: Write> {
    writer: Writer<W>,
}

impl StatsWriter<std::fs::File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let writer = Writer::from_path(path)
            .with_context(|| format!("cannot create stats file {}", path.display()))?;
        Ok(Self { writer })
    }
}

impl<W: Write> StatsWriter<W> {
    pub fn from_writer(inner: W) -> Self {
        Self {
            writer: Writer::from_writer(inner),
        }
    }

    pub fn write_all(&mut self, snapshots: &[MetricsSnapshot]) -> Result<()> {
        for snapshot in snapshots {
            self.writer.serialize(snapshot)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("flushing stats writer: {}", e.error()))
    }
}
