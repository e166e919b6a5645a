use crate::metrics::MetricsCollector;
use crate::queue::LogQueue;
use crate::sink::LogSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, trace, warn};

pub struct LoggerWorker {
    events: Arc<LogQueue>,
    sink: Box<dyn LogSink>,
    metrics: MetricsCollector,
    poll_interval: Duration,
}

impl LoggerWorker {
    pub fn new(
        events: Arc<LogQueue>,
        sink: Box<dyn LogSink>,
        metrics: MetricsCollector,
        poll_interval: Duration,
    ) -> Self {
        Self {
            events,
            sink,
            metrics,
            poll_interval,
        }
    }

    /// Emits events in queue order until the queue is closed and empty.
    pub async fn run(mut self) {
        info!("Logger worker started");
        let mut emitted = 0u64;

        loop {
            match timeout(self.poll_interval, self.events.pop()).await {
                Ok(Some(message)) => {
                    self.emit(&message);
                    emitted += 1;
                }
                Ok(None) => break,
                Err(_) => {
                    // idle, go around and look at the closed flag again
                    trace!("Logger idle for {:?}", self.poll_interval);
                }
            }
        }

        if let Err(e) = self.sink.flush() {
            warn!("Failed to flush event sink: {}", e);
        }
        info!("Logger worker stopped after {} events", emitted);
    }

    fn emit(&mut self, message: &str) {
        match self.sink.emit(message) {
            Ok(()) => self.metrics.event_emitted(),
            Err(e) => {
                warn!("Event sink failed, continuing: {}", e);
                self.metrics.sink_error();
            }
        }
    }
}
