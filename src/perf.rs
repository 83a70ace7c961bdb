use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::debug::json_escape;

/// Timing spans as line-delimited JSON. Totals per span name are appended as
/// `perf.total` records when the logger is flushed.
#[derive(Clone)]
pub(crate) struct PerfLogger {
    inner: Arc<Mutex<PerfState>>,
}

struct PerfState {
    writer: Box<dyn Write + Send>,
    totals: HashMap<String, (f64, u64)>,
}

impl PerfLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PerfState {
                writer: Box::new(writer),
                totals: HashMap::new(),
            })),
        }
    }

    pub fn log_span_ms(&self, name: &str, page: Option<usize>, ms: f64) {
        let page = page
            .map(|v| v.to_string())
            .unwrap_or_else(|| "null".to_string());
        let json = format!(
            "{{\"type\":\"perf.span\",\"name\":\"{}\",\"page\":{},\"ms\":{:.3}}}",
            json_escape(name),
            page,
            ms
        );
        if let Ok(mut state) = self.inner.lock() {
            let entry = state.totals.entry(name.to_string()).or_insert((0.0, 0));
            entry.0 += ms;
            entry.1 = entry.1.saturating_add(1);
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let mut totals: Vec<(String, (f64, u64))> = state.totals.drain().collect();
            totals.sort_by(|a, b| b.1.0.partial_cmp(&a.1.0).unwrap_or(std::cmp::Ordering::Equal));
            for (name, (ms, count)) in totals {
                let _ = writeln!(
                    state.writer,
                    "{{\"type\":\"perf.total\",\"name\":\"{}\",\"ms\":{:.3},\"count\":{}}}",
                    json_escape(&name),
                    ms,
                    count
                );
            }
            let _ = state.writer.flush();
        }
    }
}

/// Measures from construction until [`SpanTimer::finish`].
pub(crate) struct SpanTimer {
    started: Instant,
}

impl SpanTimer {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Elapsed milliseconds, also logged when a logger is present.
    pub fn finish(self, perf: Option<&PerfLogger>, name: &str, page: Option<usize>) -> f64 {
        let ms = self.started.elapsed().as_secs_f64() * 1000.0;
        if let Some(perf) = perf {
            perf.log_span_ms(name, page, ms);
        }
        ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::tests::SharedBuffer;

    #[test]
    fn spans_and_totals_are_recorded() {
        let buffer = SharedBuffer::default();
        let perf = PerfLogger::from_writer(buffer.clone());
        perf.log_span_ms("page.encode", Some(0), 1.5);
        perf.log_span_ms("page.encode", Some(1), 2.5);
        perf.log_span_ms("pack.sizing", None, 0.25);
        perf.flush();
        let text = buffer.text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "{\"type\":\"perf.span\",\"name\":\"page.encode\",\"page\":0,\"ms\":1.500}"
        );
        assert_eq!(
            lines[2],
            "{\"type\":\"perf.span\",\"name\":\"pack.sizing\",\"page\":null,\"ms\":0.250}"
        );
        assert_eq!(
            lines[3],
            "{\"type\":\"perf.total\",\"name\":\"page.encode\",\"ms\":4.000,\"count\":2}"
        );
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn span_timer_reports_without_logger() {
        let ms = SpanTimer::start().finish(None, "noop", None);
        assert!(ms >= 0.0);
    }
}
