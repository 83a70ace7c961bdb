use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Value of one field in a trace record.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TraceValue<'a> {
    Str(&'a str),
    Int(i64),
}

impl From<usize> for TraceValue<'_> {
    fn from(value: usize) -> Self {
        TraceValue::Int(value as i64)
    }
}

impl From<i64> for TraceValue<'_> {
    fn from(value: i64) -> Self {
        TraceValue::Int(value)
    }
}

impl<'a> From<&'a str> for TraceValue<'a> {
    fn from(value: &'a str) -> Self {
        TraceValue::Str(value)
    }
}

/// Line-delimited JSON trace of layout events, plus named counters that are
/// written out as one `debug.summary` record per run.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    inner: Arc<Mutex<DebugState>>,
}

struct DebugState {
    writer: Box<dyn Write + Send>,
    counters: BTreeMap<String, u64>,
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DebugState {
                writer: Box::new(writer),
                counters: BTreeMap::new(),
            })),
        }
    }

    pub fn event(&self, kind: &str, fields: &[(&str, TraceValue<'_>)]) {
        let line = render_record(kind, fields);
        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{line}");
        }
    }

    pub fn increment(&self, key: &str, amount: u64) {
        if let Ok(mut state) = self.inner.lock() {
            let entry = state.counters.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    /// Writes and resets the counters.
    pub fn emit_summary(&self, context: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let counters = std::mem::take(&mut state.counters);
            let mut counts = String::from("{");
            for (idx, (key, value)) in counters.iter().enumerate() {
                if idx > 0 {
                    counts.push(',');
                }
                counts.push_str(&format!("\"{}\":{}", json_escape(key), value));
            }
            counts.push('}');
            let _ = writeln!(
                state.writer,
                "{{\"type\":\"debug.summary\",\"context\":\"{}\",\"counts\":{}}}",
                json_escape(context),
                counts
            );
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

fn render_record(kind: &str, fields: &[(&str, TraceValue<'_>)]) -> String {
    let mut out = format!("{{\"type\":\"{}\"", json_escape(kind));
    for (key, value) in fields {
        match value {
            TraceValue::Str(text) => {
                out.push_str(&format!(",\"{}\":\"{}\"", json_escape(key), json_escape(text)))
            }
            TraceValue::Int(number) => {
                out.push_str(&format!(",\"{}\":{}", json_escape(key), number))
            }
        }
    }
    out.push('}');
    out
}

pub(crate) fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}
