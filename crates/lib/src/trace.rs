//! Job trace: the output sink a build writes to.
//!
//! Every lifecycle message and all stage output goes here. The trace is cheap
//! to clone; clones share the same underlying writer. A masked trace replaces
//! secret values with [`MASKED`] before anything reaches the writer.

use std::borrow::Cow;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Replacement text for masked values.
pub const MASKED: &str = "[MASKED]";

/// Append-only output destination shared by the orchestrator and executors.
#[derive(Clone)]
pub struct Trace {
  writer: SharedWriter,
  masks: Arc<[String]>,
}

impl Trace {
  pub fn new(writer: impl Write + Send + 'static) -> Self {
    Self {
      writer: Arc::new(Mutex::new(Box::new(writer))),
      masks: Arc::from(Vec::new()),
    }
  }

  pub fn stdout() -> Self {
    Self::new(io::stdout())
  }

  /// A trace that discards everything.
  pub fn sink() -> Self {
    Self::new(io::sink())
  }

  /// A trace backed by memory, plus a handle to read what was written.
  pub fn buffer() -> (Self, TraceBuffer) {
    let buffer = TraceBuffer::default();
    (Self::new(buffer.clone()), buffer)
  }

  /// A trace on the same writer that also masks `values`.
  ///
  /// Values are matched within a single write, so callers streaming output
  /// should write whole lines.
  pub fn masked(&self, values: impl IntoIterator<Item = String>) -> Self {
    let mut masks: Vec<String> = self.masks.iter().cloned().collect();
    masks.extend(values.into_iter().filter(|v| !v.is_empty()));
    masks.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    masks.dedup();
    Self {
      writer: Arc::clone(&self.writer),
      masks: Arc::from(masks),
    }
  }

  /// Append raw bytes.
  pub fn write_bytes(&self, bytes: &[u8]) -> io::Result<()> {
    let bytes = self.mask(bytes);
    let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
    writer.write_all(&bytes)?;
    writer.flush()
  }

  fn mask<'a>(&self, bytes: &'a [u8]) -> Cow<'a, [u8]> {
    if self.masks.is_empty() {
      return Cow::Borrowed(bytes);
    }
    let text = String::from_utf8_lossy(bytes);
    if !self.masks.iter().any(|m| text.contains(m.as_str())) {
      return Cow::Borrowed(bytes);
    }
    let mut text = text.into_owned();
    for mask in self.masks.iter() {
      text = text.replace(mask.as_str(), MASKED);
    }
    Cow::Owned(text.into_bytes())
  }

  /// Append one line. Write failures are ignored: a broken sink must not turn
  /// into a job failure.
  pub fn line(&self, message: impl AsRef<str>) {
    let mut text = message.as_ref().to_string();
    text.push('\n');
    let _ = self.write_bytes(text.as_bytes());
  }
}

impl std::fmt::Debug for Trace {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Trace").finish_non_exhaustive()
  }
}

/// In-memory trace contents.
#[derive(Debug, Clone, Default)]
pub struct TraceBuffer(Arc<Mutex<Vec<u8>>>);

impl TraceBuffer {
  pub fn contents(&self) -> String {
    let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
    String::from_utf8_lossy(&bytes).into_owned()
  }
}

impl Write for TraceBuffer {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.0.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}
