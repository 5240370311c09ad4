//! Bounded diagnostic buffer shared across the isolation boundary.

/// Default capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 1024;
/// Smallest accepted capacity.
pub const MIN_CAPACITY: usize = 64;
/// Largest accepted capacity.
pub const MAX_CAPACITY: usize = 8192;

/// Single-writer, single-reader diagnostic message buffer.
///
/// The running test writes at most once; later writes are ignored. Messages
/// longer than the capacity are truncated on a UTF-8 character boundary.
#[derive(Debug, Clone)]
pub struct DiagnosticChannel {
    capacity: usize,
    message: String,
    written: bool,
}

impl DiagnosticChannel {
    /// Create a channel, clamping `capacity` to the accepted range.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(MIN_CAPACITY, MAX_CAPACITY);
        Self {
            capacity,
            message: String::with_capacity(capacity),
            written: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Write the diagnostic. Returns false if a message was already written.
    pub fn write(&mut self, message: &str) -> bool {
        if self.written {
            return false;
        }
        let end = floor_char_boundary(message, self.capacity);
        self.message.push_str(&message[..end]);
        self.written = true;
        true
    }

    /// Accept raw bytes read back from the isolated side.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; empty input leaves the
    /// channel unwritten.
    pub fn receive(&mut self, bytes: &[u8]) -> bool {
        if bytes.is_empty() {
            return false;
        }
        let text = String::from_utf8_lossy(bytes);
        self.write(&text)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.message.as_bytes()
    }

    pub fn is_written(&self) -> bool {
        self.written
    }

    /// Take the message, leaving the channel empty and writable again.
    pub fn take(&mut self) -> String {
        self.written = false;
        std::mem::take(&mut self.message)
    }
}

impl Default for DiagnosticChannel {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}
