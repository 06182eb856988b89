// src/supervisor/lines.rs

/// Accumulates raw pipe output and hands out complete lines only.
///
/// A trailing partial line stays buffered until its newline arrives or the
/// stream ends and [`LineBuffer::flush`] is called.
#[derive(Debug, Default, Clone)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Remove and return every complete line, without its `\n` / `\r\n`.
    pub fn drain_lines(&mut self) -> Vec<String> {
        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        complete[..complete.len() - 1]
            .split(|&b| b == b'\n')
            .map(decode_line)
            .collect()
    }

    /// Return whatever partial line is left, e.g. once the stream hit EOF.
    pub fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(decode_line(&rest))
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_line_waits_for_newline() {
        let mut buf = LineBuffer::new();
        buf.push(b"Creating octree");
        assert!(buf.drain_lines().is_empty());

        buf.push(b" ...\nRefining");
        assert_eq!(buf.drain_lines(), vec!["Creating octree ...".to_string()]);
        assert_eq!(buf.flush().as_deref(), Some("Refining"));
        assert_eq!(buf.flush(), None);
    }

    #[test]
    fn crlf_and_empty_lines() {
        let mut buf = LineBuffer::new();
        buf.push(b"a\r\n\nb\n");
        assert_eq!(buf.drain_lines(), vec!["a", "", "b"]);
    }

    #[test]
    fn draining_twice_yields_nothing_new() {
        let mut buf = LineBuffer::new();
        buf.push(b"one\ntwo\n");
        assert_eq!(buf.drain_lines().len(), 2);
        assert!(buf.drain_lines().is_empty());
        assert_eq!(buf.flush(), None);
    }

    #[test]
    fn invalid_utf8_is_replaced_not_dropped() {
        let mut buf = LineBuffer::new();
        buf.push(&[0x66, 0xff, 0x6f, b'\n']);
        assert_eq!(buf.drain_lines(), vec!["f\u{fffd}o".to_string()]);
    }
}
