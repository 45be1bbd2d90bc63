/// Splits a byte stream into newline-terminated lines.
///
/// Chunk boundaries may fall anywhere, including inside a multi-byte UTF-8
/// sequence; the unterminated remainder is carried over to the next
/// [`push`](Self::push). Lines are returned as raw bytes so that callers can
/// reject the ones that are not valid UTF-8.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
    /// Length of the prefix of `buf` already known to hold no newline.
    scanned: usize,
}

impl LineDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds `chunk` and returns every line it completes, without the line
    /// terminator. Blank lines are skipped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);

        let last_newline = self.buf[self.scanned..]
            .iter()
            .rposition(|b| *b == b'\n')
            .map(|idx| self.scanned + idx);

        let Some(last_newline) = last_newline else {
            self.scanned = self.buf.len();
            return Vec::new();
        };

        let complete: Vec<u8> = self.buf.drain(..=last_newline).collect();
        self.scanned = self.buf.len();

        complete
            .split(|b| *b == b'\n')
            .filter_map(trim_line)
            .collect()
    }

    /// Returns whatever is left after the last newline once the input ends.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        let rest = std::mem::take(&mut self.buf);
        self.scanned = 0;
        trim_line(&rest)
    }
}

fn trim_line(bytes: &[u8]) -> Option<Vec<u8>> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    if bytes.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        Some(bytes.to_vec())
    }
}
