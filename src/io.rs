//! Byte-oriented host I/O handles, so tests can swap in an in-memory buffer.

use std::io::{self, BufRead, Write};

pub trait OutputSink {
    fn print(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn print_line(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.print(bytes)?;
        self.print(b"\n")
    }
}

pub trait InputSource {
    /// Reads one line, without the trailing newline. Returns an empty
    /// vector at end of input.
    fn read_line(&mut self) -> io::Result<Vec<u8>>;
}

impl<W: Write> OutputSink for W {
    fn print(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)
    }
}

impl<R: BufRead> InputSource for R {
    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut line = String::new();
        let n = BufRead::read_line(self, &mut line)?;
        if n == 0 {
            return Ok(Vec::new());
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(line.into_bytes())
    }
}
