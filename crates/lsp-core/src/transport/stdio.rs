//! Content-Length framed transport over any `Read`/`Write` pair, normally
//! process stdin/stdout.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::transport::{Frame, Transport};

struct MessageHeader {
    content_length: usize,
}

/// Duplicates reads and writes into a journal file, in the exact format
/// the replay harness (`transport::replay`) parses back. Grounded in
/// `lsp::journal_writer`.
struct JournalWriter {
    file: std::fs::File,
}

impl JournalWriter {
    fn create(path: &Path) -> std::io::Result<Self> {
        use std::io::Write as _;
        let mut file = std::fs::File::create(path)?;
        writeln!(file, "\n# TEST: <fill in the blanks>\n")?;
        Ok(JournalWriter { file })
    }

    fn dump_read(&mut self, text: &str) {
        let _ = writeln!(self.file, "{text}\n\n---\n");
    }

    fn dump_write(&mut self, text: &str) {
        let _ = writeln!(self.file, "# MATCH: {text}\n\n---\n");
    }
}

impl Drop for JournalWriter {
    fn drop(&mut self) {
        let _ = writeln!(self.file, "# EXIT: 0");
    }
}

/// A length-prefixed framed transport backed by an arbitrary byte stream.
pub struct StdioTransport<R, W> {
    reader: Mutex<BufReader<R>>,
    writer: Mutex<W>,
    good: AtomicBool,
    journal: Mutex<Option<JournalWriter>>,
}

impl<R: Read + Send, W: Write + Send> StdioTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        StdioTransport {
            reader: Mutex::new(BufReader::new(reader)),
            writer: Mutex::new(writer),
            good: AtomicBool::new(true),
            journal: Mutex::new(None),
        }
    }

    fn mark_bad(&self) {
        self.good.store(false, Ordering::SeqCst);
    }

    /// Parses header lines terminated by `\n` (tolerant of a preceding
    /// `\r`), collecting `Content-Length`, until a blank line. EOF or a read
    /// error marks the transport permanently bad.
    fn read_message_header(&self, reader: &mut BufReader<R>) -> Option<MessageHeader> {
        const PREFIX: &str = "Content-Length: ";
        let mut content_length = 0usize;
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = match reader.read_line(&mut line) {
                Ok(n) => n,
                Err(_) => {
                    self.mark_bad();
                    return None;
                }
            };
            if bytes_read == 0 {
                self.mark_bad();
                return None;
            }
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.is_empty() {
                return Some(MessageHeader { content_length });
            }
            if let Some(value) = trimmed.strip_prefix(PREFIX) {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }
}

impl<R: Read + Send, W: Write + Send> Transport for StdioTransport<R, W> {
    fn read(&self) -> Option<Frame> {
        if !self.good() {
            return None;
        }
        let mut reader = self.reader.lock().unwrap();
        let header = self.read_message_header(&mut reader)?;
        if header.content_length == 0 {
            return None;
        }

        let mut buf = vec![0u8; header.content_length];
        if reader.read_exact(&mut buf).is_err() {
            self.mark_bad();
            return None;
        }
        let text = String::from_utf8_lossy(&buf).into_owned();

        if let Some(journal) = self.journal.lock().unwrap().as_mut() {
            journal.dump_read(&text);
        }

        Some(text)
    }

    fn write(&self, frame: &Frame) {
        if !self.good() {
            return;
        }
        let mut writer = self.writer.lock().unwrap();

        if let Some(journal) = self.journal.lock().unwrap().as_mut() {
            journal.dump_write(frame);
        }

        // Receive-side parsing tolerates a bare "\n\n" (a documented quirk
        // on some hosts); send-side standardizes on CRLF CRLF.
        let header = format!("Content-Length: {}\r\n\r\n", frame.len());
        if writer.write_all(header.as_bytes()).is_err()
            || writer.write_all(frame.as_bytes()).is_err()
            || writer.flush().is_err()
        {
            self.mark_bad();
        }
    }

    fn good(&self) -> bool {
        self.good.load(Ordering::SeqCst)
    }

    fn tee(&self, path: &Path) -> bool {
        match JournalWriter::create(path) {
            Ok(journal) => {
                *self.journal.lock().unwrap() = Some(journal);
                true
            }
            Err(_) => false,
        }
    }
}

/// Convenience constructor wiring process stdin/stdout.
pub fn process_stdio() -> StdioTransport<std::io::Stdin, std::io::Stdout> {
    StdioTransport::new(std::io::stdin(), std::io::stdout())
}
