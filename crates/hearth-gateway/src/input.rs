//! The `wsgi.input` adapter.

use std::fmt;
use std::io::{self, BufRead, BufReader, Read};

use hearth_core::InputSource;
use parking_lot::Mutex;

/// Request body exposed to an application.
///
/// Wraps any reader; reads are serialized through an internal lock so one
/// handle can sit in a shared environment.
pub struct InputStream<R> {
    reader: Mutex<BufReader<R>>,
}

impl<R: Read> InputStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(BufReader::new(reader)),
        }
    }
}

impl<R> fmt::Debug for InputStream<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputStream").finish_non_exhaustive()
    }
}

impl<R: Read + Send> InputSource for InputStream<R> {
    fn read(&self, size: Option<usize>) -> io::Result<Vec<u8>> {
        let mut reader = self.reader.lock();
        let mut buf = Vec::new();
        match size {
            None => {
                reader.read_to_end(&mut buf)?;
            }
            Some(size) => {
                (&mut *reader).take(size as u64).read_to_end(&mut buf)?;
            }
        }
        Ok(buf)
    }

    fn readline(&self, size: Option<usize>) -> io::Result<Vec<u8>> {
        let mut reader = self.reader.lock();
        let mut line = Vec::new();
        match size {
            None => {
                reader.read_until(b'\n', &mut line)?;
            }
            Some(size) => {
                (&mut *reader).take(size as u64).read_until(b'\n', &mut line)?;
            }
        }
        Ok(line)
    }
}

/// Iterate the remaining lines of an input source.
///
/// Ends at the first empty read. A read error is yielded once and ends the
/// iteration.
pub fn lines(input: &dyn InputSource) -> Lines<'_> {
    Lines { input, done: false }
}

pub struct Lines<'a> {
    input: &'a dyn InputSource,
    done: bool,
}

impl Iterator for Lines<'_> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.input.readline(None) {
            Ok(line) if line.is_empty() => {
                self.done = true;
                None
            }
            Ok(line) => Some(Ok(line)),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
