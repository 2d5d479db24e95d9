//! Shared types used across Hearth crates.
//!
//! [`EnvKey`] and [`EnvValue`] are the key and value types exchanged with an
//! application through the environment mapping. The two gateway slots that
//! hold live objects rather than text (`wsgi.errors` and `wsgi.input`) are
//! carried as trait-object handles so the environment stays agnostic of how
//! the gateway implements them.

use std::borrow::Borrow;
use std::fmt;
use std::io;
use std::sync::Arc;

/// An environment key.
///
/// Keys compare and hash by content, so two independently built keys with the
/// same text are the same key. Cloning is a refcount bump.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnvKey(Arc<str>);

impl EnvKey {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EnvKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for EnvKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EnvKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EnvKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EnvKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EnvKey {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

/// Sink behind the `wsgi.errors` slot.
pub trait ErrorSink: Send + Sync + fmt::Debug {
    fn write(&self, msg: &str);

    fn writelines(&self, lines: &[&str]) {
        for line in lines {
            self.write(line);
        }
    }

    fn flush(&self) {}
}

/// Source behind the `wsgi.input` slot.
///
/// Methods take `&self`; implementations synchronize internally so a single
/// handle can be shared through the environment.
pub trait InputSource: Send + Sync + fmt::Debug {
    /// Read up to `size` bytes, or everything remaining when `size` is `None`.
    /// An empty result means end of input.
    fn read(&self, size: Option<usize>) -> io::Result<Vec<u8>>;

    /// Read one line including its terminator, capped at `size` bytes.
    fn readline(&self, size: Option<usize>) -> io::Result<Vec<u8>>;

    /// Read all remaining lines.
    fn readlines(&self) -> io::Result<Vec<Vec<u8>>> {
        let mut lines = Vec::new();
        loop {
            let line = self.readline(None)?;
            if line.is_empty() {
                return Ok(lines);
            }
            lines.push(line);
        }
    }
}

pub type ErrorsHandle = Arc<dyn ErrorSink>;
pub type InputHandle = Arc<dyn InputSource>;

/// An error sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullErrors;

impl ErrorSink for NullErrors {
    fn write(&self, _msg: &str) {}
}

/// An input source with no content.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyInput;

impl InputSource for EmptyInput {
    fn read(&self, _size: Option<usize>) -> io::Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn readline(&self, _size: Option<usize>) -> io::Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

/// A value stored in the environment.
///
/// Everything derived from request text is a [`EnvValue::Str`]. The remaining
/// variants back the fixed gateway slots. [`EnvValue::None`] is an explicit
/// "no value" marker an application may store; it is distinct from a key
/// being absent.
#[derive(Clone, Debug)]
pub enum EnvValue {
    Str(String),
    Version(u32, u32),
    Bool(bool),
    Errors(ErrorsHandle),
    Input(InputHandle),
    None,
}

impl EnvValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            EnvValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            EnvValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, EnvValue::None)
    }

    /// Short type label, used when rendering environments.
    pub fn kind(&self) -> &'static str {
        match self {
            EnvValue::Str(_) => "str",
            EnvValue::Version(..) => "version",
            EnvValue::Bool(_) => "bool",
            EnvValue::Errors(_) => "errors",
            EnvValue::Input(_) => "input",
            EnvValue::None => "none",
        }
    }
}

impl PartialEq for EnvValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EnvValue::Str(a), EnvValue::Str(b)) => a == b,
            (EnvValue::Version(a1, a2), EnvValue::Version(b1, b2)) => a1 == b1 && a2 == b2,
            (EnvValue::Bool(a), EnvValue::Bool(b)) => a == b,
            (EnvValue::Errors(a), EnvValue::Errors(b)) => Arc::ptr_eq(a, b),
            (EnvValue::Input(a), EnvValue::Input(b)) => Arc::ptr_eq(a, b),
            (EnvValue::None, EnvValue::None) => true,
            _ => false,
        }
    }
}

impl fmt::Display for EnvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvValue::Str(s) => f.write_str(s),
            EnvValue::Version(major, minor) => write!(f, "({major}, {minor})"),
            EnvValue::Bool(b) => write!(f, "{b}"),
            EnvValue::Errors(_) => f.write_str("<errors>"),
            EnvValue::Input(_) => f.write_str("<input>"),
            EnvValue::None => f.write_str("None"),
        }
    }
}

impl From<&str> for EnvValue {
    fn from(s: &str) -> Self {
        EnvValue::Str(s.to_string())
    }
}

impl From<String> for EnvValue {
    fn from(s: String) -> Self {
        EnvValue::Str(s)
    }
}

impl From<bool> for EnvValue {
    fn from(b: bool) -> Self {
        EnvValue::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn keys_compare_by_content() {
        let a = EnvKey::new(String::from("REQUEST_METHOD"));
        let b = EnvKey::from("REQUEST_METHOD");
        assert_eq!(a, b);

        let mut map = HashMap::new();
        map.insert(a, 1);
        assert_eq!(map.get(&b), Some(&1));
        assert_eq!(map.get("REQUEST_METHOD"), Some(&1));
    }

    #[test]
    fn key_display_and_debug() {
        let key = EnvKey::from("HTTP_HOST");
        assert_eq!(key.to_string(), "HTTP_HOST");
        assert_eq!(format!("{key:?}"), "\"HTTP_HOST\"");
    }

    #[test]
    fn handle_values_compare_by_identity() {
        let sink: ErrorsHandle = Arc::new(NullErrors);
        let same = EnvValue::Errors(sink.clone());
        let other = EnvValue::Errors(Arc::new(NullErrors));

        assert_eq!(EnvValue::Errors(sink), same);
        assert_ne!(same, other);
    }

    #[test]
    fn none_is_not_empty_string() {
        assert_ne!(EnvValue::None, EnvValue::from(""));
        assert!(EnvValue::None.is_none());
        assert_eq!(EnvValue::from("").as_str(), Some(""));
    }

    #[test]
    fn value_display() {
        assert_eq!(EnvValue::Version(1, 0).to_string(), "(1, 0)");
        assert_eq!(EnvValue::Bool(true).to_string(), "true");
        assert_eq!(EnvValue::from("GET").to_string(), "GET");
    }

    #[test]
    fn empty_input_reads_nothing() {
        let input = EmptyInput;
        assert!(input.read(None).unwrap().is_empty());
        assert!(input.readlines().unwrap().is_empty());
    }

    #[test]
    fn default_writelines_forwards_each_line() {
        #[derive(Debug, Default)]
        struct Collect(std::sync::Mutex<Vec<String>>);

        impl ErrorSink for Collect {
            fn write(&self, msg: &str) {
                self.0.lock().unwrap().push(msg.to_string());
            }
        }

        let sink = Collect::default();
        sink.writelines(&["a", "b"]);
        assert_eq!(*sink.0.lock().unwrap(), vec!["a", "b"]);
    }
}
