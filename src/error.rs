use alloc::string::String;
use core::fmt;

/// The error type of this library.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// An error occurred while parsing the TOML document.
    Parse(ParseError),
    #[cfg(feature = "serde")]
    /// An error occurred while binding a parsed document to a destination
    /// type.
    ///
    /// This variant is only available when the `serde` feature is enabled.
    Bind(BindError),
    /// Type conversion error.
    Convert {
        /// The type from which the conversion was attempted.
        from: &'static str,
        /// The type to which the conversion was attempted.
        to: &'static str,
    },
    /// Invalid date and time encoding.
    Datetime,
}

#[cfg(feature = "std")]
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(p) => Some(p),
            #[cfg(feature = "serde")]
            Error::Bind(b) => Some(b),
            Error::Convert { .. } => None,
            Error::Datetime => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse(p) => write!(f, "{p}"),
            #[cfg(feature = "serde")]
            Error::Bind(b) => write!(f, "{b}"),
            Error::Convert { from, to } => write!(f, "cannot convert from {from} to {to}"),
            Error::Datetime => write!(f, "invalid date and time encoding"),
        }
    }
}

/// A positioned error produced while parsing a document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    line: usize,
    message: String,
    last_key: String,
}

impl ParseError {
    pub(crate) fn new(line: usize, message: String, last_key: String) -> Self {
        Self {
            line,
            message,
            last_key,
        }
    }

    /// The 1-based line the error was detected on.
    pub fn line(&self) -> usize {
        self.line
    }

    /// A description of what went wrong.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The most recent key being parsed when the error occurred, as a
    /// dotted string. Empty if no key had been parsed yet.
    pub fn last_key(&self) -> &str {
        &self.last_key
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.last_key.is_empty() {
            write!(f, "line {}: {}", self.line, self.message)
        } else {
            write!(
                f,
                "line {}: {} (last key parsed '{}')",
                self.line, self.message, self.last_key
            )
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseError {}

/// An error produced while binding a parsed document to a destination
/// type. Requires the `serde` feature.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, PartialEq)]
pub struct BindError {
    key: String,
    message: String,
}

#[cfg(feature = "serde")]
impl BindError {
    pub(crate) fn new(key: String, message: String) -> Self {
        Self { key, message }
    }

    /// The dotted TOML key path being bound when the error occurred.
    /// Empty when the error is not tied to a particular key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// A description of the mismatch.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn with_key(mut self, key: String) -> Self {
        if self.key.is_empty() {
            self.key = key;
        }
        self
    }
}

#[cfg(feature = "serde")]
impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.key.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{} (key '{}')", self.message, self.key)
        }
    }
}

#[cfg(all(feature = "std", feature = "serde"))]
impl std::error::Error for BindError {}

#[cfg(feature = "serde")]
impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        use alloc::string::ToString;

        Self::Bind(BindError::new(String::new(), msg.to_string()))
    }
}
