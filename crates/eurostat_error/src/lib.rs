use std::error::Error;
use std::fmt;

pub type Result<T, E = EurostatError> = std::result::Result<T, E>;

/// Broad classification of an error.
///
/// Unsupported predicates are not errors and have no kind here, the encoder
/// reports them as a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad caller input (empty or unknown provider/dataset, unknown column).
    /// Raised before any network activity.
    InvalidInput,
    /// Connection, timeout, or protocol failure while talking to the API.
    Transport,
    /// The API answered with a non-200 status or a structured fault.
    Upstream,
    /// A response body couldn't be tokenized or decoded.
    Format,
    /// Everything else.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidInput => "Invalid input",
            Self::Transport => "Transport error",
            Self::Upstream => "Upstream error",
            Self::Format => "Format error",
            Self::Internal => "Internal error",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug)]
pub struct EurostatError {
    inner: Box<EurostatErrorInner>,
}

#[derive(Debug)]
struct EurostatErrorInner {
    kind: ErrorKind,
    msg: String,
    /// Extra key/value context, printed after the message.
    fields: Vec<(String, String)>,
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl EurostatError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Internal, msg)
    }

    pub fn with_kind(kind: ErrorKind, msg: impl Into<String>) -> Self {
        EurostatError {
            inner: Box::new(EurostatErrorInner {
                kind,
                msg: msg.into(),
                fields: Vec::new(),
                source: None,
            }),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::InvalidInput, msg)
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Transport, msg)
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Upstream, msg)
    }

    pub fn format(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Format, msg)
    }

    pub fn with_source(msg: impl Into<String>, source: Box<dyn Error + Send + Sync>) -> Self {
        let mut err = Self::new(msg);
        err.inner.source = Some(source);
        err
    }

    /// Attach a key/value pair for additional context.
    pub fn with_field(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.inner.fields.push((key.into(), value.to_string()));
        self
    }

    /// Override the kind of this error.
    pub fn set_kind(mut self, kind: ErrorKind) -> Self {
        self.inner.kind = kind;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.inner.kind
    }

    pub fn get_msg(&self) -> &str {
        &self.inner.msg
    }

    /// Get the value of a field if it was set.
    pub fn get_field(&self, key: &str) -> Option<&str> {
        self.inner
            .fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for EurostatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.inner.kind, self.inner.msg)?;

        if !self.inner.fields.is_empty() {
            write!(f, " (")?;
            for (idx, (key, value)) in self.inner.fields.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}: {value}")?;
            }
            write!(f, ")")?;
        }

        if let Some(source) = &self.inner.source {
            write!(f, "\nError source: {source}")?;
        }

        Ok(())
    }
}

impl Error for EurostatError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<std::fmt::Error> for EurostatError {
    fn from(value: std::fmt::Error) -> Self {
        EurostatError::with_source("Format error", Box::new(value))
    }
}

impl From<std::io::Error> for EurostatError {
    fn from(value: std::io::Error) -> Self {
        EurostatError::with_source("IO error", Box::new(value))
    }
}

/// An extension trait for adding context to errors returned from other crates.
pub trait ResultExt<T, E> {
    /// Wrap an error with a static context string.
    fn context(self, msg: &'static str) -> Result<T>;

    /// Wrap an error with a context string generated from a function.
    fn context_fn<F>(self, f: F) -> Result<T>
    where
        F: Fn() -> String;
}

impl<T, E: Error + Send + Sync + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn context(self, msg: &'static str) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(EurostatError::with_source(msg, Box::new(e))),
        }
    }

    fn context_fn<F>(self, f: F) -> Result<T>
    where
        F: Fn() -> String,
    {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(EurostatError::with_source(f(), Box::new(e))),
        }
    }
}

pub trait OptionExt<T> {
    /// Return an error if the option is None.
    fn required(self, msg: &'static str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required(self, msg: &'static str) -> Result<T> {
        match self {
            Some(v) => Ok(v),
            None => Err(EurostatError::new(format!("Missing required value: {msg}"))),
        }
    }
}
