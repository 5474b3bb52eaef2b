use std::{error, fmt, io, result};

/// The specific type of an error.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Wrap a [std::io::Error].
    Io(io::Error),

    /// Indicate that two dialect tokens collide (e.g. the delimiter equals
    /// the quote character).
    Dialect {
        /// Role of the first colliding token
        first: &'static str,
        /// Role of the second colliding token
        second: &'static str,
    },

    /// Indicate that a field converter reported more tokens written than the
    /// destination region could hold. This is a contract violation on the
    /// converter's side and is never retried.
    Converter {
        /// Number of tokens the converter claimed to have written
        written: usize,
        /// Length of the region it was given
        capacity: usize,
    },

    /// Indicate that growing the output buffer stopped making progress while
    /// a larger writable region was still required.
    GrowthStalled {
        /// Capacity the buffer was stuck at
        capacity: usize,
    },

    /// Indicate that the writer's cancellation token was signalled before a
    /// flush, grow or completion could run.
    Cancelled,

    /// Wrap an error raised by the final flush performed when completing
    /// a writer.
    Complete(Box<Error>),
}

/// An error occurring when writing CSV data.
#[derive(Debug)]
pub struct Error(ErrorKind);

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self(kind)
    }

    pub(crate) fn cancelled() -> Self {
        Self(ErrorKind::Cancelled)
    }

    pub(crate) fn on_complete(err: Error) -> Self {
        Self(ErrorKind::Complete(Box::new(err)))
    }

    /// Return whether the wrapped error is a [`std::io::Error`].
    pub fn is_io_error(&self) -> bool {
        matches!(self.0, ErrorKind::Io(_))
    }

    /// Return whether the error was caused by a signalled
    /// [`CancelToken`](crate::CancelToken).
    pub fn is_cancelled(&self) -> bool {
        matches!(self.0, ErrorKind::Cancelled)
    }

    /// Return a reference to the underlying [`ErrorKind`].
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Unwraps the error into its underlying [`ErrorKind`].
    pub fn into_kind(self) -> ErrorKind {
        self.0
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self(ErrorKind::Io(err))
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        Self::new(io::ErrorKind::Other, err)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.0 {
            ErrorKind::Io(err) => Some(err),
            ErrorKind::Complete(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.0 {
            ErrorKind::Io(err) => err.fmt(f),
            ErrorKind::Dialect { first, second } => {
                write!(f, "CSV dialect error: {} and {} use the same token", first, second)
            }
            ErrorKind::Converter { written, capacity } => write!(
                f,
                "CSV write error: converter reported {} tokens written to a region of length {}",
                written, capacity
            ),
            ErrorKind::GrowthStalled { capacity } => write!(
                f,
                "CSV write error: output buffer stopped growing at {} tokens",
                capacity
            ),
            ErrorKind::Cancelled => write!(f, "CSV write error: operation was cancelled"),
            ErrorKind::Complete(err) => {
                write!(f, "CSV write error during final flush: {}", err)
            }
        }
    }
}

/// A type alias for `Result<T, csv_scribe::Error>`.
pub type Result<T> = result::Result<T, Error>;
