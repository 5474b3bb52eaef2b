use crate::error::{Error, ErrorKind, Result};
use crate::token::Token;

/// The record terminator written between records.
///
/// Reading-side leniency is not a concern here: the writer emits exactly the
/// configured sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Newline {
    /// `\r\n`, the conventional CSV terminator.
    #[default]
    CrLf,
    /// A single `\n`.
    Lf,
}

impl Newline {
    /// Number of tokens in the terminator sequence.
    #[inline(always)]
    pub fn len(&self) -> usize {
        match self {
            Newline::CrLf => 2,
            Newline::Lf => 1,
        }
    }

    #[inline(always)]
    pub fn is_crlf(&self) -> bool {
        matches!(self, Newline::CrLf)
    }
}

// delimiter + quote + escape + CR + LF
const MAX_MUST_QUOTE: usize = 5;

/// The set of tokens defining one CSV wire format variant.
///
/// Created once per writer session and immutable thereafter. Constructing a
/// dialect validates that the delimiter, quote, escape and newline tokens are
/// pairwise distinct.
#[derive(Debug, Clone, Copy)]
pub struct Dialect<T> {
    delimiter: T,
    quote: Option<T>,
    escape: Option<T>,
    newline: Newline,
    must_quote: [T; MAX_MUST_QUOTE],
    must_quote_len: usize,
}

impl<T: Token> Dialect<T> {
    pub fn new(
        delimiter: T,
        quote: Option<T>,
        escape: Option<T>,
        newline: Newline,
    ) -> Result<Self> {
        let mut seen: [(T, &'static str); MAX_MUST_QUOTE] = [(T::default(), ""); MAX_MUST_QUOTE];
        let mut seen_len: usize = 0;

        let mut check = |token: T, role: &'static str| -> Result<()> {
            for &(other, other_role) in &seen[..seen_len] {
                if other == token {
                    return Err(Error::new(ErrorKind::Dialect {
                        first: other_role,
                        second: role,
                    }));
                }
            }

            seen[seen_len] = (token, role);
            seen_len += 1;

            Ok(())
        };

        check(delimiter, "delimiter")?;

        if let Some(quote) = quote {
            check(quote, "quote")?;
        }

        if let Some(escape) = escape {
            check(escape, "escape")?;
        }

        check(T::from_char('\n'), "newline")?;

        if newline.is_crlf() {
            check(T::from_char('\r'), "newline")?;
        }

        Ok(Self::new_unchecked(delimiter, quote, escape, newline))
    }

    /// Skips token validation. Only for tokens known to be distinct.
    pub(crate) fn new_unchecked(
        delimiter: T,
        quote: Option<T>,
        escape: Option<T>,
        newline: Newline,
    ) -> Self {
        let mut must_quote = [T::default(); MAX_MUST_QUOTE];
        let mut len: usize = 0;

        must_quote[len] = delimiter;
        len += 1;
        must_quote[len] = T::from_char('\n');
        len += 1;

        if newline.is_crlf() {
            must_quote[len] = T::from_char('\r');
            len += 1;
        }

        if let Some(quote) = quote {
            must_quote[len] = quote;
            len += 1;
        }

        if let Some(escape) = escape {
            must_quote[len] = escape;
            len += 1;
        }

        Self {
            delimiter,
            quote,
            escape,
            newline,
            must_quote,
            must_quote_len: len,
        }
    }

    #[inline(always)]
    pub fn delimiter(&self) -> T {
        self.delimiter
    }

    #[inline(always)]
    pub fn quote(&self) -> Option<T> {
        self.quote
    }

    #[inline(always)]
    pub fn escape(&self) -> Option<T> {
        self.escape
    }

    #[inline(always)]
    pub fn newline(&self) -> Newline {
        self.newline
    }

    /// Index of the first token forcing the field to be quoted: the
    /// delimiter, the quote or escape characters, or any newline token.
    #[inline]
    pub(crate) fn find_must_quote(&self, field: &[T]) -> Option<usize> {
        T::find_any(field, &self.must_quote[..self.must_quote_len])
    }
}

impl Dialect<u8> {
    /// The conventional dialect: comma-delimited, double-quote quoted,
    /// quotes escaped by doubling, CRLF terminators.
    pub fn standard() -> Self {
        Self::new_unchecked(b',', Some(b'"'), None, Newline::CrLf)
    }
}
