use crate::dialect::Dialect;
use crate::escape::Escaper;
use crate::token::Token;

/// Outcome of a quoting decision over one formatted field.
///
/// `specials` is the exact number of quote/escape tokens in the region that
/// will be wrapped. It drives destination sizing: undercounting would
/// overflow the destination buffer, so the counting scans below always cover
/// every escapable token of the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quoting {
    pub required: bool,
    pub specials: usize,
}

impl Quoting {
    pub(crate) const NONE: Quoting = Quoting {
        required: false,
        specials: 0,
    };
}

/// When fields are wrapped in quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteMode {
    /// Never quote. The caller vouches for the field content.
    Never,
    /// Quote only fields containing the delimiter, the quote or escape
    /// characters, or a newline token.
    #[default]
    Auto,
    /// Quote every field.
    Always,
}

/// The quoting policy of a writer session: a [`QuoteMode`] plus the
/// composite triggers for empty fields and leading/trailing spaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldQuoting {
    mode: QuoteMode,
    empty: bool,
    leading_space: bool,
    trailing_space: bool,
}

impl FieldQuoting {
    pub fn never() -> Self {
        Self {
            mode: QuoteMode::Never,
            ..Self::default()
        }
    }

    pub fn auto() -> Self {
        Self::default()
    }

    pub fn always() -> Self {
        Self {
            mode: QuoteMode::Always,
            ..Self::default()
        }
    }

    /// Also quote empty fields, so they are distinguishable from absent
    /// values when read back.
    pub fn quote_empty(mut self, yes: bool) -> Self {
        self.empty = yes;
        self
    }

    /// Also quote fields starting with a space.
    pub fn quote_leading_space(mut self, yes: bool) -> Self {
        self.leading_space = yes;
        self
    }

    /// Also quote fields ending with a space.
    pub fn quote_trailing_space(mut self, yes: bool) -> Self {
        self.trailing_space = yes;
        self
    }

    #[inline(always)]
    pub fn mode(&self) -> QuoteMode {
        self.mode
    }

    #[inline(always)]
    pub(crate) fn quotes_empty(&self) -> bool {
        matches!(self.mode, QuoteMode::Always) || self.empty
    }

    #[inline]
    pub(crate) fn space_triggered<T: Token>(&self, field: &[T]) -> bool {
        if !self.leading_space && !self.trailing_space {
            return false;
        }

        let space = T::from_char(' ');

        (self.leading_space && field.first() == Some(&space))
            || (self.trailing_space && field.last() == Some(&space))
    }

    /// Decides whether `field` must be wrapped in quotes and counts the
    /// escapable tokens of the wrapped region.
    ///
    /// In `Auto` mode the count starts at the first token forcing the quote:
    /// since the quote and escape tokens are themselves part of the
    /// must-quote set, no escapable token can precede it, and the count
    /// stays exact while only scanning the field once.
    pub fn decide<T: Token, E: Escaper<T>>(
        &self,
        field: &[T],
        dialect: &Dialect<T>,
        escaper: &E,
    ) -> Quoting {
        match self.mode {
            QuoteMode::Never => Quoting::NONE,
            QuoteMode::Always => Quoting {
                required: true,
                specials: escaper.count_special(field),
            },
            QuoteMode::Auto => {
                if field.is_empty() {
                    return Quoting {
                        required: self.empty,
                        specials: 0,
                    };
                }

                match dialect.find_must_quote(field) {
                    Some(index) => Quoting {
                        required: true,
                        specials: escaper.count_special(&field[index..]),
                    },
                    None => Quoting {
                        required: self.space_triggered(field),
                        specials: 0,
                    },
                }
            }
        }
    }
}
