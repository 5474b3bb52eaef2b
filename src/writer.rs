use std::io::Write;

use crate::buffer::{CancelToken, FieldBuffer, IoSink, SinkBuffer};
use crate::convert::Convert;
use crate::dialect::{Dialect, Newline};
use crate::error::{Error, ErrorKind, Result};
use crate::escape::{self, escaped_len, CharEscape, Doubling, Escaper};
use crate::pool::{BufferPool, Rented};
use crate::quoting::{FieldQuoting, QuoteMode, Quoting};
use crate::scanner::{self, LANES};
use crate::token::Token;

const DEFAULT_CAPACITY: usize = 8 * (1 << 10);

#[derive(Debug, Clone, Copy)]
enum EscapeMode<T> {
    Doubling(Doubling<T>),
    Char(CharEscape<T>),
    // No quote token configured: fields cannot be wrapped, nothing is
    // escaped.
    Raw,
}

/// Writes single fields into a [`FieldBuffer`], quoting and escaping as the
/// session's [`FieldQuoting`] policy demands.
///
/// This is the low-level surface: it knows nothing about records. The
/// [`Writer`] front-end drives it for the common case of writing rows of
/// bytes to an [`std::io::Write`].
#[derive(Debug)]
pub struct FieldWriter<T: Token, B: FieldBuffer<T>> {
    buffer: B,
    dialect: Dialect<T>,
    quoting: FieldQuoting,
    mode: EscapeMode<T>,
    scanner: Option<scanner::Scanner>,
    masks: Vec<u32>,
    pool: BufferPool<T>,
    overflow: Option<Rented<T>>,
}

impl<T: Token, B: FieldBuffer<T>> FieldWriter<T, B> {
    pub fn new(buffer: B, dialect: Dialect<T>, quoting: FieldQuoting) -> Self {
        Self::with_pool(buffer, dialect, quoting, BufferPool::new())
    }

    pub fn with_pool(
        buffer: B,
        dialect: Dialect<T>,
        quoting: FieldQuoting,
        pool: BufferPool<T>,
    ) -> Self {
        let mode = match (dialect.quote(), dialect.escape()) {
            (Some(quote), Some(escape)) => EscapeMode::Char(CharEscape::new(quote, escape)),
            (Some(quote), None) => EscapeMode::Doubling(Doubling::new(quote)),
            (None, _) => EscapeMode::Raw,
        };

        let scanner = match mode {
            EscapeMode::Raw => None,
            _ => T::scanner(
                dialect.delimiter(),
                dialect.quote(),
                dialect.escape(),
                dialect.newline().is_crlf(),
            ),
        };

        Self {
            buffer,
            dialect,
            quoting,
            mode,
            scanner,
            masks: Vec::new(),
            pool,
            overflow: None,
        }
    }

    /// Formats one field through `format` and stages its escaped form.
    ///
    /// `format` is called with the current writable region and returns the
    /// number of tokens written, or `None` when the region was too small, in
    /// which case the buffer grows and `format` runs again from scratch.
    pub fn write_field_with<F>(&mut self, mut format: F) -> Result<()>
    where
        F: FnMut(&mut [T]) -> Option<usize>,
    {
        let written = loop {
            let region = self.buffer.acquire(0);
            let capacity = region.len();

            if capacity == 0 {
                self.buffer.grow()?;
                continue;
            }

            match format(region) {
                Some(written) if written > capacity => {
                    return Err(Error::new(ErrorKind::Converter { written, capacity }));
                }
                Some(written) => break written,
                None => {
                    self.buffer.grow()?;
                }
            }
        };

        self.finish_field(written)
    }

    /// Formats one typed value and stages its escaped form.
    pub fn write_field<V: Convert<T> + ?Sized>(&mut self, value: &V) -> Result<()> {
        self.write_field_with(|region| value.try_format(region))
    }

    /// Stages a pre-formatted field. With `skip_escaping` the value is
    /// committed verbatim, bypassing the quoting policy entirely.
    pub fn write_raw(&mut self, value: &[T], skip_escaping: bool) -> Result<()> {
        let len = value.len();

        {
            let region = self.writable(len)?;
            region[..len].copy_from_slice(value);
        }

        if skip_escaping {
            self.buffer.commit(len);
            return Ok(());
        }

        self.finish_field(len)
    }

    /// Stages the dialect's delimiter token.
    pub fn write_delimiter(&mut self) -> Result<()> {
        let delimiter = self.dialect.delimiter();

        let region = self.writable(1)?;
        region[0] = delimiter;
        self.buffer.commit(1);

        Ok(())
    }

    /// Stages the dialect's record terminator.
    pub fn write_newline(&mut self) -> Result<()> {
        match self.dialect.newline() {
            Newline::CrLf => {
                let region = self.writable(2)?;
                region[0] = T::from_char('\r');
                region[1] = T::from_char('\n');
                self.buffer.commit(2);
            }
            Newline::Lf => {
                let region = self.writable(1)?;
                region[0] = T::from_char('\n');
                self.buffer.commit(1);
            }
        }

        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.buffer.flush()
    }

    pub fn needs_flush(&self) -> bool {
        self.buffer.needs_flush()
    }

    /// Completes the session: final flush (unless `error` is given), release
    /// of all rented storage, at most once.
    pub fn complete(&mut self, error: Option<Error>) -> Result<()> {
        if let Some(mut overflow) = self.overflow.take() {
            overflow.release();
        }

        self.buffer.complete(error)
    }

    pub fn dialect(&self) -> &Dialect<T> {
        &self.dialect
    }

    pub fn into_buffer(self) -> B {
        self.buffer
    }

    // An acquired region of at least `min` tokens, growing as needed. Each
    // grow yields a strictly larger region, so the loop always terminates.
    fn writable(&mut self, min: usize) -> Result<&mut [T]> {
        loop {
            let available = self.buffer.acquire(min).len();

            if available >= min {
                return Ok(self.buffer.acquire(min));
            }

            self.buffer.grow()?;
        }
    }

    fn finish_field(&mut self, written: usize) -> Result<()> {
        match self.mode {
            EscapeMode::Raw => {
                self.buffer.commit(written);
                Ok(())
            }
            EscapeMode::Doubling(escaper) => self.escape_and_commit(written, escaper),
            EscapeMode::Char(escaper) => self.escape_and_commit(written, escaper),
        }
    }

    fn escape_and_commit<E: Escaper<T>>(&mut self, written: usize, escaper: E) -> Result<()> {
        if matches!(self.quoting.mode(), QuoteMode::Never) {
            self.buffer.commit(written);
            return Ok(());
        }

        // Empty fields skip escaping entirely; they only produce output when
        // the policy quotes them.
        if written == 0 {
            if self.quoting.quotes_empty() {
                let quote = escaper.quote();
                let region = self.writable(2)?;
                region[0] = quote;
                region[1] = quote;
                self.buffer.commit(2);
            }

            return Ok(());
        }

        let mut masked = false;
        let quoting: Quoting;

        {
            let region = self.buffer.acquire(0);
            let field = &region[..written];

            quoting = match (&self.scanner, T::bytes(field)) {
                (Some(scanner), Some(bytes)) if bytes.len() >= LANES => {
                    let report = scanner.scan(bytes, &mut self.masks);
                    masked = report.specials > 0;

                    if matches!(self.quoting.mode(), QuoteMode::Always) || report.needs_quoting {
                        Quoting {
                            required: true,
                            specials: report.specials,
                        }
                    } else {
                        Quoting {
                            required: self.quoting.space_triggered(field),
                            specials: 0,
                        }
                    }
                }
                _ => self.quoting.decide(field, &self.dialect, &escaper),
            };
        }

        if !quoting.required {
            self.buffer.commit(written);
            return Ok(());
        }

        let escaped = escaped_len(written, quoting.specials);
        let region_len = self.buffer.acquire(0).len();

        if escaped <= region_len {
            let region = self.buffer.acquire(0);

            if masked {
                scanner::escape_from_masks(
                    region,
                    written,
                    quoting.specials,
                    &self.masks,
                    escaper.quote(),
                    escaper.escape(),
                );
            } else {
                escape::escape_in_place(&escaper, region, written, quoting.specials);
            }

            self.buffer.commit(escaped);
            return Ok(());
        }

        // The escaped field no longer fits: fill the region completely,
        // spill the rest into a rented overflow buffer, flush, then copy the
        // spilled tail back in.
        let overflow_len = escaped - region_len;

        let mut overflow = match self.overflow.take() {
            Some(rented) if rented.len() >= overflow_len => rented,
            Some(mut rented) => {
                rented.release();
                self.pool.rent(overflow_len)
            }
            None => self.pool.rent(overflow_len),
        };

        {
            let region = self.buffer.acquire(0);
            escape::escape_with_overflow(
                &escaper,
                region,
                written,
                quoting.specials,
                &mut overflow[..overflow_len],
            );
        }

        self.buffer.commit(region_len);
        self.buffer.flush()?;

        {
            let region = self.writable(overflow_len)?;
            region[..overflow_len].copy_from_slice(&overflow[..overflow_len]);
        }
        self.buffer.commit(overflow_len);

        self.overflow = Some(overflow);
        Ok(())
    }
}

/// A builder to configure a [`Writer`].
#[derive(Debug, Clone)]
pub struct WriterBuilder {
    delimiter: u8,
    quote: Option<u8>,
    escape: Option<u8>,
    newline: Newline,
    quoting: FieldQuoting,
    capacity: usize,
    pool: Option<BufferPool<u8>>,
    cancel: Option<CancelToken>,
}

impl Default for WriterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WriterBuilder {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            quote: Some(b'"'),
            escape: None,
            newline: Newline::default(),
            quoting: FieldQuoting::auto(),
            capacity: DEFAULT_CAPACITY,
            pool: None,
            cancel: None,
        }
    }

    /// The field delimiter. Defaults to `b','`.
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// The quote character. Defaults to `b'"'`.
    pub fn quote(mut self, quote: u8) -> Self {
        self.quote = Some(quote);
        self
    }

    /// Removes the quote character entirely: fields are written verbatim.
    pub fn no_quote(mut self) -> Self {
        self.quote = None;
        self
    }

    /// Switches to the escape-character dialect: embedded quote and escape
    /// characters are preceded by `escape` instead of doubling quotes.
    pub fn escape(mut self, escape: u8) -> Self {
        self.escape = Some(escape);
        self
    }

    /// The record terminator. Defaults to CRLF.
    pub fn newline(mut self, newline: Newline) -> Self {
        self.newline = newline;
        self
    }

    /// The quoting policy. Defaults to [`FieldQuoting::auto`].
    pub fn quoting(mut self, quoting: FieldQuoting) -> Self {
        self.quoting = quoting;
        self
    }

    /// Initial output buffer capacity in bytes.
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Pool to rent the output and overflow buffers from. Handy to share
    /// storage across writer sessions.
    pub fn buffer_pool(mut self, pool: BufferPool<u8>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Cancellation token observed before every flush, grow or completion.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn from_writer<W: Write>(self, writer: W) -> Result<Writer<W>> {
        let dialect = Dialect::new(self.delimiter, self.quote, self.escape, self.newline)?;
        let pool = self.pool.unwrap_or_default();

        let mut buffer = SinkBuffer::with_pool(IoSink::new(writer), self.capacity, pool.clone());

        if let Some(token) = self.cancel {
            buffer = buffer.cancel_token(token);
        }

        Ok(Writer {
            field: FieldWriter::with_pool(buffer, dialect, self.quoting, pool),
            head: true,
            finished: false,
        })
    }
}

/// A buffered CSV writer over any [`std::io::Write`].
///
/// Data is staged in an internal buffer and only reaches the underlying
/// writer on flush, so [`Writer::finish`] (or [`Writer::into_inner`]) must
/// be called once all records are written.
#[derive(Debug)]
pub struct Writer<W: Write> {
    field: FieldWriter<u8, SinkBuffer<u8, IoSink<W>>>,
    head: bool,
    finished: bool,
}

impl<W: Write> Writer<W> {
    /// A writer over the conventional dialect with the default buffer size.
    pub fn from_writer(writer: W) -> Self {
        let pool = BufferPool::new();
        let buffer = SinkBuffer::with_pool(IoSink::new(writer), DEFAULT_CAPACITY, pool.clone());

        Self {
            field: FieldWriter::with_pool(
                buffer,
                Dialect::standard(),
                FieldQuoting::auto(),
                pool,
            ),
            head: true,
            finished: false,
        }
    }

    /// Writes one whole record and its terminator.
    pub fn write_record<I>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        for field in record {
            self.delimit()?;
            self.field.write_raw(field.as_ref(), false)?;
        }

        self.end_record()
    }

    /// Writes one typed field, preceded by a delimiter when it is not the
    /// first of its record.
    pub fn write_field<V: Convert<u8> + ?Sized>(&mut self, value: &V) -> Result<()> {
        self.delimit()?;
        self.field.write_field(value)
    }

    /// Writes one pre-formatted field. See [`FieldWriter::write_raw`].
    pub fn write_raw_field(&mut self, value: &[u8], skip_escaping: bool) -> Result<()> {
        self.delimit()?;
        self.field.write_raw(value, skip_escaping)
    }

    /// Terminates the current record.
    pub fn end_record(&mut self) -> Result<()> {
        self.field.write_newline()?;
        self.head = true;

        if self.field.needs_flush() {
            self.field.flush()?;
        }

        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.field.flush()
    }

    /// Flushes the remaining buffered data and releases the session's
    /// storage. Idempotent at this level; must be called before dropping
    /// the writer or buffered data is lost.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }

        self.finished = true;
        self.field.complete(None)
    }

    /// Finishes the session and returns the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.finish()?;
        Ok(self.field.into_buffer().into_sink().into_inner())
    }

    fn delimit(&mut self) -> Result<()> {
        if self.head {
            self.head = false;
            Ok(())
        } else {
            self.field.write_delimiter()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use bstr::ByteSlice;

    use crate::buffer::MemoryBuffer;

    fn collect<F>(build: F) -> Vec<u8>
    where
        F: FnOnce(&mut Writer<Cursor<Vec<u8>>>),
    {
        let mut writer = Writer::from_writer(Cursor::new(Vec::new()));
        build(&mut writer);
        writer.into_inner().unwrap().into_inner()
    }

    #[test]
    fn test_plain_field_is_not_quoted() {
        let out = collect(|w| w.write_record(["hello"]).unwrap());
        assert_eq!(out.as_bstr(), "hello\r\n");
    }

    #[test]
    fn test_embedded_delimiter_forces_quotes() {
        let out = collect(|w| w.write_record(["a,b"]).unwrap());
        assert_eq!(out.as_bstr(), "\"a,b\"\r\n");
    }

    #[test]
    fn test_embedded_quotes_are_doubled() {
        let out = collect(|w| w.write_record(["he said \"hi\""]).unwrap());
        assert_eq!(out.as_bstr(), "\"he said \"\"hi\"\"\"\r\n");
    }

    #[test]
    fn test_escape_character_dialect() {
        let mut writer = WriterBuilder::new()
            .escape(b'\\')
            .newline(Newline::Lf)
            .from_writer(Cursor::new(Vec::new()))
            .unwrap();

        writer.write_record(["a\"b"]).unwrap();
        let out = writer.into_inner().unwrap().into_inner();

        assert_eq!(out.as_bstr(), "\"a\\\"b\"\n");
    }

    #[test]
    fn test_always_quotes_empty_fields() {
        let mut writer = WriterBuilder::new()
            .quoting(FieldQuoting::always())
            .newline(Newline::Lf)
            .from_writer(Cursor::new(Vec::new()))
            .unwrap();

        writer.write_record([""]).unwrap();
        writer.write_record(["x", ""]).unwrap();
        let out = writer.into_inner().unwrap().into_inner();

        assert_eq!(out.as_bstr(), "\"\"\n\"x\",\"\"\n");
    }

    #[test]
    fn test_records_and_delimiters() {
        let out = collect(|w| {
            w.write_record(["name", "surname", "age"]).unwrap();
            w.write_record(["john,", "landis", "45"]).unwrap();
            w.write_record(["lucy", "get\ngot", "\"te,\"st\""]).unwrap();
        });

        assert_eq!(
            out.as_bstr(),
            "name,surname,age\r\n\"john,\",landis,45\r\nlucy,\"get\ngot\",\"\"\"te,\"\"st\"\"\"\r\n",
        );
    }

    #[test]
    fn test_typed_fields() {
        let out = collect(|w| {
            w.write_field(&42i64).unwrap();
            w.write_field(&2.5f64).unwrap();
            w.write_field(&true).unwrap();
            w.write_field("text").unwrap();
            w.end_record().unwrap();
        });

        assert_eq!(out.as_bstr(), "42,2.5,true,text\r\n");
    }

    #[test]
    fn test_empty_record_is_just_a_terminator() {
        let out = collect(|w| {
            w.write_record(std::iter::empty::<&[u8]>()).unwrap();
        });

        assert_eq!(out.as_bstr(), "\r\n");
    }

    #[test]
    fn test_skip_escaping_writes_verbatim() {
        let out = collect(|w| {
            w.write_raw_field(b"a,b", true).unwrap();
            w.end_record().unwrap();
        });

        assert_eq!(out.as_bstr(), "a,b\r\n");
    }

    #[test]
    fn test_no_quote_dialect_writes_verbatim() {
        let mut writer = WriterBuilder::new()
            .no_quote()
            .newline(Newline::Lf)
            .from_writer(Cursor::new(Vec::new()))
            .unwrap();

        writer.write_record(["a,b"]).unwrap();
        let out = writer.into_inner().unwrap().into_inner();

        assert_eq!(out.as_bstr(), "a,b\n");
    }

    #[test]
    fn test_leading_and_trailing_space_triggers() {
        let mut writer = WriterBuilder::new()
            .quoting(
                FieldQuoting::auto()
                    .quote_leading_space(true)
                    .quote_trailing_space(true),
            )
            .newline(Newline::Lf)
            .from_writer(Cursor::new(Vec::new()))
            .unwrap();

        writer.write_record([" padded", "plain", "padded "]).unwrap();
        let out = writer.into_inner().unwrap().into_inner();

        assert_eq!(out.as_bstr(), "\" padded\",plain,\"padded \"\n");
    }

    #[test]
    fn test_long_fields_take_the_vector_path() {
        // One quote per position over a few chunk widths, checked against a
        // straightforward reference implementation.
        for width in [32usize, 33, 64, 65, 96] {
            for at in 0..width {
                let mut field = vec![b'v'; width];
                field[at] = b'"';

                let out = collect(|w| {
                    w.write_record([&field]).unwrap();
                });

                let mut expected = vec![b'"'];
                for &byte in &field {
                    expected.push(byte);
                    if byte == b'"' {
                        expected.push(b'"');
                    }
                }
                expected.extend_from_slice(b"\"\r\n");

                assert_eq!(out, expected, "width {} quote at {}", width, at);
            }
        }
    }

    #[test]
    fn test_overflow_split_through_a_tiny_buffer() {
        // 60 source bytes with 10 quotes escape to 72, which cannot fit in
        // the 64-byte buffer: the field takes the overflow path.
        let mut field = vec![b'x'; 60];
        for i in 0..10 {
            field[i * 6] = b'"';
        }

        let mut writer = WriterBuilder::new()
            .buffer_capacity(64)
            .newline(Newline::Lf)
            .from_writer(Cursor::new(Vec::new()))
            .unwrap();

        writer.write_record([&field]).unwrap();
        let out = writer.into_inner().unwrap().into_inner();

        let mut expected = vec![b'"'];
        for &byte in &field {
            expected.push(byte);
            if byte == b'"' {
                expected.push(b'"');
            }
        }
        expected.extend_from_slice(b"\"\n");

        assert_eq!(out, expected);
    }

    #[test]
    fn test_fields_larger_than_the_buffer() {
        let field = vec![b'a'; 100_000];

        let mut writer = WriterBuilder::new()
            .buffer_capacity(256)
            .newline(Newline::Lf)
            .from_writer(Cursor::new(Vec::new()))
            .unwrap();

        writer.write_record([&field, &vec![b'"'; 300]]).unwrap();
        let out = writer.into_inner().unwrap().into_inner();

        let mut expected = field.clone();
        expected.push(b',');
        expected.push(b'"');
        expected.extend(std::iter::repeat(b'"').take(600));
        expected.extend_from_slice(b"\"\n");

        assert_eq!(out, expected);
    }

    #[test]
    fn test_round_trip_through_an_independent_parser() {
        let records: Vec<Vec<&[u8]>> = vec![
            vec![b"plain", b"with,comma", b"with\"quote"],
            vec![b"", b" lead", b"trail "],
            vec![b"line\nbreak", b"cr\rhere", b"\"\"\""],
        ];

        let out = collect(|w| {
            for record in &records {
                w.write_record(record).unwrap();
            }
        });

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(out.as_slice());

        let parsed: Vec<csv::ByteRecord> = reader.byte_records().map(|r| r.unwrap()).collect();

        assert_eq!(parsed.len(), records.len());

        for (record, expected) in parsed.iter().zip(&records) {
            let fields: Vec<&[u8]> = record.iter().collect();
            assert_eq!(&fields, expected);
        }
    }

    #[test]
    fn test_converter_contract_violation_is_fatal() {
        let buffer: MemoryBuffer<u8> = MemoryBuffer::with_capacity(64);
        let mut writer = FieldWriter::new(buffer, Dialect::standard(), FieldQuoting::auto());

        let err = writer
            .write_field_with(|region| Some(region.len() + 1))
            .unwrap_err();

        assert!(matches!(err.kind(), ErrorKind::Converter { .. }));
    }

    #[test]
    fn test_cancellation_surfaces_through_the_writer() {
        let token = CancelToken::new();

        let mut writer = WriterBuilder::new()
            .cancel_token(token.clone())
            .from_writer(Cursor::new(Vec::new()))
            .unwrap();

        writer.write_record(["before"]).unwrap();
        token.cancel();

        assert!(writer.flush().unwrap_err().is_cancelled());
        assert!(writer.finish().unwrap_err().is_cancelled());
    }

    #[test]
    fn test_finish_is_idempotent_at_the_writer_level() {
        let mut writer = Writer::from_writer(Cursor::new(Vec::new()));

        writer.write_record(["a"]).unwrap();
        writer.finish().unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn test_memory_buffer_session() {
        let buffer: MemoryBuffer<u8> = MemoryBuffer::with_capacity(64);
        let mut writer = FieldWriter::new(buffer, Dialect::standard(), FieldQuoting::auto());

        writer.write_raw(b"a,b", false).unwrap();
        writer.write_delimiter().unwrap();
        writer.write_raw(b"plain", false).unwrap();
        writer.write_newline().unwrap();
        writer.complete(None).unwrap();

        assert_eq!(writer.into_buffer().into_vec().as_bstr(), "\"a,b\",plain\r\n");
    }

    #[test]
    fn test_utf16_session() {
        let dialect: Dialect<u16> = Dialect::new(
            u16::from_char(','),
            Some(u16::from_char('"')),
            None,
            Newline::Lf,
        )
        .unwrap();

        let buffer: MemoryBuffer<u16> = MemoryBuffer::with_capacity(64);
        let mut writer = FieldWriter::new(buffer, dialect, FieldQuoting::auto());

        writer.write_field("he said \"hi\"").unwrap();
        writer.write_delimiter().unwrap();
        writer.write_field("plain").unwrap();
        writer.write_newline().unwrap();
        writer.complete(None).unwrap();

        let out = writer.into_buffer().into_vec();
        let expected: Vec<u16> = "\"he said \"\"hi\"\"\",plain\n".encode_utf16().collect();

        assert_eq!(out, expected);
    }

    #[test]
    fn test_overflow_rental_returns_to_the_pool() {
        let pool: BufferPool<u8> = BufferPool::new();

        // 60 bytes + 3 specials escape to 65, one past the 64-byte buffer.
        let mut field = vec![b'x'; 60];
        field[0] = b'"';
        field[30] = b'"';
        field[59] = b'"';

        let mut writer = WriterBuilder::new()
            .buffer_capacity(64)
            .buffer_pool(pool.clone())
            .from_writer(Cursor::new(Vec::new()))
            .unwrap();

        writer.write_record([&field]).unwrap();
        writer.finish().unwrap();

        // Primary storage and the overflow buffer both made it back.
        assert_eq!(pool.shelved(), 2);
    }
}
