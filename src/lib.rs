/*!
The `csv-scribe` crate is the output side of a CSV toolchain: it decides
whether formatted fields need quoting, rewrites them in place with embedded
quotes doubled (or escaped, for Unix-style dialects), and stages the result
in a growable buffer that is flushed to an underlying sink.

It leverages [SIMD](https://en.wikipedia.org/wiki/Single_instruction,_multiple_data)
instructions to scan long fields, and is designed so that escaping never
copies a field twice: the converted value is escaped directly inside the
output buffer, spilling into a pooled overflow buffer only when the escaped
form outgrows the space left.

# Examples

*Writing records of bytes*

```
use std::io;
use csv_scribe::Writer;

let mut writer = Writer::from_writer(io::stdout());

writer.write_record(["name", "comment"])?;
writer.write_record(["john", "likes \"proper\" csv"])?;
writer.finish()?;
```

*Using a builder to configure the dialect and quoting policy*

```
use std::io;
use csv_scribe::{FieldQuoting, Newline, WriterBuilder};

let mut writer = WriterBuilder::new()
    .delimiter(b';')
    .newline(Newline::Lf)
    .quoting(FieldQuoting::auto().quote_empty(true))
    .from_writer(io::stdout())?;
```

*Writing typed values without intermediate allocations*

```
use std::io;
use csv_scribe::Writer;

let mut writer = Writer::from_writer(io::stdout());

writer.write_field(&42i64)?;
writer.write_field(&2.5f64)?;
writer.write_field("text")?;
writer.end_record()?;
writer.finish()?;
```

# Design notes

## In-place escaping

The [`Writer`] hands the converted field's own buffer region to the escaper
as both source and destination. This only works because the rewrite runs
strictly backward: the destination index always stays ahead of the source
index, so no token is overwritten before it has been read, and the opening
quote lands in slot zero after everything else. Fields whose escaped form no
longer fits the region are split: the region is filled completely and the
tail spills into a pooled overflow buffer that is copied back after a flush.

## Vectorized scanning

Fields of 32 bytes or more are classified one 32-lane chunk at a time by
comparing against splats of the dialect tokens, in the spirit of the
[`memchr`](https://docs.rs/memchr/latest/memchr/) crate's routines. Each
chunk yields a bitmask of quote/escape lanes; the masks then drive the same
backward rewrite at bulk-copy granularity, producing output identical to the
scalar escaper. On `x86_64` the classifier uses `sse2`, on `aarch64` `neon`,
and everywhere else a scalar loop with the same mask layout.

## Buffer protocol

Output staging follows a small four-operation protocol
([`FieldBuffer`](crate::FieldBuffer)): peek a writable region, commit
written tokens, grow (flushing first, since reclaiming flushed space is
cheaper than allocating), and complete exactly once. Storage is rented from
a [`BufferPool`] and handed back on completion, including on error paths.
Two flavors exist: [`SinkBuffer`] copies committed tokens to a sink on
flush, while [`MemoryBuffer`] commits straight into the output vector with
no intermediate copy.

## Token widths

The engine is written over a [`Token`] trait covering bytes and UTF-16 code
units. The vectorized scanner only fronts the byte width; UTF-16 sessions
use the scalar escaper with identical semantics.
*/
mod buffer;
mod convert;
mod dialect;
mod error;
mod escape;
mod pool;
mod quoting;
mod scanner;
mod token;
mod utils;
mod writer;

pub use buffer::{CancelToken, FieldBuffer, IoSink, MemoryBuffer, Sink, SinkBuffer};
pub use convert::Convert;
pub use dialect::{Dialect, Newline};
pub use error::{Error, ErrorKind, Result};
pub use escape::{escape_in_place, escape_with_overflow, escaped_len, CharEscape, Doubling, Escaper};
pub use pool::{BufferPool, Rented};
pub use quoting::{FieldQuoting, QuoteMode, Quoting};
pub use scanner::{escape_from_masks, ScanReport, Scanner};
pub use token::Token;
pub use utils::{unescape, unescape_to};
pub use writer::{FieldWriter, Writer, WriterBuilder};
