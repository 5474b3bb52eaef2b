#![no_main]

use libfuzzer_sys::fuzz_target;

use csv_scribe::{escape_in_place, escaped_len, CharEscape, Doubling, Escaper, unescape};

fuzz_target!(|data: &[u8]| {
    let doubling = Doubling::new(b'"');
    let specials = doubling.count_special(data);
    let mut buf = data.to_vec();
    buf.resize(escaped_len(data.len(), specials), 0);
    escape_in_place(&doubling, &mut buf, data.len(), specials);
    assert_eq!(unescape(&buf, b'"', None), data);

    let unix = CharEscape::new(b'"', b'\\');
    let specials = unix.count_special(data);
    let mut buf = data.to_vec();
    buf.resize(escaped_len(data.len(), specials), 0);
    escape_in_place(&unix, &mut buf, data.len(), specials);
    assert_eq!(unescape(&buf, b'"', Some(b'\\')), data);
});
