use memchr::memchr;

/// Reverses the writer's quoting: strips the wrapping quotes of `field` and
/// collapses its escape sequences, appending the result to `acc`.
///
/// With `escape` unset, doubled quotes collapse to one (the conventional
/// dialect); with `escape` set, each escape character is dropped and the
/// character after it is kept verbatim. Unquoted fields are copied as-is.
pub fn unescape_to(field: &[u8], quote: u8, escape: Option<u8>, acc: &mut Vec<u8>) {
    let inner = match field {
        [first, inner @ .., last] if *first == quote && *last == quote => inner,
        _ => {
            acc.extend_from_slice(field);
            return;
        }
    };

    match escape {
        None => {
            let mut offset: usize = 0;

            while let Some(index) = memchr(quote, &inner[offset..]) {
                acc.extend_from_slice(&inner[offset..offset + index + 1]);
                offset += index + 1;

                // Skip the second half of a doubled quote.
                if inner.get(offset) == Some(&quote) {
                    offset += 1;
                }
            }

            acc.extend_from_slice(&inner[offset..]);
        }
        Some(escape) => {
            let mut offset: usize = 0;

            while let Some(index) = memchr(escape, &inner[offset..]) {
                acc.extend_from_slice(&inner[offset..offset + index]);
                offset += index + 1;

                if let Some(&escaped) = inner.get(offset) {
                    acc.push(escaped);
                    offset += 1;
                }
            }

            acc.extend_from_slice(&inner[offset..]);
        }
    }
}

/// Allocating variant of [`unescape_to`].
pub fn unescape(field: &[u8], quote: u8, escape: Option<u8>) -> Vec<u8> {
    let mut acc = Vec::with_capacity(field.len());
    unescape_to(field, quote, escape, &mut acc);
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::escape::{escape_in_place, escaped_len, CharEscape, Doubling, Escaper};

    #[test]
    fn test_unescape_doubling() {
        assert_eq!(unescape(b"plain", b'"', None), b"plain");
        assert_eq!(unescape(b"\"a,b\"", b'"', None), b"a,b");
        assert_eq!(unescape(b"\"he said \"\"hi\"\"\"", b'"', None), b"he said \"hi\"");
        assert_eq!(unescape(b"\"\"", b'"', None), b"");
        assert_eq!(unescape(b"\"\"\"\"", b'"', None), b"\"");
    }

    #[test]
    fn test_unescape_escape_character() {
        assert_eq!(unescape(b"\"a\\\"b\"", b'"', Some(b'\\')), b"a\"b");
        assert_eq!(unescape(b"\"a\\\\b\"", b'"', Some(b'\\')), b"a\\b");
        assert_eq!(unescape(b"plain", b'"', Some(b'\\')), b"plain");
    }

    #[test]
    fn test_escape_round_trip() {
        let inputs: &[&[u8]] = &[
            b"",
            b"plain",
            b"a,b",
            b"\"",
            b"\"\"",
            b"a\"b\"c",
            b"ends with \"",
            b"\" starts with",
            b"new\nline",
        ];

        for input in inputs {
            let escaper = Doubling::new(b'"');
            let specials = escaper.count_special(input);
            let mut buf = input.to_vec();
            buf.resize(escaped_len(input.len(), specials), 0);
            escape_in_place(&escaper, &mut buf, input.len(), specials);

            assert_eq!(&unescape(&buf, b'"', None), input, "input: {:?}", input);
        }

        let inputs: &[&[u8]] = &[b"a\\b", b"a\"b", b"\\\"", b"\\", b"mixed \\ and \" tokens"];

        for input in inputs {
            let escaper = CharEscape::new(b'"', b'\\');
            let specials = escaper.count_special(input);
            let mut buf = input.to_vec();
            buf.resize(escaped_len(input.len(), specials), 0);
            escape_in_place(&escaper, &mut buf, input.len(), specials);

            assert_eq!(&unescape(&buf, b'"', Some(b'\\')), input, "input: {:?}", input);
        }
    }
}
