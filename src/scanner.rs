/// Number of lanes covered by one mask word.
pub const LANES: usize = 32;

/// Result of one vectorized pass over a field.
#[derive(Debug, Clone, Copy)]
pub struct ScanReport {
    /// Whether any lane held a delimiter, quote, escape or newline token.
    pub needs_quoting: bool,
    /// Exact number of lanes holding a quote or escape token.
    pub specials: usize,
}

/// The five bytes compared against each lane. Absent tokens are filled with
/// a duplicate of a present one, which turns their comparison into a no-op
/// inside the OR reduction.
#[derive(Debug, Clone, Copy)]
struct Needles {
    delimiter: u8,
    quote: u8,
    escape: u8,
    newline1: u8,
    newline2: u8,
}

impl Needles {
    fn new(delimiter: u8, quote: u8, escape: Option<u8>, match_cr: bool) -> Self {
        Self {
            delimiter,
            quote,
            escape: escape.unwrap_or(quote),
            newline1: b'\n',
            newline2: if match_cr { b'\r' } else { b'\n' },
        }
    }
}

#[cfg(target_arch = "x86_64")]
mod x86_64 {
    use core::arch::x86_64::{
        __m128i, _mm_cmpeq_epi8, _mm_loadu_si128, _mm_movemask_epi8, _mm_or_si128, _mm_set1_epi8,
    };

    use super::Needles;

    const SSE2_STEP: usize = 16;

    #[derive(Debug)]
    pub(super) struct Sse2Classifier {
        delimiter: __m128i,
        quote: __m128i,
        escape: __m128i,
        newline1: __m128i,
        newline2: __m128i,
    }

    impl Sse2Classifier {
        pub(super) fn new(needles: Needles) -> Self {
            unsafe {
                Self {
                    delimiter: _mm_set1_epi8(needles.delimiter as i8),
                    quote: _mm_set1_epi8(needles.quote as i8),
                    escape: _mm_set1_epi8(needles.escape as i8),
                    newline1: _mm_set1_epi8(needles.newline1 as i8),
                    newline2: _mm_set1_epi8(needles.newline2 as i8),
                }
            }
        }

        #[inline(always)]
        unsafe fn classify16(&self, ptr: *const u8) -> (u32, u32) {
            let chunk = _mm_loadu_si128(ptr as *const __m128i);

            let is_quote = _mm_cmpeq_epi8(chunk, self.quote);
            let is_escape = _mm_cmpeq_epi8(chunk, self.escape);
            let special = _mm_or_si128(is_quote, is_escape);

            let is_delimiter = _mm_cmpeq_epi8(chunk, self.delimiter);
            let is_newline1 = _mm_cmpeq_epi8(chunk, self.newline1);
            let is_newline2 = _mm_cmpeq_epi8(chunk, self.newline2);
            let any = _mm_or_si128(
                special,
                _mm_or_si128(is_delimiter, _mm_or_si128(is_newline1, is_newline2)),
            );

            (
                _mm_movemask_epi8(special) as u32,
                _mm_movemask_epi8(any) as u32,
            )
        }

        /// # Safety
        ///
        /// `ptr` must be valid for reads of 32 bytes.
        #[inline(always)]
        pub(super) unsafe fn classify(&self, ptr: *const u8) -> (u32, u32) {
            let (special_lo, any_lo) = self.classify16(ptr);
            let (special_hi, any_hi) = self.classify16(ptr.add(SSE2_STEP));

            (special_lo | (special_hi << 16), any_lo | (any_hi << 16))
        }
    }
}

#[cfg(target_arch = "aarch64")]
mod aarch64 {
    use core::arch::aarch64::{
        uint8x16_t, vaddv_u8, vandq_u8, vceqq_u8, vdupq_n_u8, vget_high_u8, vget_low_u8, vld1q_u8,
        vorrq_u8,
    };

    use super::Needles;

    const NEON_STEP: usize = 16;

    // One distinct power of two per lane of an 8-lane half, so the
    // horizontal add of the masked comparison reconstructs a move mask.
    static BIT_WEIGHTS: [u8; 16] = [1, 2, 4, 8, 16, 32, 64, 128, 1, 2, 4, 8, 16, 32, 64, 128];

    #[inline(always)]
    unsafe fn neon_movemask(v: uint8x16_t) -> u32 {
        let bits = vandq_u8(v, vld1q_u8(BIT_WEIGHTS.as_ptr()));
        let low = vaddv_u8(vget_low_u8(bits)) as u32;
        let high = vaddv_u8(vget_high_u8(bits)) as u32;

        low | (high << 8)
    }

    #[derive(Debug)]
    pub(super) struct NeonClassifier {
        needles: Needles,
    }

    impl NeonClassifier {
        pub(super) fn new(needles: Needles) -> Self {
            Self { needles }
        }

        #[inline(always)]
        unsafe fn classify16(&self, ptr: *const u8) -> (u32, u32) {
            let chunk = vld1q_u8(ptr);

            let is_quote = vceqq_u8(chunk, vdupq_n_u8(self.needles.quote));
            let is_escape = vceqq_u8(chunk, vdupq_n_u8(self.needles.escape));
            let special = vorrq_u8(is_quote, is_escape);

            let is_delimiter = vceqq_u8(chunk, vdupq_n_u8(self.needles.delimiter));
            let is_newline1 = vceqq_u8(chunk, vdupq_n_u8(self.needles.newline1));
            let is_newline2 = vceqq_u8(chunk, vdupq_n_u8(self.needles.newline2));
            let any = vorrq_u8(special, vorrq_u8(is_delimiter, vorrq_u8(is_newline1, is_newline2)));

            (neon_movemask(special), neon_movemask(any))
        }

        /// # Safety
        ///
        /// `ptr` must be valid for reads of 32 bytes.
        #[inline(always)]
        pub(super) unsafe fn classify(&self, ptr: *const u8) -> (u32, u32) {
            let (special_lo, any_lo) = self.classify16(ptr);
            let (special_hi, any_hi) = self.classify16(ptr.add(NEON_STEP));

            (special_lo | (special_hi << 16), any_lo | (any_hi << 16))
        }
    }
}

#[cfg(any(test, not(any(target_arch = "x86_64", target_arch = "aarch64"))))]
mod generic {
    use super::Needles;

    #[derive(Debug)]
    pub(super) struct ScalarClassifier {
        needles: Needles,
    }

    impl ScalarClassifier {
        pub(super) fn new(needles: Needles) -> Self {
            Self { needles }
        }

        /// # Safety
        ///
        /// `ptr` must be valid for reads of 32 bytes.
        #[inline]
        pub(super) unsafe fn classify(&self, ptr: *const u8) -> (u32, u32) {
            let chunk = std::slice::from_raw_parts(ptr, super::LANES);
            let mut special_mask = 0u32;
            let mut any_mask = 0u32;

            for (lane, &byte) in chunk.iter().enumerate() {
                let special = byte == self.needles.quote || byte == self.needles.escape;
                let any = special
                    || byte == self.needles.delimiter
                    || byte == self.needles.newline1
                    || byte == self.needles.newline2;

                special_mask |= (special as u32) << lane;
                any_mask |= (any as u32) << lane;
            }

            (special_mask, any_mask)
        }
    }
}

/// Vectorized field scanner: classifies fields one 32-lane chunk at a time,
/// building one bitmask word per chunk (bit `i` marks lane `i` as a quote or
/// escape token) and detecting whether the field needs quoting at all.
///
/// Fields shorter than one chunk take the scalar escaper instead.
#[derive(Debug)]
pub struct Scanner {
    #[cfg(target_arch = "x86_64")]
    inner: x86_64::Sse2Classifier,

    #[cfg(target_arch = "aarch64")]
    inner: aarch64::NeonClassifier,

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    inner: generic::ScalarClassifier,
}

impl Scanner {
    pub fn new(delimiter: u8, quote: u8, escape: Option<u8>, match_cr: bool) -> Self {
        let needles = Needles::new(delimiter, quote, escape, match_cr);

        #[cfg(target_arch = "x86_64")]
        {
            Self {
                inner: x86_64::Sse2Classifier::new(needles),
            }
        }

        #[cfg(target_arch = "aarch64")]
        {
            Self {
                inner: aarch64::NeonClassifier::new(needles),
            }
        }

        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        {
            Self {
                inner: generic::ScalarClassifier::new(needles),
            }
        }
    }

    /// Scans `field` into `masks`, one word per chunk.
    ///
    /// The first chunk may be partial; its mask is shifted so that its last
    /// valid lane sits on the most significant bit, keeping the leading-zero
    /// arithmetic of the rewrite phase uniform across chunks. Every load is
    /// in bounds: the first covers the field head, the following ones are
    /// aligned to the field end.
    pub fn scan(&self, field: &[u8], masks: &mut Vec<u32>) -> ScanReport {
        let len = field.len();

        assert!(len >= LANES, "scan needs a field at least one chunk long");

        masks.clear();

        let remainder = len & (LANES - 1);
        let first_len = if remainder == 0 { LANES } else { remainder };
        let padding = LANES - first_len;

        let ptr = field.as_ptr();
        let mut specials = 0usize;
        let mut any = 0u32;

        // SAFETY: len >= LANES, so 32 bytes are readable from the start.
        let (special_mask, any_mask) = unsafe { self.inner.classify(ptr) };

        // Drop the lanes belonging to the next chunk; they are rescanned by
        // the following load and must not be counted twice.
        let special_mask = if padding == 0 {
            special_mask
        } else {
            special_mask << padding
        };

        masks.push(special_mask);
        specials += special_mask.count_ones() as usize;
        any |= any_mask;

        let mut offset = first_len;

        while offset < len {
            // SAFETY: offset is first_len + k * LANES and the last iteration
            // starts at len - LANES exactly.
            let (special_mask, any_mask) = unsafe { self.inner.classify(ptr.add(offset)) };

            masks.push(special_mask);
            specials += special_mask.count_ones() as usize;
            any |= any_mask;

            offset += LANES;
        }

        debug_assert_eq!(offset, len);

        ScanReport {
            needs_quoting: any != 0,
            specials,
        }
    }
}

/// Rewrites the first `src_len` tokens of `buf` in place from the masks
/// produced by [`Scanner::scan`], wrapping the field in quotes and writing
/// `escape` before each marked lane.
///
/// Masks are consumed from last chunk to first and, within a chunk, from the
/// most significant set bit down, so the rewrite shares the backward
/// discipline (and the output) of the scalar escaper. The rewrite itself is
/// width-agnostic even though the scan frontend only exists for bytes.
pub fn escape_from_masks<T: crate::token::Token>(
    buf: &mut [T],
    src_len: usize,
    specials: usize,
    masks: &[u32],
    quote: T,
    escape: T,
) {
    let escaped = src_len + specials + 2;

    assert!(buf.len() >= escaped);
    debug_assert_eq!(masks.len(), src_len.div_ceil(LANES));

    let padding = masks.len() * LANES - src_len;
    let buf = &mut buf[..escaped];

    let mut src_rem = src_len;
    let mut dst_rem = escaped - 1;

    buf[dst_rem] = quote;

    for index in (0..masks.len()).rev() {
        // Only the first mask carries padding bits below its valid lanes.
        let consumed = if index == 0 { padding } else { 0 };

        let mut mask = masks[index];
        let mut position = 0usize;

        while mask != 0 {
            // Lanes from the chunk end down to the marked lane, inclusive.
            let next = mask.leading_zeros() as usize + 1;
            mask &= (u64::from(u32::MAX) >> next) as u32;

            let segment = next - position;
            position = next;

            src_rem -= segment;
            dst_rem -= segment;
            buf.copy_within(src_rem..src_rem + segment, dst_rem);
            dst_rem -= 1;
            buf[dst_rem] = escape;
        }

        let rest = LANES - position - consumed;
        src_rem -= rest;
        dst_rem -= rest;
        buf.copy_within(src_rem..src_rem + rest, dst_rem);
    }

    debug_assert_eq!(src_rem, 0);
    debug_assert_eq!(dst_rem, 1);

    buf[0] = quote;
}
