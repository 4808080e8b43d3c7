//! Byte scanning helpers for NUL-terminated and prefixed strings.
//!
//! On `x86_64` the scans use SSE2 (always available on that target). Other
//! targets fall back to word-at-a-time (SWAR) checks.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::{__m128i, _mm_cmpeq_epi8, _mm_load_si128, _mm_loadu_si128, _mm_movemask_epi8, _mm_setzero_si128};

const WORD: usize = core::mem::size_of::<usize>();
const LO: usize = usize::from_ne_bytes([0x01; WORD]);
const HI: usize = usize::from_ne_bytes([0x80; WORD]);

/// Whether any byte of `word` is zero.
#[cfg_attr(target_arch = "x86_64", allow(dead_code))]
#[inline]
fn word_has_zero(word: usize) -> bool {
    word.wrapping_sub(LO) & !word & HI != 0
}

/// Index of the first NUL byte in `bytes`, if any.
pub fn nul_position(bytes: &[u8]) -> Option<usize> {
    #[cfg(target_arch = "x86_64")]
    {
        let mut chunks = bytes.chunks_exact(16);
        let mut offset = 0;
        for chunk in &mut chunks {
            // SAFETY: SSE2 is part of the x86_64 baseline and `chunk` is
            // exactly 16 readable bytes; the load is unaligned.
            let mask = unsafe {
                let v = _mm_loadu_si128(chunk.as_ptr() as *const __m128i);
                _mm_movemask_epi8(_mm_cmpeq_epi8(v, _mm_setzero_si128()))
            };
            if mask != 0 {
                return Some(offset + mask.trailing_zeros() as usize);
            }
            offset += 16;
        }
        chunks.remainder().iter().position(|&b| b == 0).map(|i| offset + i)
    }

    #[cfg(not(target_arch = "x86_64"))]
    {
        let mut chunks = bytes.chunks_exact(WORD);
        let mut offset = 0;
        for chunk in &mut chunks {
            let mut word = [0u8; WORD];
            word.copy_from_slice(chunk);
            if word_has_zero(usize::from_ne_bytes(word)) {
                break;
            }
            offset += WORD;
        }
        bytes[offset..].iter().position(|&b| b == 0).map(|i| offset + i)
    }
}

/// Length of the NUL-terminated string at `ptr`.
///
/// Bytes are checked one at a time until `ptr` is aligned, then a block at a
/// time with aligned loads. Prefer [`nul_position`] when the bytes are
/// already a slice.
///
/// # Safety
/// `ptr` must point to a readable, NUL-terminated byte sequence.
///
/// The last block load may read bytes past the terminator, up to the end of
/// its aligned block. Such a load stays inside the terminator's page, so it
/// does not fault on mainstream targets, but the extra bytes can lie outside
/// the allocation `ptr` belongs to. Rust's memory model treats that read as
/// undefined behavior, so under Miri the scan is byte-at-a-time instead.
pub unsafe fn c_str_len(ptr: *const u8) -> usize {
    #[cfg(miri)]
    // SAFETY: forwarded from the caller.
    return unsafe { scalar_c_str_len(ptr) };

    #[cfg(not(miri))]
    // SAFETY: forwarded from the caller.
    return unsafe { block_c_str_len(ptr) };
}

/// # Safety
/// `ptr` must point to a readable, NUL-terminated byte sequence.
#[cfg_attr(not(miri), allow(dead_code))]
unsafe fn scalar_c_str_len(ptr: *const u8) -> usize {
    let mut len = 0;
    // SAFETY: every byte up to and including the terminator is readable.
    while unsafe { *ptr.add(len) } != 0 {
        len += 1;
    }
    len
}

/// # Safety
/// As [`c_str_len`], including the read past the terminator.
#[cfg_attr(miri, allow(dead_code))]
unsafe fn block_c_str_len(ptr: *const u8) -> usize {
    #[cfg(target_arch = "x86_64")]
    const BLOCK: usize = 16;
    #[cfg(not(target_arch = "x86_64"))]
    const BLOCK: usize = WORD;

    let mut len = 0;
    // SAFETY: every byte up to and including the terminator is readable, and
    // an aligned block holding a readable byte lies within one page.
    unsafe {
        while (ptr.add(len) as usize) % BLOCK != 0 {
            if *ptr.add(len) == 0 {
                return len;
            }
            len += 1;
        }
        loop {
            let block = ptr.add(len);
            #[cfg(target_arch = "x86_64")]
            {
                let v = _mm_load_si128(block as *const __m128i);
                let mask = _mm_movemask_epi8(_mm_cmpeq_epi8(v, _mm_setzero_si128()));
                if mask != 0 {
                    return len + mask.trailing_zeros() as usize;
                }
            }
            #[cfg(not(target_arch = "x86_64"))]
            {
                if word_has_zero((block as *const usize).read()) {
                    let tail = std::slice::from_raw_parts(block, WORD);
                    if let Some(i) = tail.iter().position(|&b| b == 0) {
                        return len + i;
                    }
                }
            }
            len += BLOCK;
        }
    }
}

/// Whether `bytes` begins with `prefix`.
pub fn has_prefix(bytes: &[u8], prefix: &[u8]) -> bool {
    if prefix.len() > bytes.len() {
        return false;
    }
    let (head, _) = bytes.split_at(prefix.len());
    let mut a = head.chunks_exact(WORD);
    let mut b = prefix.chunks_exact(WORD);
    for (x, y) in (&mut a).zip(&mut b) {
        if x != y {
            return false;
        }
    }
    a.remainder() == b.remainder()
}
