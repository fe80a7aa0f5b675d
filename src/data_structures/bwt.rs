// Copyright 2014-2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! The Burrows-Wheeler transform, its inverse, and the rank tables (`C`/`Occ`)
//! an FM-index backward search is built on.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::alphabets::Alphabet;
use crate::data_structures::suffix_array::{suffix_array, RawSuffixArray};
use crate::utils::TextSlice;

/// The Burrows-Wheeler transform of a sentinel-extended text, `L`.
pub type BWT = Vec<u8>;

/// `C`: for each byte `c`, the number of positions in `F` (equivalently `L`,
/// since they share a multiset) whose byte is strictly less than `c`.
/// Indexed directly by byte value, so lookups are O(1) without hashing.
pub type Less = [usize; 256];

/// Errors raised while building or validating a Burrows-Wheeler transform.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BWTError {
    /// The text contains the configured sentinel byte, and the process-wide
    /// [`check_end_symbol`] flag is enabled.
    #[error("text contains the end-symbol/sentinel byte")]
    EndSymbolExisted,
    /// `bwt_from_sa` was called with a suffix array that does not match the
    /// text it is claimed to describe.
    #[error("suffix array length or SA[0] does not match the given text")]
    InvalidSuffixArray,
}

static CHECK_END_SYMBOL: AtomicBool = AtomicBool::new(true);

/// Read the process-wide `CheckEndSymbol` switch (default: `true`).
///
/// When enabled, [`transform`] and [`crate::data_structures::fmindex::FMIndex::build`]
/// reject texts that already contain the sentinel byte.
pub fn check_end_symbol() -> bool {
    CHECK_END_SYMBOL.load(Ordering::Relaxed)
}

/// Set the process-wide `CheckEndSymbol` switch.
pub fn set_check_end_symbol(enabled: bool) {
    CHECK_END_SYMBOL.store(enabled, Ordering::Relaxed);
}

/// Compute the Burrows-Wheeler transform `L` of `text`, using `sentinel` as
/// the end-of-text marker. This is the facade described in the module
/// overview: it builds the suffix array internally and discards it, keeping
/// only `L`.
///
/// Fails with [`BWTError::EndSymbolExisted`] if `text` contains `sentinel`
/// and [`check_end_symbol`] is `true`.
///
/// # Example
///
/// ```
/// use bwt_fm_index::data_structures::bwt::transform;
///
/// let l = transform(b"abracadabra", b'$').unwrap();
/// assert_eq!(l, b"ard$rcaaaabb");
/// ```
pub fn transform(text: TextSlice, sentinel: u8) -> Result<BWT, BWTError> {
    if check_end_symbol() && text.contains(&sentinel) {
        return Err(BWTError::EndSymbolExisted);
    }
    let sa = suffix_array(text);
    bwt_from_sa(text, &sa, sentinel)
}

/// Compute `L` from a precomputed suffix array `sa`.
///
/// Requires `sa.len() == text.len() + 1` and `sa[0] == text.len()`;
/// otherwise fails with [`BWTError::InvalidSuffixArray`]. Does not itself
/// check for sentinel collision — that is the caller's responsibility (see
/// [`transform`]), since a suffix array can legitimately be constructed and
/// reused across multiple sentinel choices.
///
/// # Example
///
/// ```
/// use bwt_fm_index::data_structures::bwt::bwt_from_sa;
/// use bwt_fm_index::data_structures::suffix_array::suffix_array;
///
/// let text = b"GATGCGAGAGATG";
/// let sa = suffix_array(text);
/// let l = bwt_from_sa(text, &sa, b'$').unwrap();
/// assert_eq!(l, b"GGGGGGTCAA$TAA");
/// ```
pub fn bwt_from_sa(text: TextSlice, sa: &RawSuffixArray, sentinel: u8) -> Result<BWT, BWTError> {
    let n = text.len();
    if sa.len() != n + 1 || sa[0] != n {
        return Err(BWTError::InvalidSuffixArray);
    }

    let mut bwt = Vec::with_capacity(n + 1);
    bwt.push(if n == 0 { sentinel } else { text[n - 1] });
    for &pos in &sa[1..] {
        bwt.push(if pos == 0 { sentinel } else { text[pos - 1] });
    }
    Ok(bwt)
}

/// Reconstruct the original text from its Burrows-Wheeler transform `bwt`
/// and the `sentinel` byte it was built with.
///
/// Uses the textbook O(n^2 log n) repeated-stable-sort reconstruction:
/// prepend `bwt` as a new leftmost column to an n x n matrix of rows and
/// re-sort the rows, n times, then read off the row ending in `sentinel`.
/// Faster reconstructions exist (via the LF-mapping) but are out of scope —
/// this mirrors the reference implementation, which this crate's round-trip
/// tests hold it to.
///
/// # Example
///
/// ```
/// use bwt_fm_index::data_structures::bwt::inverse_transform;
///
/// let text = inverse_transform(b"ard$rcaaaabb", b'$');
/// assert_eq!(text, b"abracadabra");
/// ```
pub fn inverse_transform(bwt: &[u8], sentinel: u8) -> Vec<u8> {
    let n = bwt.len();
    let mut rows: Vec<Vec<u8>> = vec![Vec::with_capacity(n); n];

    for _ in 0..n {
        for (row, &byte) in rows.iter_mut().zip(bwt.iter()) {
            row.insert(0, byte);
        }
        rows.sort();
    }

    rows.into_iter()
        .find(|row| row.last() == Some(&sentinel))
        .map(|mut row| {
            row.pop();
            row
        })
        .unwrap_or_default()
}

/// Compute `C`: for every byte value, the number of occurrences of
/// lexicographically smaller bytes in `bwt` (equivalently in `F`, its sorted
/// form), counting the sentinel as present exactly once and smaller than
/// every byte in `alphabet`.
///
/// # Example
///
/// ```
/// use bwt_fm_index::alphabets::Alphabet;
/// use bwt_fm_index::data_structures::bwt::{less, transform};
///
/// let bwt = transform(b"abracadabra", b'$').unwrap();
/// let alphabet = Alphabet::new(bwt.iter().copied().filter(|&b| b != b'$'));
/// let c = less(&bwt, &alphabet);
/// assert_eq!(c[b'a' as usize], 1);
/// ```
pub fn less(bwt: &BWT, alphabet: &Alphabet) -> Less {
    let counts = count_of_letters(bwt, alphabet);
    let mut c: Less = [0; 256];
    // the sentinel is always present exactly once and sorts below every
    // byte in `alphabet`, so every symbol's C starts at 1.
    let mut cumulative = 1usize;
    for symbol in alphabet.iter() {
        c[symbol as usize] = cumulative;
        cumulative += counts[symbol as usize];
    }
    c
}

/// Frequency of each byte of `alphabet` in `bwt`, indexed by byte value.
pub fn count_of_letters(bwt: &BWT, alphabet: &Alphabet) -> [usize; 256] {
    let mut counts = [0usize; 256];
    for symbol in alphabet.iter() {
        counts[symbol as usize] = bytecount::count(bwt, symbol);
    }
    counts
}

/// The alphabet Σ of a BWT: its distinct bytes, excluding `sentinel`.
pub fn alphabet_of(bwt: &BWT, sentinel: u8) -> Alphabet {
    let mut alphabet = Alphabet::new(bwt.iter().copied());
    alphabet.symbols.remove(sentinel as usize);
    alphabet
}

/// The `F` column: `L` sorted ascending, i.e. the sentinel followed by every
/// symbol of `alphabet` repeated by its frequency in `bwt`.
pub fn f_column(bwt: &BWT, alphabet: &Alphabet, sentinel: u8) -> Vec<u8> {
    let counts = count_of_letters(bwt, alphabet);
    let mut f = Vec::with_capacity(bwt.len());
    f.push(sentinel);
    for symbol in alphabet.iter() {
        f.extend(std::iter::repeat(symbol).take(counts[symbol as usize]));
    }
    f
}

/// `Occ(c, k)`: the number of occurrences of byte `c` in `L[0..=k]`, for
/// every `c` in the alphabet. Stored as dense per-symbol arrays of length
/// `n+1`, built in a single pass over `L` (rather than growing each array
/// one element at a time, as the reference implementation does).
pub struct Occ {
    table: std::collections::HashMap<u8, Vec<usize>>,
}

impl Occ {
    /// Build the occurrence table of `bwt` over `alphabet`.
    ///
    /// # Example
    ///
    /// ```
    /// use bwt_fm_index::alphabets::Alphabet;
    /// use bwt_fm_index::data_structures::bwt::{transform, Occ};
    ///
    /// let bwt = transform(b"abracadabra", b'$').unwrap();
    /// let alphabet = Alphabet::new(bwt.iter().copied().filter(|&b| b != b'$'));
    /// let occ = Occ::new(&bwt, &alphabet);
    /// assert_eq!(occ.get(b'a', bwt.len() - 1), 5);
    /// ```
    pub fn new(bwt: &BWT, alphabet: &Alphabet) -> Self {
        let n1 = bwt.len();
        let mut table = std::collections::HashMap::with_capacity(alphabet.len());
        for symbol in alphabet.iter() {
            table.insert(symbol, vec![0usize; n1]);
        }

        for symbol in alphabet.iter() {
            let arr = table.get_mut(&symbol).unwrap();
            let mut running = 0usize;
            for (k, &byte) in bwt.iter().enumerate() {
                if byte == symbol {
                    running += 1;
                }
                arr[k] = running;
            }
        }

        Occ { table }
    }

    /// `Occ(c, k)`, the number of occurrences of `c` in `bwt[0..=k]`.
    /// Returns 0 for a byte outside the alphabet the table was built with.
    pub fn get(&self, c: u8, k: usize) -> usize {
        self.table.get(&c).map_or(0, |arr| arr[k])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_abracadabra() {
        let l = transform(b"abracadabra", b'$').unwrap();
        assert_eq!(l, b"ard$rcaaaabb");
    }

    #[test]
    fn test_transform_gatgcgagagatg() {
        let l = transform(b"GATGCGAGAGATG", b'$').unwrap();
        assert_eq!(l, b"GGGGGGTCAA$TAA");
    }

    // Exercised as a single test rather than split across several: the flag
    // is process-wide, so toggling it must not straddle test-thread
    // boundaries where another test could observe the wrong value.
    #[test]
    fn test_check_end_symbol_flag() {
        assert!(check_end_symbol());
        let err = transform(b"abc$def", b'$').unwrap_err();
        assert_eq!(err, BWTError::EndSymbolExisted);

        set_check_end_symbol(false);
        assert!(!check_end_symbol());
        assert!(transform(b"abc$def", b'$').is_ok());

        set_check_end_symbol(true);
        assert!(check_end_symbol());
    }

    #[test]
    fn test_bwt_from_sa_rejects_mismatched_length() {
        let text = b"abc";
        let bad_sa = vec![0, 1, 2];
        let err = bwt_from_sa(text, &bad_sa, b'$').unwrap_err();
        assert_eq!(err, BWTError::InvalidSuffixArray);
    }

    #[test]
    fn test_bwt_from_sa_rejects_wrong_sa0() {
        let text = b"abc";
        let bad_sa = vec![1, 0, 2, 3];
        let err = bwt_from_sa(text, &bad_sa, b'$').unwrap_err();
        assert_eq!(err, BWTError::InvalidSuffixArray);
    }

    #[test]
    fn test_round_trip() {
        let text: &[u8] = b"abracadabra";
        let l = transform(text, b'$').unwrap();
        assert_eq!(inverse_transform(&l, b'$'), text);
    }

    #[test]
    fn test_less_and_occ() {
        let bwt = transform(b"abracadabra", b'$').unwrap();
        let alphabet = alphabet_of(&bwt, b'$');
        let c = less(&bwt, &alphabet);
        // C['a'] is 1: only the sentinel sorts before 'a'.
        assert_eq!(c[b'a' as usize], 1);
        // C['b'] is 1 + freq('a') = 1 + 5 = 6.
        assert_eq!(c[b'b' as usize], 6);

        let occ = Occ::new(&bwt, &alphabet);
        assert_eq!(occ.get(b'a', bwt.len() - 1), 5);
        assert_eq!(occ.get(b'b', bwt.len() - 1), 2);
    }

    #[test]
    fn test_f_column_is_sorted_bwt() {
        let bwt = transform(b"abracadabra", b'$').unwrap();
        let alphabet = alphabet_of(&bwt, b'$');
        let f = f_column(&bwt, &alphabet, b'$');
        let mut sorted_bwt = bwt.clone();
        sorted_bwt.sort();
        assert_eq!(f, sorted_bwt);
    }

    proptest::proptest! {
        #[test]
        fn prop_round_trip(text in proptest::collection::vec(1u8..255, 0..150)) {
            let l = transform(&text, 0).unwrap();
            proptest::prop_assert_eq!(inverse_transform(&l, 0), text);
        }
    }
}
