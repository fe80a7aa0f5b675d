// Copyright 2014-2016 Johannes Köster, Taylor Cramer.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! FM-Index for exact and bounded-mismatch substring search in linear-ish
//! time, built on a suffix array, its Burrows-Wheeler transform, and the
//! `C`/`Occ` rank tables.

use std::collections::BTreeSet;
use std::fmt;

use crate::alphabets::Alphabet;
use crate::data_structures::bwt::{
    alphabet_of, bwt_from_sa, check_end_symbol, count_of_letters, f_column, less, BWTError, Less,
    Occ, BWT,
};
use crate::data_structures::suffix_array::{suffix_array, RawSuffixArray};
use crate::utils::TextSlice;

const DEFAULT_SENTINEL: u8 = b'$';

/// Errors raised while constructing an [`FMIndex`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FMIndexError {
    /// `build` was called with a zero-length text.
    #[error("text must not be empty")]
    EmptySeq,
    /// The text already contains the sentinel byte (see
    /// [`check_end_symbol`]).
    #[error("text contains the end-symbol/sentinel byte")]
    EndSymbolExisted,
}

/// An explicit stack frame of the bounded-mismatch backward search: the
/// as-yet-unconsumed prefix of the pattern, the SA interval `[start, end]`
/// (inclusive) matching the suffix already consumed, and the remaining
/// mismatch budget.
#[derive(Clone, Debug)]
struct SearchFrame<'p> {
    query: &'p [u8],
    start: usize,
    end: usize,
    mismatches: usize,
}

/// The Ferragina-Manzini index (Ferragina & Manzini, 2000) for counting,
/// testing, and locating occurrences of a pattern in a text, allowing up to
/// `k` substitution mismatches.
///
/// Built once via [`FMIndex::build`] and immutable thereafter; there is no
/// "unbuilt" state reachable through the public API.
pub struct FMIndex {
    sentinel: u8,
    sa: RawSuffixArray,
    bwt: BWT,
    f: Vec<u8>,
    alphabet: Alphabet,
    count_of_letters: [usize; 256],
    less: Less,
    occ: Occ,
}

impl FMIndex {
    /// Build an index over `text` using the default sentinel byte (`$`).
    ///
    /// # Example
    ///
    /// ```
    /// use bwt_fm_index::data_structures::fmindex::FMIndex;
    ///
    /// let fm = FMIndex::build(b"abracadabra").unwrap();
    /// assert_eq!(fm.count(b"bra"), 2);
    /// ```
    pub fn build(text: TextSlice) -> Result<Self, FMIndexError> {
        Self::build_with_sentinel(text, DEFAULT_SENTINEL)
    }

    /// Build an index over `text` using an explicit `sentinel` byte.
    ///
    /// Fails with [`FMIndexError::EmptySeq`] if `text` is empty, or with
    /// [`FMIndexError::EndSymbolExisted`] if `text` contains `sentinel` and
    /// [`check_end_symbol`] is enabled.
    pub fn build_with_sentinel(text: TextSlice, sentinel: u8) -> Result<Self, FMIndexError> {
        if text.is_empty() {
            return Err(FMIndexError::EmptySeq);
        }
        if check_end_symbol() && text.contains(&sentinel) {
            return Err(FMIndexError::EndSymbolExisted);
        }

        let sa = suffix_array(text);
        let bwt = match bwt_from_sa(text, &sa, sentinel) {
            Ok(bwt) => bwt,
            // `sa` was just built for this exact `text`, so it is always
            // consistent with it; this branch is unreachable.
            Err(BWTError::InvalidSuffixArray) => {
                unreachable!("suffix_array produced an invalid SA")
            }
            Err(BWTError::EndSymbolExisted) => unreachable!("sentinel collision already checked"),
        };

        let alphabet = alphabet_of(&bwt, sentinel);
        let count_of_letters = count_of_letters(&bwt, &alphabet);
        let f = f_column(&bwt, &alphabet, sentinel);
        let less = less(&bwt, &alphabet);
        let occ = Occ::new(&bwt, &alphabet);

        Ok(FMIndex {
            sentinel,
            sa,
            bwt,
            f,
            alphabet,
            count_of_letters,
            less,
            occ,
        })
    }

    /// Length of the sentinel-extended text (`n + 1`).
    pub fn len(&self) -> usize {
        self.bwt.len()
    }

    /// Always `false`: a built index always has at least the sentinel.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The underlying suffix array, `SA[0] == len(text)`.
    pub fn suffix_array(&self) -> &RawSuffixArray {
        &self.sa
    }

    /// The Burrows-Wheeler transform `L`.
    pub fn bwt(&self) -> &BWT {
        &self.bwt
    }

    /// The alphabet Σ (distinct bytes of `L`, excluding the sentinel).
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Last-to-First mapping: the row whose first column corresponds to
    /// `L[i]`.
    ///
    /// # Example
    ///
    /// ```
    /// use bwt_fm_index::data_structures::fmindex::FMIndex;
    ///
    /// let fm = FMIndex::build(b"abracadabra").unwrap();
    /// let mut seen = std::collections::BTreeSet::new();
    /// for i in 0..fm.len() {
    ///     seen.insert(fm.last_to_first(i));
    /// }
    /// assert_eq!(seen.len(), fm.len());
    /// ```
    pub fn last_to_first(&self, i: usize) -> usize {
        let c = self.bwt[i];
        self.less[c as usize] + self.occ.get(c, i) - 1
    }

    /// Count the number of exact occurrences of `pattern` in the text.
    ///
    /// Returns 0 for the empty pattern and for a pattern containing a byte
    /// outside Σ.
    ///
    /// # Example
    ///
    /// ```
    /// use bwt_fm_index::data_structures::fmindex::FMIndex;
    ///
    /// let fm = FMIndex::build(b"abracadabra").unwrap();
    /// assert_eq!(fm.count(b"a"), 5);
    /// assert_eq!(fm.count(b"b"), 2);
    /// ```
    pub fn count(&self, pattern: &[u8]) -> usize {
        if pattern.is_empty() {
            return 0;
        }
        match self.interval(pattern) {
            Some((sp, ep)) => ep + 1 - sp,
            None => 0,
        }
    }

    /// Exact backward search, returning the inclusive `[start, end]` SA
    /// interval of `pattern`, or `None` if it does not occur.
    fn interval(&self, pattern: &[u8]) -> Option<(usize, usize)> {
        let m = pattern.len();
        let c = pattern[m - 1];
        if !self.alphabet.symbols.contains(c as usize) {
            return None;
        }
        let mut sp = self.less[c as usize];
        let mut ep = self.less[c as usize] + self.count_of_letters[c as usize] - 1;

        for &c in pattern[..m - 1].iter().rev() {
            if !self.alphabet.symbols.contains(c as usize) {
                return None;
            }
            let occ_sp_minus_1 = if sp == 0 { 0 } else { self.occ.get(c, sp - 1) };
            sp = self.less[c as usize] + occ_sp_minus_1;
            ep = self.less[c as usize] + self.occ.get(c, ep) - 1;
            if sp > ep {
                return None;
            }
        }
        Some((sp, ep))
    }

    /// Does `pattern` occur in the text with at most `k` substitution
    /// mismatches?
    ///
    /// Short-circuits on the first hit found by the same bounded-mismatch
    /// backward search that backs [`FMIndex::locate`], rather than
    /// enumerating every occurrence.
    pub fn matches(&self, pattern: &[u8], k: usize) -> bool {
        if pattern.is_empty() || !self.pattern_in_alphabet(pattern) {
            return false;
        }
        let mut found = false;
        let mut stack = vec![SearchFrame {
            query: pattern,
            start: 0,
            end: self.len() - 1,
            mismatches: k,
        }];
        while !found {
            let frame = match stack.pop() {
                Some(frame) => frame,
                None => break,
            };
            self.step(&frame, &mut stack, &mut |_| {
                found = true;
                true
            });
        }
        found
    }

    /// Locate every occurrence of `pattern` allowing up to `k` substitution
    /// mismatches, as a sorted list of unique start offsets.
    ///
    /// Returns an empty list for the empty pattern. Also returns an empty
    /// list whenever any distinct byte of `pattern` lies outside Σ — even
    /// for `k >= 1` — which is a direct, deliberate carry-over of the
    /// reference implementation's behavior: one might expect a mismatch
    /// budget to "absorb" an unknown byte, but the reference short-circuits
    /// unconditionally, and this crate preserves that for bit-exact parity.
    ///
    /// # Example
    ///
    /// ```
    /// use bwt_fm_index::data_structures::fmindex::FMIndex;
    ///
    /// let fm = FMIndex::build(b"abcabd").unwrap();
    /// assert_eq!(fm.locate(b"abc", 1), vec![0, 3]);
    /// assert_eq!(fm.locate(b"bc", 0), vec![1]);
    /// assert_eq!(fm.locate(b"bc", 1), vec![1, 4]);
    /// ```
    pub fn locate(&self, pattern: &[u8], k: usize) -> Vec<usize> {
        if pattern.is_empty() || !self.pattern_in_alphabet(pattern) {
            return Vec::new();
        }

        let mut offsets = BTreeSet::new();
        let mut stack = vec![SearchFrame {
            query: pattern,
            start: 0,
            end: self.len() - 1,
            mismatches: k,
        }];

        while let Some(frame) = stack.pop() {
            self.step(&frame, &mut stack, &mut |offset| {
                offsets.insert(offset);
                false
            });
        }

        offsets.into_iter().collect()
    }

    fn pattern_in_alphabet(&self, pattern: &[u8]) -> bool {
        pattern
            .iter()
            .all(|&b| self.alphabet.symbols.contains(b as usize))
    }

    /// Expand one frame of the bounded-mismatch backward search: try every
    /// candidate byte for the next (leftward) position of the pattern,
    /// narrowing the SA interval via the LF-mapping. A candidate that
    /// empties the interval is pruned immediately (the essential speedup
    /// over a brute-force scan). When the whole pattern has been consumed,
    /// every SA position in the final interval is a hit, reported one at a
    /// time through `on_hit`.
    ///
    /// `on_hit` returns `true` to stop the search early (used by
    /// [`FMIndex::matches`]); this method then stops expanding further
    /// candidates and returns immediately.
    fn step<'p>(
        &self,
        frame: &SearchFrame<'p>,
        stack: &mut Vec<SearchFrame<'p>>,
        on_hit: &mut dyn FnMut(usize) -> bool,
    ) {
        let last = frame.query[frame.query.len() - 1];
        let rest = &frame.query[..frame.query.len() - 1];

        let candidates: Vec<u8> = if frame.mismatches == 0 {
            vec![last]
        } else {
            self.alphabet.symbols_vec()
        };

        for c in candidates {
            let occ_start = if frame.start > 0 {
                self.occ.get(c, frame.start - 1)
            } else {
                0
            };
            let new_start = self.less[c as usize] + occ_start;
            let new_end = self.less[c as usize] + self.occ.get(c, frame.end) - 1;
            if new_start > new_end {
                continue;
            }

            if rest.is_empty() {
                for i in new_start..=new_end {
                    if on_hit(self.sa[i]) {
                        return;
                    }
                }
            } else {
                let next_mismatches = if c == last {
                    frame.mismatches
                } else {
                    frame.mismatches.saturating_sub(1)
                };
                stack.push(SearchFrame {
                    query: rest,
                    start: new_start,
                    end: new_end,
                    mismatches: next_mismatches,
                });
            }
        }
    }
}

impl fmt::Display for FMIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "EndSymbol: {}", self.sentinel as char)?;
        writeln!(f, "BWT: {}", String::from_utf8_lossy(&self.bwt))?;
        writeln!(
            f,
            "Alphabet: {}",
            String::from_utf8_lossy(&self.alphabet.symbols_vec())
        )?;
        writeln!(f, "F: {}", String::from_utf8_lossy(&self.f))?;
        writeln!(f, "C:")?;
        for symbol in self.alphabet.iter() {
            writeln!(f, "  {}: {}", symbol as char, self.less[symbol as usize])?;
        }
        writeln!(f, "Occ:")?;
        writeln!(
            f,
            "  BWT[{}]",
            self.bwt
                .iter()
                .map(|&b| (b as char).to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )?;
        for symbol in self.alphabet.iter() {
            let row: Vec<String> = (0..self.len())
                .map(|k| self.occ.get(symbol, k).to_string())
                .collect();
            writeln!(f, "  {}: [{}]", symbol as char, row.join(", "))?;
        }
        write!(f, "SA: {:?}", self.sa)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count() {
        let fm = FMIndex::build(b"abracadabra").unwrap();
        assert_eq!(fm.count(b"bra"), 2);
        assert_eq!(fm.count(b"a"), 5);
        assert_eq!(fm.count(b"b"), 2);
        assert_eq!(fm.count(b"xyz"), 0);
        assert_eq!(fm.count(b""), 0);
    }

    #[test]
    fn test_locate_abracadabra() {
        let fm = FMIndex::build(b"abracadabra").unwrap();
        assert_eq!(fm.locate(b"ab", 0), vec![0, 7]);
    }

    #[test]
    fn test_locate_mississippi() {
        let fm = FMIndex::build(b"mississippi").unwrap();
        assert_eq!(
            fm.suffix_array(),
            &vec![11, 10, 7, 4, 1, 0, 9, 8, 6, 3, 5, 2]
        );
        assert_eq!(fm.locate(b"iss", 0), vec![1, 4]);
    }

    #[test]
    fn test_locate_gatgcgagagatg() {
        let fm = FMIndex::build(b"GATGCGAGAGATG").unwrap();
        assert_eq!(fm.bwt(), b"GGGGGGTCAA$TAA");
        assert_eq!(fm.locate(b"GAGA", 0), vec![5, 7]);
    }

    #[test]
    fn test_locate_with_mismatches_abcabd() {
        let fm = FMIndex::build(b"abcabd").unwrap();
        assert_eq!(fm.locate(b"abc", 1), vec![0, 3]);
        assert_eq!(fm.locate(b"abd", 1), vec![0, 3]);
        assert_eq!(fm.locate(b"bc", 0), vec![1]);
        assert_eq!(fm.locate(b"bc", 1), vec![1, 4]);
    }

    #[test]
    fn test_locate_with_mismatches_acctatac() {
        let fm = FMIndex::build(b"acctatac").unwrap();
        assert_eq!(fm.locate(b"tac", 0), vec![5]);
        assert_eq!(fm.locate(b"tac", 1), vec![3, 5]);
        assert_eq!(fm.locate(b"acctatac", 1), vec![0]);
        assert_eq!(fm.locate(b"cctatac", 1), vec![1]);
        assert_eq!(fm.locate(b"caa", 2), vec![1, 2, 3, 4, 5]);
        assert_eq!(fm.locate(b"caa", 3), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_locate_repeated_pattern() {
        let fm = FMIndex::build(b"abcabcabc").unwrap();
        assert_eq!(fm.locate(b"abc", 0), vec![0, 3, 6]);
        assert_eq!(fm.locate(b"gef", 0), Vec::<usize>::new());
    }

    #[test]
    fn test_build_rejects_empty() {
        assert_eq!(FMIndex::build(b"").unwrap_err(), FMIndexError::EmptySeq);
    }

    #[test]
    fn test_build_rejects_sentinel_in_text() {
        assert_eq!(
            FMIndex::build(b"abc$def").unwrap_err(),
            FMIndexError::EndSymbolExisted
        );
    }

    #[test]
    fn test_out_of_alphabet_pattern_is_empty_even_with_mismatches() {
        let fm = FMIndex::build(b"abcabcabc").unwrap();
        assert_eq!(fm.locate(b"xyz", 3), Vec::<usize>::new());
        assert!(!fm.matches(b"xyz", 3));
    }

    #[test]
    fn test_matches() {
        let fm = FMIndex::build(b"acctatac").unwrap();
        assert!(fm.matches(b"tac", 0));
        assert!(!fm.matches(b"xyz", 0));
        assert!(fm.matches(b"caa", 2));
    }

    #[test]
    fn test_last_to_first_is_a_permutation() {
        let fm = FMIndex::build(b"abracadabra").unwrap();
        let mut seen: Vec<usize> = (0..fm.len()).map(|i| fm.last_to_first(i)).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..fm.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_locate_k0_matches_count_and_is_increasing() {
        let fm = FMIndex::build(b"abracadabra").unwrap();
        for pattern in [&b"a"[..], b"ab", b"bra", b"abra"] {
            let located = fm.locate(pattern, 0);
            assert_eq!(located.len(), fm.count(pattern));
            assert!(located.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_display_contains_expected_sections() {
        let fm = FMIndex::build(b"abracadabra").unwrap();
        let rendered = format!("{}", fm);
        assert!(rendered.contains("EndSymbol: $"));
        assert!(rendered.contains("BWT: ard$rcaaaabb"));
        assert!(rendered.contains("Alphabet:"));
        assert!(rendered.contains("C:"));
        assert!(rendered.contains("Occ:"));
        assert!(rendered.contains("BWT[a, r, d, $, r, c, a, a, a, a, b, b]"));
        assert!(rendered.contains("SA:"));
    }

    proptest::proptest! {
        #[test]
        fn prop_locate_k0_matches_naive_count(
            text in proptest::collection::vec(1u8..4, 1..60),
            pat_start in 0usize..40,
            pat_len in 1usize..6,
        ) {
            let fm = FMIndex::build(&text).unwrap();
            let start = pat_start % text.len();
            let len = pat_len.min(text.len() - start).max(1);
            let pattern = &text[start..start + len];

            let naive = text.windows(pattern.len()).filter(|w| *w == pattern).count();
            proptest::prop_assert_eq!(fm.count(pattern), naive);
            proptest::prop_assert_eq!(fm.locate(pattern, 0).len(), naive);
        }

        #[test]
        fn prop_locate_is_monotone_in_k(
            text in proptest::collection::vec(1u8..4, 1..40),
            pat_start in 0usize..30,
            pat_len in 1usize..5,
        ) {
            let fm = FMIndex::build(&text).unwrap();
            let start = pat_start % text.len();
            let len = pat_len.min(text.len() - start).max(1);
            let pattern = &text[start..start + len];

            let k0 = fm.locate(pattern, 0);
            let k1 = fm.locate(pattern, 1);
            proptest::prop_assert!(k0.iter().all(|o| k1.contains(o)));
        }
    }
}
