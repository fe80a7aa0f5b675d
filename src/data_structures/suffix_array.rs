// Copyright 2014-2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Suffix array construction.
//!
//! The suffix array of a text `T` of length `n` is the array of starting
//! positions of the suffixes of the sentinel-extended text `T$`, sorted
//! ascending, with `$` treated as strictly smaller than every other byte.
//! `SA[0]` is always `n`, the position of the (implicit) sentinel.

use itertools::Itertools;

use crate::utils::TextSlice;

/// A suffix array stored in full (no sampling), as `Vec<usize>`.
pub type RawSuffixArray = Vec<usize>;

/// Compute the suffix array of `text` over the sentinel-extended text `T$`.
///
/// The sentinel itself is never materialized in `text`; it is represented
/// internally as a rank strictly below every byte value, which reproduces
/// the "`$` sorts first" rule without requiring the caller to pick an
/// unused byte up front. Complexity: O(n log^2 n) via prefix doubling.
///
/// # Example
///
/// ```
/// use bwt_fm_index::data_structures::suffix_array::suffix_array;
///
/// let sa = suffix_array(b"mississippi");
/// assert_eq!(sa, vec![11, 10, 7, 4, 1, 0, 9, 8, 6, 3, 5, 2]);
/// ```
pub fn suffix_array(text: TextSlice) -> RawSuffixArray {
    let n = text.len();
    let total = n + 1;

    // rank[i] is the current equivalence class of the suffix starting at i
    // of the sentinel-extended text; the sentinel (position n) starts with
    // rank -1, strictly below every real byte value (0..=255).
    let mut rank: Vec<i32> = Vec::with_capacity(total);
    rank.extend(text.iter().map(|&b| b as i32));
    rank.push(-1);

    let mut sa: RawSuffixArray = (0..total).collect();

    if total == 1 {
        return sa;
    }

    let mut k = 1usize;
    let mut tmp = vec![0i32; total];
    loop {
        let second_key = |i: usize| -> i32 {
            if i + k < total {
                rank[i + k]
            } else {
                -2
            }
        };

        sa.sort_by_key(|&i| (rank[i], second_key(i)));

        tmp[sa[0]] = 0;
        for (prev, cur) in sa.iter().tuple_windows() {
            let same = rank[*prev] == rank[*cur] && second_key(*prev) == second_key(*cur);
            tmp[*cur] = tmp[*prev] + if same { 0 } else { 1 };
        }
        rank.copy_from_slice(&tmp);

        if rank[sa[total - 1]] as usize == total - 1 {
            break;
        }
        if k >= total {
            break;
        }
        k *= 2;
    }

    sa
}
