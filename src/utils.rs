// Copyright 2014-2016 Johannes Köster.
// Licensed under the MIT license (http://opensource.org/licenses/MIT)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Small shared type aliases used across the `data_structures` modules.

/// A borrowed byte sequence. Text is treated as opaque bytes throughout this
/// crate; there is no notion of encoding or of a particular alphabet beyond
/// what `data_structures::bwt::less` computes from it.
pub type TextSlice<'a> = &'a [u8];
