// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Setting identification.

use core::fmt;

/// A dense handle for a setting within a [`SettingTable`](crate::SettingTable).
///
/// Ids are assigned in declaration order, starting at zero, and index directly
/// into the per-setting tables of a compiled
/// [`DependencyGraph`](crate::DependencyGraph). An id is only meaningful for
/// the table that produced it.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SettingId(u32);

impl SettingId {
    pub(crate) fn new(index: usize) -> Self {
        Self(u32::try_from(index).expect("too many settings for SettingId (u32)"))
    }

    /// Returns this id as a `usize` index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the raw numeric id.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for SettingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SettingId").field(&self.0).finish()
    }
}

impl fmt::Display for SettingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
