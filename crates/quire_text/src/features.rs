//! Feature lists of dynamic styles
//!
//! All dynamic styles keep their features in one contiguous array so the
//! whole list can be handed to the shaper as slices without per-style
//! allocations. There are never holes in the array: a list that changes
//! size is removed and re-appended at the end.

use crate::shaper::TextFeatureValue;

#[derive(Debug, Clone, Default)]
pub(crate) struct FeatureAllocator {
    features: Vec<TextFeatureValue>,
    /// Offset and count of each style's slice
    ranges: Vec<(u32, u32)>,
}

impl FeatureAllocator {
    pub fn new(style_count: u32) -> Self {
        Self {
            features: Vec::new(),
            ranges: vec![(0, 0); style_count as usize],
        }
    }

    /// Offset and count of a style's features in [`Self::all`]
    pub fn range(&self, style: u32) -> (u32, u32) {
        self.ranges[style as usize]
    }

    pub fn features(&self, style: u32) -> &[TextFeatureValue] {
        let (offset, count) = self.ranges[style as usize];
        &self.features[offset as usize..(offset + count) as usize]
    }

    pub fn all(&self) -> &[TextFeatureValue] {
        &self.features
    }

    /// Replace the features of a style
    ///
    /// Same-sized lists are overwritten in place. Otherwise the old slice
    /// is removed, slices after it move down by its size and the new list
    /// is appended at the end.
    pub fn set(&mut self, style: u32, features: &[TextFeatureValue]) {
        let (offset, count) = self.ranges[style as usize];
        if count as usize == features.len() {
            self.features[offset as usize..(offset + count) as usize].copy_from_slice(features);
            return;
        }

        self.features.drain(offset as usize..(offset + count) as usize);
        for range in &mut self.ranges {
            if range.0 > offset {
                range.0 -= count;
            }
        }
        self.ranges[style as usize] = (self.features.len() as u32, features.len() as u32);
        self.features.extend_from_slice(features);
    }
}
