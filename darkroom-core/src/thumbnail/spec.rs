use std::fmt;

use serde::{Deserialize, Serialize};

/// A sizing profile every processable asset gets a derived artifact for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThumbnailSpec {
    pub width: u32,
    pub height: u32,
    /// Keep portrait sources portrait by swapping the box to match the
    /// source's orientation class. When false every output is exactly
    /// `width x height`.
    #[serde(default)]
    pub preserve_orientation: bool,
}

impl ThumbnailSpec {
    pub const fn new(width: u32, height: u32, preserve_orientation: bool) -> Self {
        Self {
            width,
            height,
            preserve_orientation,
        }
    }

    /// Directory name partitioning this spec's artifacts. Includes the sizing
    /// policy so two specs sharing a pixel box never share a slot.
    pub fn cache_key(&self) -> String {
        if self.preserve_orientation {
            format!("{}x{}-oriented", self.width, self.height)
        } else {
            format!("{}x{}", self.width, self.height)
        }
    }

    /// Output dimensions for an (orientation-corrected) source.
    pub fn target_dimensions(&self, src_width: u32, src_height: u32) -> (u32, u32) {
        if !self.preserve_orientation {
            return (self.width, self.height);
        }

        let longest = self.width.max(self.height);
        let shortest = self.width.min(self.height);
        if src_width > src_height {
            (longest, shortest)
        } else {
            (shortest, longest)
        }
    }
}

impl fmt::Display for ThumbnailSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_box_ignores_source_shape() {
        let spec = ThumbnailSpec::new(320, 240, false);
        assert_eq!(spec.target_dimensions(4000, 3000), (320, 240));
        assert_eq!(spec.target_dimensions(3000, 4000), (320, 240));
        assert_eq!(spec.target_dimensions(10, 10), (320, 240));
    }

    #[test]
    fn oriented_box_follows_source_shape() {
        let spec = ThumbnailSpec::new(1024, 768, true);
        assert_eq!(spec.target_dimensions(6000, 4000), (1024, 768));
        assert_eq!(spec.target_dimensions(4000, 6000), (768, 1024));
        // square sources count as portrait
        assert_eq!(spec.target_dimensions(500, 500), (768, 1024));

        // box given portrait-first still yields landscape for landscape input
        let flipped = ThumbnailSpec::new(768, 1024, true);
        assert_eq!(flipped.target_dimensions(6000, 4000), (1024, 768));
    }

    #[test]
    fn cache_keys_separate_policies() {
        let fill = ThumbnailSpec::new(320, 240, false);
        let oriented = ThumbnailSpec::new(320, 240, true);
        assert_eq!(fill.cache_key(), "320x240");
        assert_eq!(oriented.cache_key(), "320x240-oriented");
        assert_ne!(fill.cache_key(), oriented.cache_key());
    }
}
