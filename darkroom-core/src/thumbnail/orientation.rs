use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Which EXIF orientation values get corrected before resizing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrientationPolicy {
    /// All eight EXIF values, mirrored variants included.
    #[default]
    Full,
    /// Only the pure rotations (3, 6, 8). Mirrored sources are left as
    /// stored.
    RotationsOnly,
}

/// EXIF orientation tag (0x0112) values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Normal,
    MirroredHorizontal,
    Rotated180,
    MirroredVertical,
    /// Mirrored horizontally, then rotated 270 CW.
    Transposed,
    /// Needs a 90 CW rotation to display upright.
    Rotated90,
    /// Mirrored horizontally, then rotated 90 CW.
    Transversed,
    /// Needs a 270 CW rotation to display upright.
    Rotated270,
}

impl Orientation {
    pub fn from_exif_value(value: u32) -> Self {
        match value {
            2 => Self::MirroredHorizontal,
            3 => Self::Rotated180,
            4 => Self::MirroredVertical,
            5 => Self::Transposed,
            6 => Self::Rotated90,
            7 => Self::Transversed,
            8 => Self::Rotated270,
            _ => Self::Normal,
        }
    }

    /// Orientation recorded in the EXIF block of an encoded image. Sources
    /// without a readable tag are treated as upright.
    pub fn from_encoded(bytes: &[u8]) -> Self {
        let Ok(exif) = Reader::new().read_from_container(&mut Cursor::new(bytes))
        else {
            return Self::Normal;
        };

        exif.get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .map(Self::from_exif_value)
            .unwrap_or_default()
    }

    pub fn is_mirrored(&self) -> bool {
        matches!(
            self,
            Self::MirroredHorizontal
                | Self::MirroredVertical
                | Self::Transposed
                | Self::Transversed
        )
    }

    /// Rotate/flip `img` upright according to `policy`.
    #[must_use]
    pub fn correct(self, img: DynamicImage, policy: OrientationPolicy) -> DynamicImage {
        if policy == OrientationPolicy::RotationsOnly && self.is_mirrored() {
            return img;
        }

        match self {
            Self::Normal => img,
            Self::MirroredHorizontal => img.fliph(),
            Self::Rotated180 => img.rotate180(),
            Self::MirroredVertical => img.flipv(),
            Self::Transposed => img.fliph().rotate270(),
            Self::Rotated90 => img.rotate90(),
            Self::Transversed => img.fliph().rotate90(),
            Self::Rotated270 => img.rotate270(),
        }
    }
}
