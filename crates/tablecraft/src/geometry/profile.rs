//! Edge profiles and the bevel each one produces.
//!
//! A profile is a named edge treatment from the stone mason's catalog. The
//! solid builder only understands a [`BevelDescriptor`]: how far the bevel
//! reaches in from the silhouette (`bevel_size`), how far it reaches down the
//! edge (`bevel_thickness`), and how many steps approximate the curve.
//!
//! ```text
//!   standard     pencil-round   shark-nose    bullnose      eased
//!   ┌──────      ╭──────        ╭──────       ╭──────       ┌╴──────
//!   │            │              │             (             │
//!   └──────      ╰──────        ╰──────       ╰──────       └╴──────
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Upper bound on bevel steps for any profile.
pub const MAX_BEVEL_SEGMENTS: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeProfile {
    #[default]
    #[serde(alias = "straight")]
    Standard,
    PencilRound,
    SharkNose,
    #[serde(alias = "bull-nose")]
    Bullnose,
    Eased,
}

impl EdgeProfile {
    pub const ALL: [Self; 5] = [
        Self::Standard,
        Self::PencilRound,
        Self::SharkNose,
        Self::Bullnose,
        Self::Eased,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::PencilRound => "pencil-round",
            Self::SharkNose => "shark-nose",
            Self::Bullnose => "bullnose",
            Self::Eased => "eased",
        }
    }

    /// Label shown in the configuration summary.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::PencilRound => "Pencil Round",
            Self::SharkNose => "Shark Nose",
            Self::Bullnose => "Bullnose",
            Self::Eased => "Eased",
        }
    }
}

impl fmt::Display for EdgeProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown edge profile `{0}`")]
pub struct UnknownProfile(pub String);

impl FromStr for EdgeProfile {
    type Err = UnknownProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "straight" => Ok(Self::Standard),
            "pencil-round" | "pencil" => Ok(Self::PencilRound),
            "shark-nose" => Ok(Self::SharkNose),
            "bullnose" | "bull-nose" => Ok(Self::Bullnose),
            "eased" => Ok(Self::Eased),
            _ => Err(UnknownProfile(s.to_string())),
        }
    }
}

/// Bevel parameters in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BevelDescriptor {
    pub bevel_size: f32,
    pub bevel_thickness: f32,
    pub bevel_segments: u32,
}

impl BevelDescriptor {
    pub const FLAT: Self = Self {
        bevel_size: 0.0,
        bevel_thickness: 0.0,
        bevel_segments: 0,
    };

    /// True when there is no bevel to build.
    pub fn is_flat(&self) -> bool {
        self.bevel_segments == 0 || self.bevel_size <= 0.0 || self.bevel_thickness <= 0.0
    }
}

#[derive(Clone, Copy)]
enum Extent {
    /// Fraction of the panel thickness.
    Ratio(f32),
    /// Absolute millimeters, independent of thickness.
    Millimeters(f32),
}

impl Extent {
    fn resolve(self, thickness: f32) -> f32 {
        match self {
            Self::Ratio(r) => r * thickness,
            Self::Millimeters(mm) => mm / 1000.0,
        }
    }
}

struct ProfileRule {
    size: Extent,
    thickness: Extent,
    segments: u32,
}

fn rule(profile: EdgeProfile) -> Option<ProfileRule> {
    use Extent::*;
    let rule = match profile {
        EdgeProfile::Standard => return None,
        EdgeProfile::PencilRound => ProfileRule {
            size: Millimeters(3.0),
            thickness: Ratio(0.2),
            segments: 32,
        },
        EdgeProfile::SharkNose => ProfileRule {
            size: Ratio(0.05),
            thickness: Ratio(0.5),
            segments: 16,
        },
        EdgeProfile::Bullnose => ProfileRule {
            size: Ratio(0.5),
            thickness: Ratio(0.5),
            segments: MAX_BEVEL_SEGMENTS,
        },
        EdgeProfile::Eased => ProfileRule {
            size: Millimeters(1.5),
            thickness: Millimeters(1.5),
            segments: 24,
        },
    };
    Some(rule)
}

/// Map a profile to its bevel for a panel `thickness` meters thick.
///
/// Non-positive or non-finite thickness gives a flat edge.
pub fn profile_to_bevel(profile: EdgeProfile, thickness: f32) -> BevelDescriptor {
    if !thickness.is_finite() || thickness <= 0.0 {
        return BevelDescriptor::FLAT;
    }
    match rule(profile) {
        None => BevelDescriptor::FLAT,
        Some(rule) => BevelDescriptor {
            bevel_size: rule.size.resolve(thickness),
            bevel_thickness: rule.thickness.resolve(thickness),
            bevel_segments: rule.segments,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_is_flat_for_any_thickness() {
        for t in [0.02, 0.03, 0.1, 1.0] {
            let bevel = profile_to_bevel(EdgeProfile::Standard, t);
            assert_eq!(bevel, BevelDescriptor::FLAT, "thickness {t}");
            assert!(bevel.is_flat());
        }
    }

    #[test]
    fn bullnose_at_20mm_is_half_round() {
        let bevel = profile_to_bevel(EdgeProfile::Bullnose, 0.020);
        assert!((bevel.bevel_size - 0.010).abs() < 1e-6, "size {}", bevel.bevel_size);
        assert!((bevel.bevel_thickness - 0.010).abs() < 1e-6, "thickness {}", bevel.bevel_thickness);
        assert_eq!(bevel.bevel_segments, 64);
    }

    #[test]
    fn millimeter_constants_ignore_thickness() {
        for t in [0.02, 0.03] {
            let eased = profile_to_bevel(EdgeProfile::Eased, t);
            assert!((eased.bevel_size - 0.0015).abs() < 1e-7);
            assert!((eased.bevel_thickness - 0.0015).abs() < 1e-7);
            let pencil = profile_to_bevel(EdgeProfile::PencilRound, t);
            assert!((pencil.bevel_size - 0.003).abs() < 1e-7, "pencil offset is fixed");
            assert!((pencil.bevel_thickness - 0.2 * t).abs() < 1e-7, "pencil depth scales");
        }
    }

    #[test]
    fn bevelled_profiles_stay_within_segment_range() {
        for profile in EdgeProfile::ALL.into_iter().filter(|p| *p != EdgeProfile::Standard) {
            let bevel = profile_to_bevel(profile, 0.03);
            assert!(
                (8..=MAX_BEVEL_SEGMENTS).contains(&bevel.bevel_segments),
                "{profile}: {} segments",
                bevel.bevel_segments
            );
            assert!(!bevel.is_flat(), "{profile} should bevel");
            assert!(2.0 * bevel.bevel_thickness <= 0.03 + 1e-6, "{profile} fits the panel");
        }
    }

    #[test]
    fn mapping_is_deterministic() {
        for profile in EdgeProfile::ALL {
            assert_eq!(profile_to_bevel(profile, 0.02), profile_to_bevel(profile, 0.02));
        }
    }

    #[test]
    fn bad_thickness_gives_flat_edge() {
        assert!(profile_to_bevel(EdgeProfile::Bullnose, 0.0).is_flat());
        assert!(profile_to_bevel(EdgeProfile::Bullnose, f32::NAN).is_flat());
    }

    #[test]
    fn parses_original_identifiers() {
        assert_eq!("straight".parse::<EdgeProfile>().unwrap(), EdgeProfile::Standard);
        assert_eq!("bull-nose".parse::<EdgeProfile>().unwrap(), EdgeProfile::Bullnose);
        assert_eq!("Pencil-Round".parse::<EdgeProfile>().unwrap(), EdgeProfile::PencilRound);
        assert_eq!("shark-nose".parse::<EdgeProfile>().unwrap(), EdgeProfile::SharkNose);
        assert!("ogee".parse::<EdgeProfile>().is_err());
    }

    #[test]
    fn serde_uses_kebab_names_and_aliases() {
        let p: EdgeProfile = serde_json::from_str("\"bull-nose\"").unwrap();
        assert_eq!(p, EdgeProfile::Bullnose);
        assert_eq!(serde_json::to_string(&EdgeProfile::PencilRound).unwrap(), "\"pencil-round\"");
    }
}
