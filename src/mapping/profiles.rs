//! Output stem profiles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Catch-all category present in every profile
pub const CATCH_ALL: &str = "other";

/// A named, fixed set of output stem categories
#[derive(Debug, PartialEq, Eq)]
pub struct StemProfile {
    pub name: &'static str,
    pub stems: &'static [&'static str],
}

impl StemProfile {
    pub fn contains(&self, stem: &str) -> bool {
        self.stems.contains(&stem)
    }
}

pub const VDBO: StemProfile = StemProfile {
    name: "vdbo",
    stems: &["vocals", "drums", "bass", "other"],
};

pub const VDBO_GP: StemProfile = StemProfile {
    name: "vdbo+gp",
    stems: &["vocals", "drums", "bass", "guitar", "piano", "other"],
};

/// Profile selector used by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProfileKind {
    /// vocals / drums / bass / other
    #[default]
    #[serde(rename = "vdbo")]
    Vdbo,
    /// vocals / drums / bass / guitar / piano / other
    #[serde(rename = "vdbo+gp")]
    VdboGp,
}

impl ProfileKind {
    pub fn profile(self) -> &'static StemProfile {
        match self {
            ProfileKind::Vdbo => &VDBO,
            ProfileKind::VdboGp => &VDBO_GP,
        }
    }

    pub fn name(self) -> &'static str {
        self.profile().name
    }
}

impl FromStr for ProfileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vdbo" => Ok(ProfileKind::Vdbo),
            "vdbo+gp" => Ok(ProfileKind::VdboGp),
            other => Err(format!(
                "unknown profile '{}' (expected 'vdbo' or 'vdbo+gp')",
                other
            )),
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_stems() {
        assert_eq!(VDBO.stems, &["vocals", "drums", "bass", "other"]);
        assert_eq!(
            VDBO_GP.stems,
            &["vocals", "drums", "bass", "guitar", "piano", "other"]
        );
        assert!(VDBO.contains(CATCH_ALL));
        assert!(VDBO_GP.contains(CATCH_ALL));
    }

    #[test]
    fn test_profile_kind_parse() {
        assert_eq!("vdbo".parse::<ProfileKind>().unwrap(), ProfileKind::Vdbo);
        assert_eq!("vdbo+gp".parse::<ProfileKind>().unwrap(), ProfileKind::VdboGp);
        assert!("vdbogp".parse::<ProfileKind>().is_err());
        assert_eq!(ProfileKind::VdboGp.profile(), &VDBO_GP);
    }
}
