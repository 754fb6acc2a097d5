//! Age profile catalog.
//!
//! Static set of growth-stage climate bands. Each farm copies one of these at
//! creation time; the catalog itself never changes at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Growth stage identifier (persisted as `chicks` / `growers` / `adults`)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeProfileId {
    #[serde(rename = "chicks")]
    Chick,
    #[serde(rename = "growers")]
    Grower,
    #[serde(rename = "adults")]
    Adult,
}

impl AgeProfileId {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeProfileId::Chick => "chicks",
            AgeProfileId::Grower => "growers",
            AgeProfileId::Adult => "adults",
        }
    }
}

impl fmt::Display for AgeProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgeProfileId {
    type Err = UnknownProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chicks" | "chick" => Ok(AgeProfileId::Chick),
            "growers" | "grower" => Ok(AgeProfileId::Grower),
            "adults" | "adult" => Ok(AgeProfileId::Adult),
            _ => Err(UnknownProfile(s.to_string())),
        }
    }
}

/// Lookup of a profile id that is not in the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownProfile(pub String);

impl fmt::Display for UnknownProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown age profile '{}'", self.0)
    }
}

impl std::error::Error for UnknownProfile {}

/// Climate band for one growth stage. Temperatures are whole °C.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgeProfile {
    pub id: AgeProfileId,
    pub name: String,
    pub description: String,
    pub age_range: String,
    pub min_temp: i32,
    pub max_temp: i32,
    pub target_temp: i32,
    pub icon: String,
}

impl AgeProfile {
    /// Inclusive on both ends.
    pub fn contains(&self, temperature: i32) -> bool {
        temperature >= self.min_temp && temperature <= self.max_temp
    }
}

/// All profiles in display order: chicks, growers, adults.
pub fn list() -> Vec<AgeProfile> {
    [AgeProfileId::Chick, AgeProfileId::Grower, AgeProfileId::Adult]
        .into_iter()
        .map(lookup)
        .collect()
}

/// Look up a profile by id
pub fn lookup(id: AgeProfileId) -> AgeProfile {
    let (name, description, age_range, min_temp, max_temp, target_temp, icon) = match id {
        AgeProfileId::Chick => (
            "Chicks",
            "Newly hatched chickens requiring warm environment",
            "0-1 week",
            32,
            35,
            33,
            "🐣",
        ),
        AgeProfileId::Grower => (
            "Growers",
            "Young chickens developing their feathers",
            "2-4 weeks",
            28,
            32,
            30,
            "🐤",
        ),
        AgeProfileId::Adult => (
            "Adults",
            "Fully grown chickens with complete feathers",
            "5+ weeks",
            20,
            28,
            24,
            "🐔",
        ),
    };

    AgeProfile {
        id,
        name: name.to_string(),
        description: description.to_string(),
        age_range: age_range.to_string(),
        min_temp,
        max_temp,
        target_temp,
        icon: icon.to_string(),
    }
}

/// Look up a profile by its persisted string id
pub fn lookup_str(id: &str) -> Result<AgeProfile, UnknownProfile> {
    let id: AgeProfileId = id.parse()?;
    Ok(lookup(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order_and_bands() {
        let profiles = list();
        let ids: Vec<AgeProfileId> = profiles.iter().map(|p| p.id).collect();
        assert_eq!(
            ids,
            vec![AgeProfileId::Chick, AgeProfileId::Grower, AgeProfileId::Adult]
        );

        let bands: Vec<(i32, i32, i32)> = profiles
            .iter()
            .map(|p| (p.min_temp, p.max_temp, p.target_temp))
            .collect();
        assert_eq!(bands, vec![(32, 35, 33), (28, 32, 30), (20, 28, 24)]);
    }

    #[test]
    fn test_target_strictly_inside_band() {
        for p in list() {
            assert!(p.min_temp < p.target_temp, "{}", p.name);
            assert!(p.target_temp < p.max_temp, "{}", p.name);
        }
    }

    #[test]
    fn test_lookup_by_string() {
        assert_eq!(lookup_str("growers").unwrap().id, AgeProfileId::Grower);
        assert_eq!(lookup_str("Adult").unwrap().target_temp, 24);
        assert_eq!(
            lookup_str("ducks"),
            Err(UnknownProfile("ducks".to_string()))
        );
    }

    #[test]
    fn test_contains_is_inclusive() {
        let grower = lookup(AgeProfileId::Grower);
        assert!(grower.contains(28));
        assert!(grower.contains(32));
        assert!(!grower.contains(27));
        assert!(!grower.contains(33));
    }

    #[test]
    fn test_id_serde_uses_persisted_names() {
        let json = serde_json::to_string(&AgeProfileId::Chick).unwrap();
        assert_eq!(json, "\"chicks\"");
        let id: AgeProfileId = serde_json::from_str("\"adults\"").unwrap();
        assert_eq!(id, AgeProfileId::Adult);
    }
}
