//! Planetary constants and mean Keplerian elements at J2000.0.
//!
//! Element literals are the J2000 values from Standish & Williams (JPL),
//! "Keplerian Elements for Approximate Positions of the Major Planets",
//! Table 1, kept in the tabulated units (AU, degrees) and converted to SI
//! radians on access. The catalog is immutable for the process lifetime.

use std::fmt;
use std::str::FromStr;

use orbit_core::constants::{AU_M, SECONDS_PER_DAY};
use serde::{Deserialize, Serialize};

use crate::EphemerisError;

/// Gravitational parameter of the Sun (m³/s²).
pub const MU_SUN_M3_S2: f64 = 1.327_124_400_18e20;

/// The fixed set of simulated bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Body {
    Sun,
    Mercury,
    Venus,
    Earth,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
}

impl Body {
    /// Every body, Sun first.
    pub const ALL: [Body; 9] = [
        Body::Sun,
        Body::Mercury,
        Body::Venus,
        Body::Earth,
        Body::Mars,
        Body::Jupiter,
        Body::Saturn,
        Body::Uranus,
        Body::Neptune,
    ];

    /// The eight planets in order from the Sun.
    pub const PLANETS: [Body; 8] = [
        Body::Mercury,
        Body::Venus,
        Body::Earth,
        Body::Mars,
        Body::Jupiter,
        Body::Saturn,
        Body::Uranus,
        Body::Neptune,
    ];

    /// Lowercase identifier used on the wire and in journals.
    pub fn id(self) -> &'static str {
        match self {
            Body::Sun => "sun",
            Body::Mercury => "mercury",
            Body::Venus => "venus",
            Body::Earth => "earth",
            Body::Mars => "mars",
            Body::Jupiter => "jupiter",
            Body::Saturn => "saturn",
            Body::Uranus => "uranus",
            Body::Neptune => "neptune",
        }
    }

    /// Physical constants and epoch elements for this body.
    pub fn data(self) -> &'static BodyData {
        match self {
            Body::Sun => &SUN,
            Body::Mercury => &MERCURY,
            Body::Venus => &VENUS,
            Body::Earth => &EARTH,
            Body::Mars => &MARS,
            Body::Jupiter => &JUPITER,
            Body::Saturn => &SATURN,
            Body::Uranus => &URANUS,
            Body::Neptune => &NEPTUNE,
        }
    }

    /// Epoch orbital elements in SI/radians; `None` for the Sun.
    pub fn elements(self) -> Option<OrbitalElements> {
        self.data().elements.as_ref().map(ElementsAtEpoch::to_orbital)
    }
}

impl FromStr for Body {
    type Err = EphemerisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Body::ALL
            .into_iter()
            .find(|body| body.id() == lower)
            .ok_or_else(|| EphemerisError::UnknownBody(s.to_string()))
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Immutable catalog entry for one body.
#[derive(Debug, Clone)]
pub struct BodyData {
    pub name: &'static str,
    /// Gravitational parameter μ = GM (m³/s²).
    pub mu_m3_s2: f64,
    /// Equatorial radius (m).
    pub radius_m: f64,
    /// Mass (kg).
    pub mass_kg: f64,
    /// Mean elements at epoch; `None` for the Sun.
    pub elements: Option<ElementsAtEpoch>,
}

/// Mean elements exactly as tabulated: AU and degrees, with mean longitude L
/// and longitude of perihelion ϖ rather than M₀ and ω.
#[derive(Debug, Clone, Copy)]
pub struct ElementsAtEpoch {
    pub a_au: f64,
    pub e: f64,
    pub i_deg: f64,
    pub mean_longitude_deg: f64,
    pub perihelion_longitude_deg: f64,
    pub node_longitude_deg: f64,
}

impl ElementsAtEpoch {
    /// Convert to SI classical elements (a in m, angles in radians,
    /// ω = ϖ − Ω, M₀ = L − ϖ).
    pub fn to_orbital(&self) -> OrbitalElements {
        OrbitalElements {
            a_m: self.a_au * AU_M,
            e: self.e,
            i_rad: self.i_deg.to_radians(),
            node_rad: self.node_longitude_deg.to_radians(),
            argp_rad: (self.perihelion_longitude_deg - self.node_longitude_deg).to_radians(),
            m0_rad: (self.mean_longitude_deg - self.perihelion_longitude_deg).to_radians(),
        }
    }
}

/// Classical orbital elements in SI units.
#[derive(Debug, Clone, Copy)]
pub struct OrbitalElements {
    /// Semi-major axis (m).
    pub a_m: f64,
    /// Eccentricity.
    pub e: f64,
    /// Inclination (rad).
    pub i_rad: f64,
    /// Longitude of the ascending node Ω (rad).
    pub node_rad: f64,
    /// Argument of periapsis ω (rad).
    pub argp_rad: f64,
    /// Mean anomaly at epoch M₀ (rad).
    pub m0_rad: f64,
}

impl OrbitalElements {
    /// Mean motion n = √(μ_sun/a³) (rad/s).
    pub fn mean_motion(&self) -> f64 {
        (MU_SUN_M3_S2 / self.a_m.powi(3)).sqrt()
    }

    /// Orbital period 2π/n (s).
    pub fn period_s(&self) -> f64 {
        std::f64::consts::TAU / self.mean_motion()
    }

    /// Orbital period in days.
    pub fn period_days(&self) -> f64 {
        self.period_s() / SECONDS_PER_DAY
    }
}

static SUN: BodyData = BodyData {
    name: "Sun",
    mu_m3_s2: MU_SUN_M3_S2,
    radius_m: 6.957e8,
    mass_kg: 1.988_92e30,
    elements: None,
};

static MERCURY: BodyData = BodyData {
    name: "Mercury",
    mu_m3_s2: 2.2032e13,
    radius_m: 2.4397e6,
    mass_kg: 3.3011e23,
    elements: Some(ElementsAtEpoch {
        a_au: 0.387_099_27,
        e: 0.205_635_93,
        i_deg: 7.004_979_02,
        mean_longitude_deg: 252.250_323_50,
        perihelion_longitude_deg: 77.457_796_28,
        node_longitude_deg: 48.330_765_93,
    }),
};

static VENUS: BodyData = BodyData {
    name: "Venus",
    mu_m3_s2: 3.248_59e14,
    radius_m: 6.0518e6,
    mass_kg: 4.8675e24,
    elements: Some(ElementsAtEpoch {
        a_au: 0.723_335_66,
        e: 0.006_776_72,
        i_deg: 3.394_676_05,
        mean_longitude_deg: 181.979_099_50,
        perihelion_longitude_deg: 131.602_467_18,
        node_longitude_deg: 76.679_842_55,
    }),
};

static EARTH: BodyData = BodyData {
    name: "Earth",
    mu_m3_s2: 3.986_004_418e14,
    radius_m: 6.3781e6,
    mass_kg: 5.9722e24,
    elements: Some(ElementsAtEpoch {
        a_au: 1.000_002_61,
        e: 0.016_711_23,
        i_deg: -0.000_015_31,
        mean_longitude_deg: 100.464_571_66,
        perihelion_longitude_deg: 102.937_681_93,
        node_longitude_deg: 0.0,
    }),
};

static MARS: BodyData = BodyData {
    name: "Mars",
    mu_m3_s2: 4.282_837e13,
    radius_m: 3.3962e6,
    mass_kg: 6.4171e23,
    elements: Some(ElementsAtEpoch {
        a_au: 1.523_710_34,
        e: 0.093_394_10,
        i_deg: 1.849_691_42,
        mean_longitude_deg: -4.553_432_05,
        perihelion_longitude_deg: -23.943_629_59,
        node_longitude_deg: 49.559_538_91,
    }),
};

static JUPITER: BodyData = BodyData {
    name: "Jupiter",
    mu_m3_s2: 1.266_865_34e17,
    radius_m: 7.1492e7,
    mass_kg: 1.8982e27,
    elements: Some(ElementsAtEpoch {
        a_au: 5.202_887_00,
        e: 0.048_386_24,
        i_deg: 1.304_396_95,
        mean_longitude_deg: 34.396_440_51,
        perihelion_longitude_deg: 14.728_479_83,
        node_longitude_deg: 100.473_909_09,
    }),
};

static SATURN: BodyData = BodyData {
    name: "Saturn",
    mu_m3_s2: 3.793_118_7e16,
    radius_m: 6.0268e7,
    mass_kg: 5.6834e26,
    elements: Some(ElementsAtEpoch {
        a_au: 9.536_675_94,
        e: 0.053_861_79,
        i_deg: 2.485_991_87,
        mean_longitude_deg: 49.954_244_23,
        perihelion_longitude_deg: 92.598_878_31,
        node_longitude_deg: 113.662_424_48,
    }),
};

static URANUS: BodyData = BodyData {
    name: "Uranus",
    mu_m3_s2: 5.793_939e15,
    radius_m: 2.5559e7,
    mass_kg: 8.6810e25,
    elements: Some(ElementsAtEpoch {
        a_au: 19.189_164_64,
        e: 0.047_257_44,
        i_deg: 0.772_637_83,
        mean_longitude_deg: 313.238_104_51,
        perihelion_longitude_deg: 170.954_276_30,
        node_longitude_deg: 74.016_925_03,
    }),
};

static NEPTUNE: BodyData = BodyData {
    name: "Neptune",
    mu_m3_s2: 6.836_529e15,
    radius_m: 2.4764e7,
    mass_kg: 1.024_13e26,
    elements: Some(ElementsAtEpoch {
        a_au: 30.069_922_76,
        e: 0.008_590_48,
        i_deg: 1.770_043_47,
        mean_longitude_deg: -55.120_029_69,
        perihelion_longitude_deg: 44.964_762_27,
        node_longitude_deg: 131.784_225_74,
    }),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_planet_is_elliptic() {
        for body in Body::PLANETS {
            let el = body.elements().expect("planet elements");
            assert!(el.a_m > 0.0, "{body}: a must be positive");
            assert!((0.0..1.0).contains(&el.e), "{body}: e must be in [0, 1)");
        }
    }

    #[test]
    fn sun_has_no_elements() {
        assert!(Body::Sun.elements().is_none());
    }

    #[test]
    fn earth_period_is_one_year() {
        let el = Body::Earth.elements().expect("earth elements");
        assert!((el.period_days() - 365.25).abs() < 0.2);
    }

    #[test]
    fn ids_round_trip_through_from_str() {
        for body in Body::ALL {
            assert_eq!(body.id().parse::<Body>().expect("parse id"), body);
        }
        assert_eq!("MARS".parse::<Body>().expect("case-insensitive"), Body::Mars);
        assert!("phobos".parse::<Body>().is_err());
    }
}
