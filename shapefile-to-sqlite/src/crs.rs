//! Système de coordonnées cible (`--crs`)

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

/// CRS identifié par son code EPSG
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Crs {
    epsg: u32,
}

impl Crs {
    /// WGS84, le CRS par défaut des géométries SpatiaLite
    pub const WGS84: Crs = Crs { epsg: 4326 };

    pub fn from_epsg(epsg: u32) -> Self {
        Self { epsg }
    }

    /// SRID SpatiaLite (identique au code EPSG)
    pub fn srid(&self) -> u32 {
        self.epsg
    }

    /// Définition compréhensible par PROJ
    pub fn definition(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

fn crs_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?i:epsg:)?([0-9]{1,6})$").expect("static CRS pattern is valid")
    })
}

impl FromStr for Crs {
    type Err = String;

    /// Accepte `epsg:2227`, `EPSG:2227` ou `2227`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("Invalid CRS: '{}'. Expected an EPSG code such as epsg:4326", s);

        let captures = crs_pattern().captures(s.trim()).ok_or_else(invalid)?;
        let epsg: u32 = captures[1].parse().map_err(|_| invalid())?;

        if epsg == 0 {
            return Err(invalid());
        }

        Ok(Self { epsg })
    }
}
