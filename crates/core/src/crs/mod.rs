//! Coordinate Reference System handling

pub mod slippy;
mod transform;

pub use transform::CoordTransformer;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
    /// PROJ string if available
    proj: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
            proj: None,
        }
    }

    /// Create a CRS from a WKT string.
    ///
    /// The root `AUTHORITY["EPSG", ...]` (WKT1) or `ID["EPSG", ...]` (WKT2)
    /// is picked up as the EPSG code when present.
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        let wkt = wkt.into();
        let epsg = epsg_from_wkt(&wkt);
        Self {
            wkt: Some(wkt),
            epsg,
            proj: None,
        }
    }

    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        Self {
            wkt: None,
            epsg: None,
            proj: Some(proj.into()),
        }
    }

    /// Parse a user-supplied CRS identifier.
    ///
    /// Accepts `EPSG:<code>`, a bare numeric code, a PROJ string starting with
    /// `+`, or WKT.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidParameter {
                name: "crs",
                value: String::new(),
                reason: "empty CRS identifier".to_string(),
            });
        }

        let upper = text.to_ascii_uppercase();
        let code = upper.strip_prefix("EPSG:").unwrap_or(&upper);
        if let Ok(code) = code.trim().parse::<u32>() {
            return Ok(Self::from_epsg(code));
        }
        if text.starts_with('+') {
            return Ok(Self::from_proj(text));
        }
        if text.contains('[') {
            return Ok(Self::from_wkt(text));
        }

        Err(Error::InvalidParameter {
            name: "crs",
            value: text.to_string(),
            reason: "expected EPSG:<code>, a PROJ string or WKT".to_string(),
        })
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::from_epsg(3857)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Get PROJ string
    pub fn proj(&self) -> Option<&str> {
        self.proj.as_deref()
    }

    pub fn is_wgs84(&self) -> bool {
        self.epsg == Some(4326)
    }

    /// EPSG:3857 and its deprecated aliases
    pub fn is_web_mercator(&self) -> bool {
        matches!(self.epsg, Some(3857) | Some(900913) | Some(3785))
    }

    /// Resolve a PROJ string usable by `proj4rs`.
    pub fn to_proj_string(&self) -> Result<String> {
        if let Some(proj) = &self.proj {
            return Ok(proj.clone());
        }
        if let Some(code) = self.epsg {
            return u16::try_from(code)
                .ok()
                .and_then(crs_definitions::from_code)
                .map(|def| def.proj4.to_string())
                .ok_or_else(|| Error::Projection(format!("EPSG:{} not supported", code)));
        }
        Err(Error::Projection(format!(
            "cannot derive a PROJ definition from {}",
            self.identifier()
        )))
    }

    /// Whether coordinates in this CRS are longitude/latitude degrees
    pub fn is_geographic(&self) -> bool {
        if self.is_wgs84() {
            return true;
        }
        match self.to_proj_string() {
            Ok(proj) => proj.contains("+proj=longlat") || proj.contains("+proj=latlong"),
            Err(_) => false,
        }
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b || (self.is_web_mercator() && other.is_web_mercator());
        }

        // If both have WKT, compare (this is imperfect)
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }

        if let (Some(a), Some(b)) = (&self.proj, &other.proj) {
            return a == b;
        }

        false
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(proj) = &self.proj {
            return proj.clone();
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", &wkt[..wkt.len().min(50)]);
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

/// Last EPSG authority in a WKT string, which for well-formed WKT belongs to
/// the root element.
fn epsg_from_wkt(wkt: &str) -> Option<u32> {
    let compact: String = wkt.chars().filter(|c| !c.is_whitespace()).collect();
    let candidates = ["AUTHORITY[\"EPSG\",\"", "ID[\"EPSG\","];
    let (pos, marker) = candidates
        .iter()
        .filter_map(|m| compact.rfind(m).map(|p| (p, *m)))
        .max_by_key(|(p, _)| *p)?;
    let digits: String = compact[pos + marker.len()..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(4326);
        assert_eq!(crs.epsg(), Some(4326));
        assert_eq!(crs.identifier(), "EPSG:4326");
    }

    #[test]
    fn test_crs_equivalence() {
        let a = CRS::from_epsg(4326);
        let b = CRS::wgs84();
        assert!(a.is_equivalent(&b));
        assert!(CRS::from_epsg(900913).is_equivalent(&CRS::web_mercator()));
        assert!(!CRS::wgs84().is_equivalent(&CRS::web_mercator()));
    }

    #[test]
    fn test_parse_variants() {
        assert_eq!(CRS::parse("EPSG:32630").unwrap().epsg(), Some(32630));
        assert_eq!(CRS::parse("epsg:3857").unwrap().epsg(), Some(3857));
        assert_eq!(CRS::parse("4326").unwrap().epsg(), Some(4326));

        let proj = CRS::parse("+proj=merc +a=6378137 +b=6378137").unwrap();
        assert_eq!(proj.proj(), Some("+proj=merc +a=6378137 +b=6378137"));

        assert!(CRS::parse("").is_err());
        assert!(CRS::parse("not a crs").is_err());
    }

    #[test]
    fn test_wkt_root_authority() {
        let wkt = r#"PROJCS["WGS 84 / Pseudo-Mercator",GEOGCS["WGS 84",AUTHORITY["EPSG","4326"]],AUTHORITY["EPSG","3857"]]"#;
        let crs = CRS::from_wkt(wkt);
        assert_eq!(crs.epsg(), Some(3857));
        assert!(crs.is_web_mercator());
    }

    #[test]
    fn test_proj_string_lookup() {
        let proj = CRS::from_epsg(32630).to_proj_string().unwrap();
        assert!(proj.contains("+proj=utm"));
        assert!(CRS::wgs84().is_geographic());
        assert!(!CRS::web_mercator().is_geographic());
    }
}
