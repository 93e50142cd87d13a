use std::fmt;

use serde::{Deserialize, Serialize};

/// Generalized cartographic boundary files or full-resolution TIGER/Line files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundarySource {
    #[default]
    Cartographic,
    Tiger,
}

/// Resolution tier of a generalized boundary file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "500k")]
    R500k,
    #[serde(rename = "5m")]
    R5m,
    #[serde(rename = "20m")]
    R20m,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::R500k => "500k",
            Resolution::R5m => "5m",
            Resolution::R20m => "20m",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Extent covered by one boundary file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Us,
    /// Two-digit state FIPS code.
    State(String),
    /// Five-digit state+county FIPS code.
    County(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Us => f.write_str("us"),
            Scope::State(code) => write!(f, "{code:0>2}"),
            Scope::County(code) => write!(f, "{code:0>5}"),
        }
    }
}

/// Identifies one fetchable boundary archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapefileDescriptor {
    source: BoundarySource,
    token: String,
    tiger_dir: String,
    scope: Scope,
    year: u16,
    resolution: Option<Resolution>,
}

impl ShapefileDescriptor {
    /// A generalized file. For 2010, `token` is the summary level and variant, e.g. `050_00`.
    pub fn cartographic(token: &str, scope: Scope, year: u16, resolution: Resolution) -> Self {
        Self {
            source: BoundarySource::Cartographic,
            token: token.to_string(),
            tiger_dir: String::new(),
            scope,
            year,
            resolution: Some(resolution),
        }
    }

    /// A TIGER/Line file under `TIGER<year>/<dir>/`, or the release root when `dir` is empty.
    pub fn tiger(token: &str, dir: &str, scope: Scope, year: u16) -> Self {
        Self {
            source: BoundarySource::Tiger,
            token: token.to_string(),
            tiger_dir: dir.trim_matches('/').to_string(),
            scope,
            year,
            resolution: None,
        }
    }

    /// Area-water polygons for one county (five-digit FIPS).
    pub fn areawater(year: u16, county: &str) -> Self {
        Self::tiger("areawater", "AREAWATER", Scope::County(county.to_string()), year)
    }

    #[inline] pub fn source(&self) -> BoundarySource { self.source }

    #[inline] pub fn token(&self) -> &str { &self.token }

    #[inline] pub fn scope(&self) -> &Scope { &self.scope }

    #[inline] pub fn year(&self) -> u16 { self.year }

    #[inline] pub fn resolution(&self) -> Option<Resolution> { self.resolution }

    /// File stem, also used as the cache key, e.g. `cb_2020_36_tract_500k`.
    pub fn name(&self) -> String {
        let (year, scope, token) = (self.year, &self.scope, &self.token);
        match (self.source, self.resolution) {
            (BoundarySource::Cartographic, Some(res)) if year == 2010 => format!("gz_2010_{scope}_{token}_{res}"),
            (BoundarySource::Cartographic, Some(res)) => format!("cb_{year}_{scope}_{token}_{res}"),
            _ => format!("tl_{year}_{scope}_{token}"),
        }
    }

    /// Download location relative to `boundary_host`.
    pub fn url(&self, boundary_host: &str) -> String {
        let host = boundary_host.trim_end_matches('/');
        let name = self.name();
        match self.source {
            BoundarySource::Cartographic => match self.year {
                2010 | 2013 => format!("{host}/GENZ{}/{name}.zip", self.year),
                year => format!("{host}/GENZ{year}/shp/{name}.zip"),
            },
            BoundarySource::Tiger if self.tiger_dir.is_empty() => format!("{host}/TIGER{}/{name}.zip", self.year),
            BoundarySource::Tiger => format!("{host}/TIGER{}/{}/{name}.zip", self.year, self.tiger_dir),
        }
    }
}

impl fmt::Display for ShapefileDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.name()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{BoundarySource, GeoLevelKind};

    const HOST: &str = "https://www2.census.gov/geo/tiger";

    fn url(kind: GeoLevelKind, year: u16, scope: Scope, source: BoundarySource, res: Resolution) -> String {
        kind.rule(year, source).descriptor(scope, res).url(HOST)
    }

    #[test]
    fn cartographic_urls_by_era() {
        let state = || Scope::State("36".into());
        assert_eq!(
            url(GeoLevelKind::County, 2010, Scope::Us, BoundarySource::Cartographic, Resolution::R500k),
            "https://www2.census.gov/geo/tiger/GENZ2010/gz_2010_us_050_00_500k.zip",
        );
        assert_eq!(
            url(GeoLevelKind::Tract, 2013, state(), BoundarySource::Cartographic, Resolution::R500k),
            "https://www2.census.gov/geo/tiger/GENZ2013/cb_2013_36_tract_500k.zip",
        );
        assert_eq!(
            url(GeoLevelKind::County, 2019, Scope::Us, BoundarySource::Cartographic, Resolution::R5m),
            "https://www2.census.gov/geo/tiger/GENZ2019/shp/cb_2019_us_county_5m.zip",
        );
        assert_eq!(
            url(GeoLevelKind::CongressionalDistrict, 2020, Scope::Us, BoundarySource::Cartographic, Resolution::R500k),
            "https://www2.census.gov/geo/tiger/GENZ2020/shp/cb_2020_us_cd116_500k.zip",
        );
    }

    #[test]
    fn tiger_urls_by_era() {
        assert_eq!(
            url(GeoLevelKind::Tract, 2010, Scope::State("1".into()), BoundarySource::Tiger, Resolution::R500k),
            "https://www2.census.gov/geo/tiger/TIGER2010/TRACT/2010/tl_2010_01_tract10.zip",
        );
        // no generalized files were published for 2012
        assert_eq!(
            url(GeoLevelKind::County, 2012, Scope::Us, BoundarySource::Cartographic, Resolution::R500k),
            "https://www2.census.gov/geo/tiger/TIGER2012/COUNTY/tl_2012_us_county.zip",
        );
        assert_eq!(
            url(GeoLevelKind::Block, 2020, Scope::State("34".into()), BoundarySource::Cartographic, Resolution::R500k),
            "https://www2.census.gov/geo/tiger/TIGER2020/TABBLOCK20/tl_2020_34_tabblock20.zip",
        );
        assert_eq!(
            url(GeoLevelKind::ZipCodeTabulationArea, 2020, Scope::Us, BoundarySource::Tiger, Resolution::R500k),
            "https://www2.census.gov/geo/tiger/TIGER2020/ZCTA520/tl_2020_us_zcta520.zip",
        );
    }

    #[test]
    fn areawater_is_county_scoped() {
        let desc = ShapefileDescriptor::areawater(2020, "36001");
        assert_eq!(desc.name(), "tl_2020_36001_areawater");
        assert_eq!(desc.url(HOST), "https://www2.census.gov/geo/tiger/TIGER2020/AREAWATER/tl_2020_36001_areawater.zip");
        assert!(desc.resolution().is_none());
    }
}
