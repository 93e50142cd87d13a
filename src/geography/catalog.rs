use std::{fmt, sync::LazyLock};

use ahash::{AHashMap, AHashSet};

/// Summary level code → ordered levels, outermost first.
const TABLE: &[(&str, &[&str])] = &[
    ("010", &["us"]),
    ("020", &["region"]),
    ("030", &["division"]),
    ("040", &["state"]),
    ("050", &["state", "county"]),
    ("060", &["state", "county", "county subdivision"]),
    ("067", &["state", "county", "county subdivision", "subminor civil division"]),
    ("070", &["state", "county", "county subdivision", "place/remainder (or part)"]),
    ("080", &["state", "county", "county subdivision", "place/remainder (or part)", "tract (or part)"]),
    ("090", &["state", "county", "county subdivision", "place/remainder (or part)", "tract (or part)", "block group (or part)"]),
    ("100", &["state", "county", "tract", "block"]),
    ("140", &["state", "county", "tract"]),
    ("150", &["state", "county", "tract", "block group"]),
    ("155", &["state", "place", "county (or part)"]),
    ("160", &["state", "place"]),
    ("170", &["state", "consolidated city"]),
    ("172", &["state", "consolidated city", "place (or part)"]),
    ("230", &["state", "alaska native regional corporation"]),
    ("250", &["american indian area/alaska native area/hawaiian home land"]),
    ("251", &["american indian area/alaska native area/hawaiian home land", "tribal subdivision/remainder"]),
    ("252", &["american indian area/alaska native area (reservation or statistical entity only)"]),
    ("254", &["american indian area (off-reservation trust land only)/hawaiian home land"]),
    ("256", &["american indian area/alaska native area/hawaiian home land", "tribal census tract"]),
    ("258", &["american indian area/alaska native area/hawaiian home land", "tribal census tract", "tribal block group"]),
    ("280", &["state", "american indian area/alaska native area/hawaiian home land (or part)"]),
    ("310", &["metropolitan statistical area/micropolitan statistical area"]),
    ("312", &["metropolitan statistical area/micropolitan statistical area", "state (or part)", "principal city (or part)"]),
    ("314", &["metropolitan statistical area/micropolitan statistical area", "metropolitan division"]),
    ("320", &["state", "metropolitan statistical area/micropolitan statistical area (or part)"]),
    ("323", &["state", "metropolitan statistical area/micropolitan statistical area (or part)", "metropolitan division (or part)"]),
    ("330", &["combined statistical area"]),
    ("332", &["combined statistical area", "metropolitan statistical area/micropolitan statistical area"]),
    ("335", &["combined new england city and town area"]),
    ("337", &["combined new england city and town area", "new england city and town area"]),
    ("340", &["state", "combined statistical area (or part)"]),
    ("345", &["state", "combined new england city and town area (or part)"]),
    ("350", &["new england city and town area"]),
    ("352", &["new england city and town area", "state (or part)", "principal city"]),
    ("355", &["new england city and town area", "necta division"]),
    ("361", &["state", "new england city and town area (or part)"]),
    ("400", &["urban area"]),
    ("410", &["urban area", "state (or part)"]),
    ("430", &["urban area", "state (or part)", "county (or part)"]),
    ("500", &["state", "congressional district"]),
    ("510", &["state", "congressional district", "county (or part)"]),
    ("521", &["state", "congressional district", "county (or part)", "county subdivision"]),
    ("531", &["state", "congressional district", "place (or part)"]),
    ("550", &["state", "congressional district", "american indian area/alaska native area/hawaiian home land (or part)"]),
    ("610", &["state", "state legislative district (upper chamber)"]),
    ("612", &["state", "state legislative district (upper chamber)", "county (or part)"]),
    ("620", &["state", "state legislative district (lower chamber)"]),
    ("622", &["state", "state legislative district (lower chamber)", "county (or part)"]),
    ("700", &["state", "county", "voting district"]),
    ("795", &["state", "public use microdata area"]),
    ("860", &["zip code tabulation area"]),
    ("871", &["state", "zip code tabulation area (or part)"]),
    ("950", &["state", "school district (elementary)"]),
    ("960", &["state", "school district (secondary)"]),
    ("970", &["state", "school district (unified)"]),
];

/// One canonical geography hierarchy, identified by its summary level code.
///
/// Values exist only inside the catalog; there is no public constructor.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct GeographyPath {
    code: &'static str,
    levels: &'static [&'static str],
}

impl GeographyPath {
    /// Three-character summary level code, e.g. `"050"`.
    #[inline] pub fn code(&self) -> &'static str { self.code }

    /// Level names from the outermost (root) to the innermost.
    #[inline] pub fn levels(&self) -> &'static [&'static str] { self.levels }

    #[inline] pub fn len(&self) -> usize { self.levels.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.levels.is_empty() }

    #[inline] pub fn contains(&self, level: &str) -> bool { self.levels.contains(&level) }

    /// Position of `level` in the path, counted from the root.
    #[inline] pub fn position(&self, level: &str) -> Option<usize> { self.levels.iter().position(|&l| l == level) }
}

impl fmt::Display for GeographyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.levels.join(" > "))
    }
}

/// The fixed, load-once table of geography paths.
#[derive(Debug)]
pub struct Catalog {
    paths: Vec<GeographyPath>,
    by_code: AHashMap<&'static str, usize>,
}

static CATALOG: LazyLock<Catalog> = LazyLock::new(|| {
    Catalog::build(TABLE).unwrap_or_else(|e| panic!("malformed geography catalog: {e}"))
});

/// The process-wide geography catalog.
pub fn catalog() -> &'static Catalog { &CATALOG }

impl Catalog {
    /// Build from a literal table, rejecting duplicate codes, duplicate paths and empty paths.
    fn build(table: &'static [(&'static str, &'static [&'static str])]) -> Result<Self, String> {
        let mut by_code = AHashMap::with_capacity(table.len());
        let mut seen_paths = AHashSet::with_capacity(table.len());
        let mut paths = Vec::with_capacity(table.len());

        for (i, &(code, levels)) in table.iter().enumerate() {
            if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format!("summary level {code:?} is not a three-digit code"));
            }
            if levels.is_empty() {
                return Err(format!("summary level {code} has no levels"));
            }
            if by_code.insert(code, i).is_some() {
                return Err(format!("summary level {code} appears twice"));
            }
            if !seen_paths.insert(levels) {
                return Err(format!("summary level {code} repeats the path {levels:?}"));
            }
            let unique_levels: AHashSet<&str> = levels.iter().copied().collect();
            if unique_levels.len() != levels.len() {
                return Err(format!("summary level {code} repeats a level"));
            }
            paths.push(GeographyPath { code, levels });
        }

        Ok(Self { paths, by_code })
    }

    /// Exact lookup by summary level code.
    pub fn by_code(&self, code: &str) -> Option<&GeographyPath> {
        self.by_code.get(code).map(|&i| &self.paths[i])
    }

    /// Every (code, path) pair in table order.
    pub fn all(&self) -> impl Iterator<Item = (&'static str, &GeographyPath)> + '_ {
        self.paths.iter().map(|p| (p.code, p))
    }

    pub fn len(&self) -> usize { self.paths.len() }

    pub fn is_empty(&self) -> bool { self.paths.is_empty() }

    /// Human-readable list of supported geographies, for error messages.
    pub fn supported(&self) -> Vec<String> {
        self.paths.iter().map(ToString::to_string).collect()
    }
}

/// Tabular column name for a level, e.g. `"block group"` → `"BLOCK_GROUP"`.
pub fn column_name(level: &str) -> String {
    level.trim()
        .to_ascii_uppercase()
        .replace(['(', ')'], "")
        .replace([' ', '/', '-'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_code() {
        let path = catalog().by_code("150").unwrap();
        assert_eq!(path.levels(), &["state", "county", "tract", "block group"]);
        assert_eq!(path.to_string(), "150: state > county > tract > block group");
        assert!(catalog().by_code("999").is_none());
    }

    #[test]
    fn codes_and_paths_are_unique() {
        let codes: AHashSet<_> = catalog().all().map(|(code, _)| code).collect();
        let paths: AHashSet<_> = catalog().all().map(|(_, p)| p.levels()).collect();
        assert_eq!(codes.len(), catalog().len());
        assert_eq!(paths.len(), catalog().len());
        assert!(catalog().len() >= 55);
    }

    #[test]
    fn malformed_tables_rejected() {
        static DUP_CODE: &[(&str, &[&str])] = &[("040", &["state"]), ("040", &["region"])];
        static DUP_PATH: &[(&str, &[&str])] = &[("040", &["state"]), ("041", &["state"])];
        static EMPTY: &[(&str, &[&str])] = &[("040", &[])];
        static BAD_CODE: &[(&str, &[&str])] = &[("40", &["state"])];

        assert!(Catalog::build(DUP_CODE).is_err());
        assert!(Catalog::build(DUP_PATH).is_err());
        assert!(Catalog::build(EMPTY).is_err());
        assert!(Catalog::build(BAD_CODE).is_err());
    }

    #[test]
    fn column_names() {
        assert_eq!(column_name("block group"), "BLOCK_GROUP");
        assert_eq!(column_name("county (or part)"), "COUNTY_OR_PART");
        assert_eq!(
            column_name("metropolitan statistical area/micropolitan statistical area"),
            "METROPOLITAN_STATISTICAL_AREA_MICROPOLITAN_STATISTICAL_AREA",
        );
    }
}
