use tracing::debug;

use crate::{
    geography::{catalog, Catalog, FilterValue, GeoFilterSpec, GeographyPath},
    Error, Result,
};

/// A catalog path with a value bound to each level in its required span.
///
/// Bindings run from the outermost bound level to the innermost and are contiguous:
/// every level between the root and the innermost supplied level is bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundPath {
    path: &'static GeographyPath,
    bindings: Vec<(&'static str, FilterValue)>,
}

impl BoundPath {
    #[inline] pub fn path(&self) -> &'static GeographyPath { self.path }

    #[inline] pub fn code(&self) -> &'static str { self.path.code() }

    /// (level, value) pairs, outermost first.
    #[inline] pub fn bindings(&self) -> &[(&'static str, FilterValue)] { &self.bindings }

    pub fn get(&self, level: &str) -> Option<&FilterValue> {
        self.bindings.iter().find(|(l, _)| *l == level).map(|(_, v)| v)
    }

    /// The most specific bound level and its value.
    pub fn innermost(&self) -> (&'static str, &FilterValue) {
        // fill_in refuses to build an empty binding
        let (level, value) = &self.bindings[self.bindings.len() - 1];
        (*level, value)
    }

    /// Bound levels other than the innermost, outermost first.
    pub fn outer(&self) -> &[(&'static str, FilterValue)] {
        &self.bindings[..self.bindings.len() - 1]
    }

    /// The bindings as a filter set, for re-matching.
    pub fn to_filters(&self) -> GeoFilterSpec {
        self.bindings.iter().map(|(l, v)| (*l, v.clone())).collect()
    }
}

impl GeographyPath {
    /// Every filter key is a level of this path and, when `is_prefix`, the root level is filtered.
    pub fn partial_match(&self, filters: &GeoFilterSpec, is_prefix: bool) -> bool {
        !filters.is_empty()
            && filters.keys().all(|k| self.contains(k))
            && (!is_prefix || self.levels().first().is_some_and(|root| filters.contains(root)))
    }

    /// Every level of this path is filtered, and nothing else is.
    pub fn full_match(&self, filters: &GeoFilterSpec) -> bool {
        filters.len() == self.len() && filters.keys().all(|k| self.contains(k))
    }

    /// Bind levels from the innermost supplied level outward, defaulting unsupplied
    /// outer levels to the wildcard. Levels inside the innermost supplied level are omitted.
    pub fn fill_in(&'static self, filters: &GeoFilterSpec) -> Result<BoundPath> {
        let mut bindings = Vec::with_capacity(self.len());
        let mut required = false;

        for &level in self.levels().iter().rev() {
            match filters.get(level) {
                Some(value) => {
                    bindings.push((level, value.clone()));
                    required = true;
                }
                None if required => bindings.push((level, FilterValue::wildcard())),
                None => {}
            }
        }

        if bindings.is_empty() {
            return Err(Error::UnderspecifiedGeography {
                code: self.code().to_string(),
                filters: filters.key_list(),
            });
        }

        bindings.reverse();
        Ok(BoundPath { path: self, bindings })
    }
}

impl Catalog {
    /// Every path that partially matches `filters`, in catalog order.
    pub fn partial_matches(&self, filters: &GeoFilterSpec, is_prefix: bool) -> Vec<&GeographyPath> {
        self.all()
            .map(|(_, path)| path)
            .filter(|path| path.partial_match(filters, is_prefix))
            .collect()
    }

    /// The narrowest path that partially matches `filters` with its root filtered.
    pub fn partial_prefix_match(&self, filters: &GeoFilterSpec) -> Result<&GeographyPath> {
        let matches = self.partial_matches(filters, true);

        let Some(shortest) = matches.iter().map(|p| p.len()).min() else {
            return Err(Error::NoMatchingGeography {
                filters: filters.key_list(),
                supported: self.supported(),
            });
        };

        let narrowest: Vec<&GeographyPath> = matches.into_iter().filter(|p| p.len() == shortest).collect();
        match narrowest.as_slice() {
            [path] => Ok(*path),
            paths => Err(Error::AmbiguousCatalog {
                codes: paths.iter().map(|p| p.code().to_string()).collect(),
                filters: filters.key_list(),
            }),
        }
    }

    /// The single path whose levels are exactly the filter keys.
    pub fn full_match(&self, filters: &GeoFilterSpec) -> Result<&GeographyPath> {
        let matches: Vec<&GeographyPath> = self.all()
            .map(|(_, path)| path)
            .filter(|path| path.full_match(filters))
            .collect();

        match matches.as_slice() {
            [] => Err(Error::NoMatchingGeography {
                filters: filters.key_list(),
                supported: self.supported(),
            }),
            [path] => Ok(*path),
            paths => Err(Error::AmbiguousCatalog {
                codes: paths.iter().map(|p| p.code().to_string()).collect(),
                filters: filters.key_list(),
            }),
        }
    }

    /// Self-consistency: every path's own level set resolves, both partially and fully, to itself.
    pub fn check(&self) -> Result<()> {
        for (code, path) in self.all() {
            let filters: GeoFilterSpec = path.levels().iter().map(|&l| (l, FilterValue::wildcard())).collect();
            for found in [self.partial_prefix_match(&filters)?, self.full_match(&filters)?] {
                if found.code() != code {
                    return Err(Error::AmbiguousCatalog {
                        codes: vec![code.to_string(), found.code().to_string()],
                        filters: filters.key_list(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Match `filters` to the narrowest catalog path and bind every required level.
pub fn resolve(filters: &GeoFilterSpec) -> Result<BoundPath> {
    let path = catalog().partial_prefix_match(filters)?;
    debug!(code = path.code(), levels = ?path.levels(), "matched geography");
    path.fill_in(filters)
}
