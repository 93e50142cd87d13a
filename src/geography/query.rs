use crate::{
    config::DEFAULT_API_HOST,
    geography::{resolve, BoundPath, GeoFilterSpec},
    Result,
};

/// A fully resolved data request: dataset, vintage, fields and bound geography.
///
/// Pure data; nothing here touches the network.
#[derive(Debug, Clone, PartialEq)]
pub struct CensusGeographyQuerySpec {
    dataset: String,
    year: u16,
    fields: Vec<String>,
    bound: BoundPath,
    api_key: Option<String>,
}

impl CensusGeographyQuerySpec {
    pub fn new(dataset: &str, year: u16, fields: &[impl AsRef<str>], bound: BoundPath) -> Self {
        Self {
            dataset: dataset.trim_matches('/').to_string(),
            year,
            fields: fields.iter().map(|f| f.as_ref().to_string()).collect(),
            bound,
            api_key: None,
        }
    }

    /// Resolve `filters` against the catalog and build the request.
    pub fn from_filters(dataset: &str, year: u16, fields: &[impl AsRef<str>], filters: &GeoFilterSpec) -> Result<Self> {
        Ok(Self::new(dataset, year, fields, resolve(filters)?))
    }

    /// Attach an opaque API credential, sent as the `key` parameter.
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }

    #[inline] pub fn dataset(&self) -> &str { &self.dataset }

    #[inline] pub fn year(&self) -> u16 { self.year }

    #[inline] pub fn fields(&self) -> &[String] { &self.fields }

    #[inline] pub fn bound(&self) -> &BoundPath { &self.bound }

    /// `"<level>:<value>"` for the innermost bound level, or bare `"<level>"` for the wildcard.
    pub fn for_component(&self) -> String {
        let (level, value) = self.bound.innermost();
        if value.is_wildcard() { level.to_string() } else { format!("{level}:{}", value.to_wire()) }
    }

    /// Outer bound levels, outermost first, space-separated; `None` if there are none.
    pub fn in_component(&self) -> Option<String> {
        let outer = self.bound.outer();
        if outer.is_empty() { return None }
        Some(outer.iter()
            .map(|(level, value)| format!("{level}:{}", value.to_wire()))
            .collect::<Vec<_>>()
            .join(" "))
    }

    /// `<host>/data/<year>/<dataset>`
    pub fn base_url(&self, host: &str) -> String {
        format!("{}/data/{}/{}", host.trim_end_matches('/'), self.year, self.dataset)
    }

    /// Base URL against the public Census Data API host.
    pub fn default_url(&self) -> String { self.base_url(DEFAULT_API_HOST) }

    /// Query parameters in wire order: `get`, `for`, optional `in`, optional `key`.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("get".to_string(), self.fields.join(",")),
            ("for".to_string(), self.for_component()),
        ];
        if let Some(in_component) = self.in_component() {
            params.push(("in".to_string(), in_component));
        }
        if let Some(key) = &self.api_key {
            params.push(("key".to_string(), key.clone()));
        }
        params
    }

    /// Split into requests of at most `max_fields` fields each, preserving field order.
    pub fn batches(&self, max_fields: usize) -> Vec<Self> {
        if self.fields.len() <= max_fields || max_fields == 0 {
            return vec![self.clone()];
        }
        self.fields.chunks(max_fields)
            .map(|chunk| Self { fields: chunk.to_vec(), ..self.clone() })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geography::GeoFilterSpec;

    fn spec(pairs: &[(&str, &str)]) -> GeoFilterSpec {
        pairs.iter().copied().collect()
    }

    #[test]
    fn tract_query_components() {
        let query = CensusGeographyQuerySpec::from_filters(
            "acs/acs5", 2020, &["NAME", "B01001_001E"],
            &spec(&[("state", "36"), ("county", "001"), ("tract", "*")]),
        ).unwrap();

        assert_eq!(query.for_component(), "tract");
        assert_eq!(query.in_component().as_deref(), Some("state:36 county:001"));
        assert_eq!(query.default_url(), "https://api.census.gov/data/2020/acs/acs5");
        assert_eq!(query.params(), vec![
            ("get".to_string(), "NAME,B01001_001E".to_string()),
            ("for".to_string(), "tract".to_string()),
            ("in".to_string(), "state:36 county:001".to_string()),
        ]);
    }

    #[test]
    fn implicit_wildcards_appear_in_in_component() {
        let query = CensusGeographyQuerySpec::from_filters(
            "dec/pl", 2020, &["P1_001N"], &spec(&[("state", "34"), ("block_group", "*")]),
        ).unwrap();
        assert_eq!(query.for_component(), "block group");
        assert_eq!(query.in_component().as_deref(), Some("state:34 county:* tract:*"));
    }

    #[test]
    fn root_only_query_has_no_in() {
        let query = CensusGeographyQuerySpec::from_filters("acs/acs1", 2019, &["NAME"], &spec(&[("state", "06")]))
            .unwrap()
            .with_api_key(Some("secret".into()));
        assert_eq!(query.for_component(), "state:06");
        assert!(query.in_component().is_none());
        let params = query.params();
        assert_eq!(params.len(), 3);
        assert_eq!(params[2], ("key".to_string(), "secret".to_string()));
    }

    #[test]
    fn list_values_in_for_component() {
        let mut filters = spec(&[("state", "36")]);
        filters.insert("county", vec!["001", "005"]);
        let query = CensusGeographyQuerySpec::from_filters("acs/acs5", 2020, &["NAME"], &filters).unwrap();
        assert_eq!(query.for_component(), "county:001,005");
        assert_eq!(query.in_component().as_deref(), Some("state:36"));
    }

    #[test]
    fn fields_split_into_batches() {
        let fields: Vec<String> = (0..120).map(|i| format!("B{i:05}_001E")).collect();
        let query = CensusGeographyQuerySpec::from_filters("acs/acs5", 2020, &fields, &spec(&[("state", "*")])).unwrap();
        let batches = query.batches(50);
        assert_eq!(batches.iter().map(|b| b.fields().len()).collect::<Vec<_>>(), vec![50, 50, 20]);
        assert_eq!(batches[2].fields()[19], "B00119_001E");
        assert!(batches.iter().all(|b| b.bound() == query.bound()));
    }
}
