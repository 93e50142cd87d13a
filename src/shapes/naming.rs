use std::fmt;

use crate::{
    geography::{column_name, normalize_level},
    shapes::{BoundarySource, Resolution, Scope, ShapefileDescriptor},
    Error, Result,
};

/// Geography levels that have published boundary files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GeoLevelKind {
    State,
    County,
    CountySubdivision,
    Tract,
    BlockGroup,
    Block,
    Place,
    CongressionalDistrict,
    StateLegislativeUpper,
    StateLegislativeLower,
    ZipCodeTabulationArea,
    PublicUseMicrodataArea,
    SchoolDistrictElementary,
    SchoolDistrictSecondary,
    SchoolDistrictUnified,
}

/// Which naming convention a boundary file's attribute columns follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnEra {
    /// 2010 generalized files: `STATE`, `COUNTY`, `TRACT`, `BLKGRP`.
    Gz2010,
    /// 2010 TIGER/Line files: every column carries a `10` suffix.
    Tiger2010,
    /// 2011 onward: `STATEFP`, `COUNTYFP`, `TRACTCE`, `BLKGRPCE`.
    Unsuffixed,
    /// 2008 and 2009 TIGER/Line files of the 2000 delineation: `STATEFP00`, `TRACTCE00`.
    Census2000,
}

/// One identifier column to join on: the tabular name, the boundary-file name and its FIPS width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinColumn {
    pub level: &'static str,
    pub data: String,
    pub shape: String,
    pub width: usize,
}

/// How to find and join the boundary file for one level in one vintage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapefileRule {
    kind: GeoLevelKind,
    year: u16,
    source: BoundarySource,
    national: bool,
    token: String,
    tiger_dir: String,
    columns: Vec<JoinColumn>,
    published: bool,
}

/// First vintage with TIGER/Line shapefiles on the boundary host.
pub const LEGACY_TIGER_SINCE: u16 = 2008;

/// First vintage with generalized school-district files. Earlier years use TIGER/Line only.
pub const SCHOOL_DISTRICT_CARTOGRAPHIC_SINCE: u16 = 2016;

/// Number of the Congress whose districts are published in a given vintage.
///
/// Districts are redrawn after each decennial census, so the token is
/// irregular around 2012 and 2022.
pub fn congress_for_year(year: u16) -> u16 {
    match year {
        2010 => 111,
        2011..=2012 => 112,
        2013 => 113,
        2014..=2015 => 114,
        2016..=2017 => 115,
        2018..=2021 => 116,
        2022..=2023 => 118,
        y if y >= 2024 => 119,
        y => (y.saturating_sub(1789) / 2 + 1).max(1),
    }
}

/// Attribute naming era for a vintage and file source.
pub fn column_era(year: u16, source: BoundarySource) -> ColumnEra {
    match (year, source) {
        (..=2009, _) => ColumnEra::Census2000,
        (2010, BoundarySource::Cartographic) => ColumnEra::Gz2010,
        (2010, BoundarySource::Tiger) => ColumnEra::Tiger2010,
        _ => ColumnEra::Unsuffixed,
    }
}

/// Whether any boundary file for `kind` is published for `year`.
///
/// The 2008 and 2009 releases are only used for the 2000-delineation state, county,
/// tract, block group and block files; nothing older is served as shapefiles.
pub fn published(kind: GeoLevelKind, year: u16) -> bool {
    use GeoLevelKind::*;
    match year {
        2010.. => true,
        LEGACY_TIGER_SINCE..=2009 => matches!(kind, State | County | Tract | BlockGroup | Block),
        _ => false,
    }
}

/// Directory holding one state's files in the 2008 and 2009 releases, e.g. `36_NEW_YORK`.
pub fn legacy_state_directory(fips: &str) -> Option<String> {
    let name = match fips {
        "01" => "ALABAMA", "02" => "ALASKA", "04" => "ARIZONA", "05" => "ARKANSAS",
        "06" => "CALIFORNIA", "08" => "COLORADO", "09" => "CONNECTICUT", "10" => "DELAWARE",
        "11" => "DISTRICT_OF_COLUMBIA", "12" => "FLORIDA", "13" => "GEORGIA", "15" => "HAWAII",
        "16" => "IDAHO", "17" => "ILLINOIS", "18" => "INDIANA", "19" => "IOWA",
        "20" => "KANSAS", "21" => "KENTUCKY", "22" => "LOUISIANA", "23" => "MAINE",
        "24" => "MARYLAND", "25" => "MASSACHUSETTS", "26" => "MICHIGAN", "27" => "MINNESOTA",
        "28" => "MISSISSIPPI", "29" => "MISSOURI", "30" => "MONTANA", "31" => "NEBRASKA",
        "32" => "NEVADA", "33" => "NEW_HAMPSHIRE", "34" => "NEW_JERSEY", "35" => "NEW_MEXICO",
        "36" => "NEW_YORK", "37" => "NORTH_CAROLINA", "38" => "NORTH_DAKOTA", "39" => "OHIO",
        "40" => "OKLAHOMA", "41" => "OREGON", "42" => "PENNSYLVANIA", "44" => "RHODE_ISLAND",
        "45" => "SOUTH_CAROLINA", "46" => "SOUTH_DAKOTA", "47" => "TENNESSEE", "48" => "TEXAS",
        "49" => "UTAH", "50" => "VERMONT", "51" => "VIRGINIA", "53" => "WASHINGTON",
        "54" => "WEST_VIRGINIA", "55" => "WISCONSIN", "56" => "WYOMING", "72" => "PUERTO_RICO",
        _ => return None,
    };
    Some(format!("{fips}_{name}"))
}

/// Census whose ZCTA delineation a vintage carries: `10` through 2019, `20` after.
pub fn zcta_vintage(year: u16) -> u16 {
    if year >= 2020 { 20 } else { 10 }
}

/// PUMA delineation: the 2020-based areas first appear in the 2022 files.
pub fn puma_vintage(year: u16) -> u16 {
    if year >= 2022 { 20 } else { 10 }
}

/// Tabulation block delineation: `10` through 2019, `20` after.
pub fn tabblock_vintage(year: u16) -> u16 {
    if year >= 2020 { 20 } else { 10 }
}

/// Whether a generalized (cartographic boundary) file exists for `kind` in `year`.
pub fn cartographic_available(kind: GeoLevelKind, year: u16) -> bool {
    use GeoLevelKind::*;
    match year {
        ..=2009 | 2011 | 2012 => false,
        2010 => kind.gz_summary_level().is_some(),
        _ => match kind {
            Block => false,
            SchoolDistrictElementary | SchoolDistrictSecondary | SchoolDistrictUnified => {
                year >= SCHOOL_DISTRICT_CARTOGRAPHIC_SINCE
            }
            _ => true,
        },
    }
}

impl GeoLevelKind {
    pub const ALL: [GeoLevelKind; 15] = [
        GeoLevelKind::State,
        GeoLevelKind::County,
        GeoLevelKind::CountySubdivision,
        GeoLevelKind::Tract,
        GeoLevelKind::BlockGroup,
        GeoLevelKind::Block,
        GeoLevelKind::Place,
        GeoLevelKind::CongressionalDistrict,
        GeoLevelKind::StateLegislativeUpper,
        GeoLevelKind::StateLegislativeLower,
        GeoLevelKind::ZipCodeTabulationArea,
        GeoLevelKind::PublicUseMicrodataArea,
        GeoLevelKind::SchoolDistrictElementary,
        GeoLevelKind::SchoolDistrictSecondary,
        GeoLevelKind::SchoolDistrictUnified,
    ];

    /// Catalog level name.
    pub fn level(self) -> &'static str {
        match self {
            GeoLevelKind::State => "state",
            GeoLevelKind::County => "county",
            GeoLevelKind::CountySubdivision => "county subdivision",
            GeoLevelKind::Tract => "tract",
            GeoLevelKind::BlockGroup => "block group",
            GeoLevelKind::Block => "block",
            GeoLevelKind::Place => "place",
            GeoLevelKind::CongressionalDistrict => "congressional district",
            GeoLevelKind::StateLegislativeUpper => "state legislative district (upper chamber)",
            GeoLevelKind::StateLegislativeLower => "state legislative district (lower chamber)",
            GeoLevelKind::ZipCodeTabulationArea => "zip code tabulation area",
            GeoLevelKind::PublicUseMicrodataArea => "public use microdata area",
            GeoLevelKind::SchoolDistrictElementary => "school district (elementary)",
            GeoLevelKind::SchoolDistrictSecondary => "school district (secondary)",
            GeoLevelKind::SchoolDistrictUnified => "school district (unified)",
        }
    }

    /// Look up the kind for a (loosely written) level name.
    pub fn from_level(level: &str) -> Result<Self> {
        let level = normalize_level(level);
        Self::ALL.iter()
            .copied()
            .find(|kind| kind.level() == level)
            .ok_or_else(|| Error::GeometryNotSupportedForLevel {
                level,
                supported: Self::ALL.iter().map(|k| k.level().to_string()).collect(),
            })
    }

    /// Published as a single national file rather than one file per state.
    pub fn is_national(self) -> bool {
        matches!(self,
            GeoLevelKind::State | GeoLevelKind::County
            | GeoLevelKind::CongressionalDistrict | GeoLevelKind::ZipCodeTabulationArea)
    }

    /// Summary level and file variant of the 2010 generalized file, if one was published.
    pub fn gz_summary_level(self) -> Option<&'static str> {
        match self {
            GeoLevelKind::State => Some("040_00"),
            GeoLevelKind::County => Some("050_00"),
            GeoLevelKind::CountySubdivision => Some("060_00"),
            GeoLevelKind::Tract => Some("140_00"),
            GeoLevelKind::BlockGroup => Some("150_00"),
            GeoLevelKind::Place => Some("160_00"),
            GeoLevelKind::CongressionalDistrict => Some("500_11"),
            GeoLevelKind::ZipCodeTabulationArea => Some("860_00"),
            _ => None,
        }
    }

    /// Levels whose identifiers make up the join key, outermost first.
    fn key_levels(self) -> &'static [GeoLevelKind] {
        use GeoLevelKind::*;
        match self {
            State => &[State],
            County => &[State, County],
            CountySubdivision => &[State, County, CountySubdivision],
            Tract => &[State, County, Tract],
            BlockGroup => &[State, County, Tract, BlockGroup],
            Block => &[State, County, Tract, Block],
            Place => &[State, Place],
            CongressionalDistrict => &[State, CongressionalDistrict],
            StateLegislativeUpper => &[State, StateLegislativeUpper],
            StateLegislativeLower => &[State, StateLegislativeLower],
            ZipCodeTabulationArea => &[ZipCodeTabulationArea],
            PublicUseMicrodataArea => &[State, PublicUseMicrodataArea],
            SchoolDistrictElementary => &[State, SchoolDistrictElementary],
            SchoolDistrictSecondary => &[State, SchoolDistrictSecondary],
            SchoolDistrictUnified => &[State, SchoolDistrictUnified],
        }
    }

    /// FIPS identifier width.
    pub fn width(self) -> usize {
        match self {
            GeoLevelKind::State | GeoLevelKind::CongressionalDistrict => 2,
            GeoLevelKind::County | GeoLevelKind::StateLegislativeUpper | GeoLevelKind::StateLegislativeLower => 3,
            GeoLevelKind::Tract => 6,
            GeoLevelKind::BlockGroup => 1,
            GeoLevelKind::Block => 4,
            _ => 5,
        }
    }

    /// Column name in 2011+ files, before any delineation suffix.
    fn shape_column_stem(self, congress: u16) -> String {
        match self {
            GeoLevelKind::State => "STATEFP".into(),
            GeoLevelKind::County => "COUNTYFP".into(),
            GeoLevelKind::CountySubdivision => "COUSUBFP".into(),
            GeoLevelKind::Tract => "TRACTCE".into(),
            GeoLevelKind::BlockGroup => "BLKGRPCE".into(),
            GeoLevelKind::Block => "BLOCKCE".into(),
            GeoLevelKind::Place => "PLACEFP".into(),
            GeoLevelKind::CongressionalDistrict => format!("CD{congress}FP"),
            GeoLevelKind::StateLegislativeUpper => "SLDUST".into(),
            GeoLevelKind::StateLegislativeLower => "SLDLST".into(),
            GeoLevelKind::ZipCodeTabulationArea => "ZCTA5CE".into(),
            GeoLevelKind::PublicUseMicrodataArea => "PUMACE".into(),
            GeoLevelKind::SchoolDistrictElementary => "ELSDLEA".into(),
            GeoLevelKind::SchoolDistrictSecondary => "SCSDLEA".into(),
            GeoLevelKind::SchoolDistrictUnified => "UNSDLEA".into(),
        }
    }

    /// Column name in the 2010 generalized files.
    fn gz_column(self) -> &'static str {
        match self {
            GeoLevelKind::State => "STATE",
            GeoLevelKind::County => "COUNTY",
            GeoLevelKind::CountySubdivision => "COUSUB",
            GeoLevelKind::Tract => "TRACT",
            GeoLevelKind::BlockGroup => "BLKGRP",
            GeoLevelKind::Block => "BLOCK",
            GeoLevelKind::Place => "PLACE",
            GeoLevelKind::CongressionalDistrict => "CD",
            GeoLevelKind::ZipCodeTabulationArea => "ZCTA5",
            GeoLevelKind::StateLegislativeUpper => "SLDU",
            GeoLevelKind::StateLegislativeLower => "SLDL",
            GeoLevelKind::PublicUseMicrodataArea => "PUMA5",
            GeoLevelKind::SchoolDistrictElementary => "SDELM",
            GeoLevelKind::SchoolDistrictSecondary => "SDSEC",
            GeoLevelKind::SchoolDistrictUnified => "SDUNI",
        }
    }

    /// Delineation suffix every column of the file carries regardless of era, if any.
    fn delineation_suffix(self, year: u16) -> Option<u16> {
        match self {
            GeoLevelKind::ZipCodeTabulationArea => Some(zcta_vintage(year)),
            GeoLevelKind::PublicUseMicrodataArea => Some(puma_vintage(year)),
            GeoLevelKind::Block => Some(tabblock_vintage(year)),
            _ => None,
        }
    }

    /// File-name token and TIGER directory for 2011+ vintages.
    fn token_and_dir(self, year: u16) -> (String, String) {
        let plain = |token: &str| (token.to_string(), token.to_ascii_uppercase());
        match self {
            GeoLevelKind::State => plain("state"),
            GeoLevelKind::County => plain("county"),
            GeoLevelKind::CountySubdivision => plain("cousub"),
            GeoLevelKind::Tract => plain("tract"),
            GeoLevelKind::BlockGroup => plain("bg"),
            GeoLevelKind::Place => plain("place"),
            GeoLevelKind::StateLegislativeUpper => plain("sldu"),
            GeoLevelKind::StateLegislativeLower => plain("sldl"),
            GeoLevelKind::SchoolDistrictElementary => plain("elsd"),
            GeoLevelKind::SchoolDistrictSecondary => plain("scsd"),
            GeoLevelKind::SchoolDistrictUnified => plain("unsd"),
            GeoLevelKind::CongressionalDistrict => (format!("cd{}", congress_for_year(year)), "CD".into()),
            GeoLevelKind::ZipCodeTabulationArea => {
                let v = zcta_vintage(year);
                (format!("zcta5{v}"), if v == 10 { "ZCTA5".into() } else { format!("ZCTA5{v}") })
            }
            GeoLevelKind::PublicUseMicrodataArea => (format!("puma{}", puma_vintage(year)), "PUMA".into()),
            GeoLevelKind::Block => {
                let v = tabblock_vintage(year);
                (format!("tabblock{v}"), if v == 10 { "TABBLOCK".into() } else { format!("TABBLOCK{v}") })
            }
        }
    }

    /// File-name token and TIGER directory for the 2010 TIGER/Line release.
    fn tiger2010_token_and_dir(self) -> (String, String) {
        match self {
            GeoLevelKind::CongressionalDistrict => ("cd111".into(), "CD/111".into()),
            GeoLevelKind::ZipCodeTabulationArea => ("zcta510".into(), "ZCTA5/2010".into()),
            GeoLevelKind::PublicUseMicrodataArea => ("puma10".into(), "PUMA5/2010".into()),
            GeoLevelKind::Block => ("tabblock10".into(), "TABBLOCK/2010".into()),
            other => {
                let (token, dir) = other.token_and_dir(2011);
                (format!("{token}10"), format!("{dir}/2010"))
            }
        }
    }

    /// File-name token for the 2008 and 2009 releases. National files sit at the release root.
    fn legacy_token(self) -> String {
        match self {
            GeoLevelKind::State => "state".into(),
            GeoLevelKind::County => "county".into(),
            GeoLevelKind::Tract => "tract00".into(),
            GeoLevelKind::BlockGroup => "bg00".into(),
            GeoLevelKind::Block => "tabblock00".into(),
            other => format!("{}00", other.token_and_dir(2011).0),
        }
    }

    fn shape_column(self, year: u16, era: ColumnEra, file_suffix: Option<u16>) -> String {
        let congress = congress_for_year(year);
        match era {
            ColumnEra::Gz2010 => self.gz_column().to_string(),
            ColumnEra::Census2000 => format!("{}00", self.shape_column_stem(congress)),
            ColumnEra::Tiger2010 if self == GeoLevelKind::CongressionalDistrict => format!("CD{congress}FP"),
            ColumnEra::Tiger2010 => format!("{}10", self.shape_column_stem(congress)),
            ColumnEra::Unsuffixed => match (self, file_suffix) {
                (GeoLevelKind::CongressionalDistrict, _) | (_, None) => self.shape_column_stem(congress),
                (_, Some(v)) => format!("{}{v}", self.shape_column_stem(congress)),
            },
        }
    }

    /// Resolve the boundary file and join columns for `year`.
    ///
    /// Generalized files are preferred when `prefer` asks for them and they exist
    /// for this level and year; otherwise the TIGER/Line file is used.
    pub fn rule(self, year: u16, prefer: BoundarySource) -> ShapefileRule {
        let source = match prefer {
            BoundarySource::Cartographic if cartographic_available(self, year) => BoundarySource::Cartographic,
            _ => BoundarySource::Tiger,
        };
        let era = column_era(year, source);

        let (token, tiger_dir) = match era {
            ColumnEra::Gz2010 => (self.gz_summary_level().unwrap_or_default().to_string(), String::new()),
            ColumnEra::Tiger2010 => self.tiger2010_token_and_dir(),
            ColumnEra::Unsuffixed => self.token_and_dir(year),
            ColumnEra::Census2000 => (self.legacy_token(), String::new()),
        };

        // Files carrying a delineation suffix apply it to every column, including STATEFP.
        let file_suffix = self.delineation_suffix(year);
        let columns = self.key_levels().iter()
            .map(|&part| {
                let shape = match (era, file_suffix) {
                    // national legacy files carry the current delineation's column names
                    (ColumnEra::Census2000, _) if self.is_national() => part.shape_column_stem(0),
                    (ColumnEra::Unsuffixed, Some(v)) if part != self => format!("{}{v}", part.shape_column_stem(0)),
                    _ => part.shape_column(year, era, file_suffix),
                };
                JoinColumn {
                    level: part.level(),
                    data: column_name(part.level()),
                    shape,
                    width: part.width(),
                }
            })
            .collect();

        ShapefileRule {
            kind: self,
            year,
            source,
            national: self.is_national(),
            token,
            tiger_dir,
            columns,
            published: published(self, year),
        }
    }
}

impl fmt::Display for GeoLevelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.level())
    }
}

impl ShapefileRule {
    #[inline] pub fn kind(&self) -> GeoLevelKind { self.kind }

    #[inline] pub fn year(&self) -> u16 { self.year }

    #[inline] pub fn source(&self) -> BoundarySource { self.source }

    /// `Some(Scope::Us)` for national files, `None` when the caller must pick a state.
    pub fn scope(&self) -> Option<Scope> {
        self.national.then_some(Scope::Us)
    }

    /// Geography token used in file names, e.g. `tract`, `cd116`, `zcta520`.
    #[inline] pub fn token(&self) -> &str { &self.token }

    /// Join columns, outermost level first.
    #[inline] pub fn columns(&self) -> &[JoinColumn] { &self.columns }

    /// Whether the boundary host serves files for this rule at all. See [`published`].
    #[inline] pub fn is_published(&self) -> bool { self.published }

    /// Descriptor for one scope. National files ignore `scope`.
    pub fn descriptor(&self, scope: Scope, resolution: Resolution) -> ShapefileDescriptor {
        let scope = if self.national { Scope::Us } else { scope };
        match self.source {
            BoundarySource::Cartographic => {
                let resolution = if self.national { resolution } else { Resolution::R500k };
                ShapefileDescriptor::cartographic(&self.token, scope, self.year, resolution)
            }
            BoundarySource::Tiger if self.year < 2010 => {
                let dir = match &scope {
                    Scope::State(code) => {
                        let code = format!("{code:0>2}");
                        legacy_state_directory(&code).unwrap_or(code)
                    }
                    _ => String::new(),
                };
                ShapefileDescriptor::tiger(&self.token, &dir, scope, self.year)
            }
            BoundarySource::Tiger => ShapefileDescriptor::tiger(&self.token, &self.tiger_dir, scope, self.year),
        }
    }

    /// One descriptor for national files, otherwise one per distinct state, in state order.
    /// Empty when nothing is published for the vintage.
    pub fn descriptors(&self, states: &[String], resolution: Resolution) -> Vec<ShapefileDescriptor> {
        if !self.published {
            return vec![];
        }
        if self.national {
            return vec![self.descriptor(Scope::Us, resolution)];
        }
        let mut states: Vec<&String> = states.iter().collect();
        states.sort();
        states.dedup();
        states.into_iter()
            .map(|s| self.descriptor(Scope::State(s.clone()), resolution))
            .collect()
    }
}
