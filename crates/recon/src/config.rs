use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::columns::ColumnOverrides;
use crate::error::InputError;
use crate::model::Location;

// ---------------------------------------------------------------------------
// Join options
// ---------------------------------------------------------------------------

/// How product rows and location rows are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    /// Normalized identifier column.
    #[default]
    Identifier,
    /// `"<title> - <size>"`, falling back to the title alone.
    TitleSize,
}

/// What happens when one location file lists the same key twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Last row wins.
    #[default]
    Last,
    /// Quantities are added up.
    Sum,
}

/// Where location columns go in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    #[default]
    End,
    AfterKey,
}

/// How order groups are separated in the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Separator {
    /// Alternating fill colour per group.
    #[default]
    Colors,
    /// An empty row between groups.
    BlankRow,
}

macro_rules! snake_case_enum {
    ($ty:ty, $($variant:path => $name:literal),+ $(,)?) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $($variant => write!(f, $name),)+
                }
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().replace('-', "_").as_str() {
                    $($name => Ok($variant),)+
                    other => Err(format!(
                        "invalid value '{other}' (expected one of: {})",
                        [$($name),+].join(", ")
                    )),
                }
            }
        }
    };
}

snake_case_enum!(KeyStrategy, KeyStrategy::Identifier => "identifier", KeyStrategy::TitleSize => "title_size");
snake_case_enum!(DuplicatePolicy, DuplicatePolicy::Last => "last", DuplicatePolicy::Sum => "sum");
snake_case_enum!(Placement, Placement::End => "end", Placement::AfterKey => "after_key");
snake_case_enum!(Separator, Separator::Colors => "colors", Separator::BlankRow => "blank_row");

/// Options the join itself needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JoinOptions {
    pub strategy: KeyStrategy,
    pub duplicates: DuplicatePolicy,
}

// ---------------------------------------------------------------------------
// Job file
// ---------------------------------------------------------------------------

/// A reconciliation job, usually read from a TOML file.
///
/// ```toml
/// name = "Daily stock"
/// products = "products.xlsx"
/// output = "Inventory_Report.xlsx"
///
/// [match]
/// strategy = "identifier"
/// duplicates = "last"
///
/// [locations]
/// Ecom = "ecom.xlsx"
/// Wari = { file = "wari.csv", key_column = "Code", stock_column = "Qty" }
///
/// [layout]
/// placement = "after_key"
/// group_by = "auto"
/// separator = "colors"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub products: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default, rename = "match")]
    pub matching: MatchConfig,
    #[serde(default)]
    pub locations: BTreeMap<String, LocationSource>,
    #[serde(default)]
    pub layout: LayoutConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchConfig {
    #[serde(default)]
    pub strategy: KeyStrategy,
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
    /// Identifier column used for every file unless a location overrides it.
    #[serde(default)]
    pub key_column: Option<String>,
    #[serde(default)]
    pub stock_column: Option<String>,
    #[serde(default)]
    pub size_column: Option<String>,
    /// Secondary SKU column (title/size keying only).
    #[serde(default)]
    pub sku_column: Option<String>,
}

/// A location entry: either a bare path or a table with column overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LocationSource {
    Path(String),
    Detailed(LocationFileConfig),
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationFileConfig {
    pub file: String,
    #[serde(default)]
    pub key_column: Option<String>,
    #[serde(default)]
    pub stock_column: Option<String>,
    #[serde(default)]
    pub size_column: Option<String>,
    /// Secondary SKU column (title/size keying only).
    #[serde(default)]
    pub sku_column: Option<String>,
}

impl LocationSource {
    pub fn file(&self) -> &str {
        match self {
            Self::Path(p) => p,
            Self::Detailed(d) => &d.file,
        }
    }

    fn detail(&self) -> Option<&LocationFileConfig> {
        match self {
            Self::Path(_) => None,
            Self::Detailed(d) => Some(d),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutConfig {
    #[serde(default)]
    pub placement: Placement,
    /// Column to group rows by, or `"auto"`.
    #[serde(default)]
    pub group_by: Option<String>,
    #[serde(default)]
    pub separator: Separator,
    #[serde(default)]
    pub sheet_name: Option<String>,
}

pub const DEFAULT_SHEET_NAME: &str = "Stock";
pub const DEFAULT_OUTPUT: &str = "Inventory_Report.xlsx";

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl JobConfig {
    pub fn from_toml(input: &str) -> Result<Self, InputError> {
        let config: JobConfig =
            toml::from_str(input).map_err(|e| InputError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        if let Some(ref products) = self.products {
            if products.trim().is_empty() {
                return Err(InputError::ConfigValidation("products path is empty".into()));
            }
        }

        if let Some(ref output) = self.output {
            if output.trim().is_empty() {
                return Err(InputError::ConfigValidation("output path is empty".into()));
            }
        }

        // Names must be known and unique after case folding
        self.resolved_locations()?;

        for (name, source) in &self.locations {
            if source.file().trim().is_empty() {
                return Err(InputError::ConfigValidation(format!(
                    "location '{name}': file path is empty"
                )));
            }
        }

        if let Some(ref group_by) = self.layout.group_by {
            if group_by.trim().is_empty() {
                return Err(InputError::ConfigValidation("layout.group_by is empty".into()));
            }
        }

        if let Some(ref sheet) = self.layout.sheet_name {
            validate_sheet_name(sheet)?;
        }

        Ok(())
    }

    /// Location entries keyed by their parsed `Location`.
    pub fn resolved_locations(&self) -> Result<BTreeMap<Location, LocationSource>, InputError> {
        let mut out = BTreeMap::new();
        for (name, source) in &self.locations {
            let location: Location = name.parse()?;
            if out.insert(location, source.clone()).is_some() {
                return Err(InputError::DuplicateLocation(location.to_string()));
            }
        }
        Ok(out)
    }

    /// Column overrides for the product list.
    pub fn product_overrides(&self) -> ColumnOverrides {
        ColumnOverrides {
            key: self.matching.key_column.clone(),
            stock: None,
            size: None,
            sku: self.matching.sku_column.clone(),
        }
    }

    /// Column overrides for one location: per-location entries win over
    /// the `[match]` defaults.
    pub fn location_overrides(&self, source: &LocationSource) -> ColumnOverrides {
        let detail = source.detail();
        let pick = |own: Option<&Option<String>>, fallback: &Option<String>| {
            own.and_then(|o| o.clone()).or_else(|| fallback.clone())
        };
        ColumnOverrides {
            key: pick(detail.map(|d| &d.key_column), &self.matching.key_column),
            stock: pick(detail.map(|d| &d.stock_column), &self.matching.stock_column),
            size: pick(detail.map(|d| &d.size_column), &self.matching.size_column),
            sku: pick(detail.map(|d| &d.sku_column), &self.matching.sku_column),
        }
    }

    pub fn join_options(&self) -> JoinOptions {
        JoinOptions {
            strategy: self.matching.strategy,
            duplicates: self.matching.duplicates,
        }
    }

    pub fn sheet_name(&self) -> &str {
        self.layout.sheet_name.as_deref().unwrap_or(DEFAULT_SHEET_NAME)
    }

    pub fn output_path(&self) -> &str {
        self.output.as_deref().unwrap_or(DEFAULT_OUTPUT)
    }
}

/// Excel sheet names: 1-31 characters, none of `[]:*?/\`.
pub fn validate_sheet_name(name: &str) -> Result<(), InputError> {
    let len = name.chars().count();
    if len == 0 || len > 31 {
        return Err(InputError::ConfigValidation(format!(
            "sheet name '{name}' must be 1-31 characters"
        )));
    }
    if name.chars().any(|c| matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\')) {
        return Err(InputError::ConfigValidation(format!(
            "sheet name '{name}' contains one of []:*?/\\"
        )));
    }
    Ok(())
}
