//! Declarative node filtering

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::{AttributeQuantiles, NodeTable, Product};
use crate::error::{AnalysisError, Result};

/// Filterable product attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Genre,
    NumPages,
    Price,
    SalesRank,
    AvgRating,
    NumReviews,
}

impl Attribute {
    pub const NUMERIC: [Attribute; 5] = [
        Attribute::NumPages,
        Attribute::Price,
        Attribute::SalesRank,
        Attribute::AvgRating,
        Attribute::NumReviews,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Attribute::Genre => "genre",
            Attribute::NumPages => "num_pages",
            Attribute::Price => "price",
            Attribute::SalesRank => "sales_rank",
            Attribute::AvgRating => "avg_rating",
            Attribute::NumReviews => "num_reviews",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "genre" => Some(Attribute::Genre),
            "num_pages" => Some(Attribute::NumPages),
            "price" => Some(Attribute::Price),
            "sales_rank" => Some(Attribute::SalesRank),
            "avg_rating" => Some(Attribute::AvgRating),
            "num_reviews" => Some(Attribute::NumReviews),
            _ => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        self != Attribute::Genre
    }

    pub fn numeric_value(self, product: &Product) -> Option<f64> {
        match self {
            Attribute::Genre => None,
            Attribute::NumPages => Some(product.num_pages as f64),
            Attribute::Price => Some(product.price),
            Attribute::SalesRank => Some(product.sales_rank as f64),
            Attribute::AvgRating => Some(product.avg_rating),
            Attribute::NumReviews => Some(product.num_reviews as f64),
        }
    }

    /// The filter kind this attribute accepts
    fn expected_kind(self) -> FilterKind {
        match self {
            Attribute::Genre | Attribute::AvgRating => FilterKind::Values,
            Attribute::SalesRank | Attribute::NumReviews => FilterKind::Ranges,
            Attribute::NumPages | Attribute::Price => FilterKind::Deciles,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterKind {
    Values,
    Ranges,
    Deciles,
}

/// A categorical value: text for `genre`, number for `avg_rating`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Number(f64),
    Text(String),
}

/// One attribute's filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeFilter {
    /// Exact membership in a set of values
    Values(Vec<FilterValue>),
    /// Union of closed `"low - high"` ranges
    Ranges(Vec<String>),
    /// Decile indices `[low, high]` in 0..=10
    Deciles([u8; 2]),
}

impl AttributeFilter {
    fn kind(&self) -> FilterKind {
        match self {
            AttributeFilter::Values(_) => FilterKind::Values,
            AttributeFilter::Ranges(_) => FilterKind::Ranges,
            AttributeFilter::Deciles(_) => FilterKind::Deciles,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            AttributeFilter::Values(values) => values.is_empty(),
            AttributeFilter::Ranges(ranges) => ranges.is_empty(),
            AttributeFilter::Deciles(_) => false,
        }
    }
}

/// Closed numeric interval parsed from a `"low - high"` string
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    pub low: f64,
    pub high: f64,
}

impl NumericRange {
    pub fn parse(attribute: Attribute, text: &str) -> Result<Self> {
        let malformed = || AnalysisError::FilterRange {
            attribute: attribute.name().to_string(),
            range: text.to_string(),
        };
        let (low, high) = text.split_once(" - ").ok_or_else(malformed)?;
        let low = low.trim().parse::<f64>().map_err(|_| malformed())?;
        let high = high.trim().parse::<f64>().map_err(|_| malformed())?;
        Ok(Self { low, high })
    }

    /// Inverted ranges contain nothing
    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }
}

/// A validated filter specification. Active entries combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    filters: BTreeMap<Attribute, AttributeFilter>,

    #[serde(default)]
    node_ids: Option<BTreeSet<i64>>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter, rejecting kinds that do not fit the attribute
    pub fn with(mut self, attribute: Attribute, filter: AttributeFilter) -> Result<Self> {
        validate(attribute, &filter)?;
        self.filters.insert(attribute, filter);
        Ok(self)
    }

    /// Restrict the result to an explicit set of node ids
    pub fn with_node_ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.node_ids = Some(ids.into_iter().collect());
        self
    }

    /// Parse and validate a JSON filter document
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: FilterSpec = serde_json::from_str(json)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<()> {
        self.filters
            .iter()
            .try_for_each(|(&attribute, filter)| validate(attribute, filter))
    }

    /// True when no entry restricts anything
    pub fn is_empty(&self) -> bool {
        self.node_ids.is_none() && self.filters.values().all(AttributeFilter::is_empty)
    }

    /// Canonical key for caching
    pub fn cache_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn filters(&self) -> impl Iterator<Item = (&Attribute, &AttributeFilter)> {
        self.filters.iter()
    }

    pub fn node_ids(&self) -> Option<&BTreeSet<i64>> {
        self.node_ids.as_ref()
    }
}

fn validate(attribute: Attribute, filter: &AttributeFilter) -> Result<()> {
    let invalid = |reason: String| AnalysisError::InvalidFilter {
        attribute: attribute.name().to_string(),
        reason,
    };

    if filter.kind() != attribute.expected_kind() {
        return Err(invalid(format!(
            "expected a {:?} filter, got {:?}",
            attribute.expected_kind(),
            filter.kind()
        )));
    }

    match filter {
        AttributeFilter::Values(values) => {
            for value in values {
                let fits = match value {
                    FilterValue::Text(_) => attribute == Attribute::Genre,
                    FilterValue::Number(_) => attribute == Attribute::AvgRating,
                };
                if !fits {
                    return Err(invalid(format!("value {:?} has the wrong type", value)));
                }
            }
        }
        AttributeFilter::Deciles([low, high]) => {
            if *low > 10 || *high > 10 {
                return Err(invalid(format!("decile pair [{}, {}] outside 0..=10", low, high)));
            }
        }
        AttributeFilter::Ranges(_) => {}
    }
    Ok(())
}

/// Compiled per-attribute predicate
enum Predicate {
    Genres(BTreeSet<String>),
    Ratings(Vec<f64>),
    Ranges(Attribute, Vec<NumericRange>),
    Between(Attribute, f64, f64),
    Nothing,
}

impl Predicate {
    fn compile(
        attribute: Attribute,
        filter: &AttributeFilter,
        quantiles: &AttributeQuantiles,
    ) -> Predicate {
        match filter {
            AttributeFilter::Values(values) if attribute == Attribute::Genre => Predicate::Genres(
                values
                    .iter()
                    .filter_map(|v| match v {
                        FilterValue::Text(s) => Some(s.clone()),
                        FilterValue::Number(_) => None,
                    })
                    .collect(),
            ),
            AttributeFilter::Values(values) => Predicate::Ratings(
                values
                    .iter()
                    .filter_map(|v| match v {
                        FilterValue::Number(n) => Some(*n),
                        FilterValue::Text(_) => None,
                    })
                    .collect(),
            ),
            AttributeFilter::Ranges(ranges) => {
                let parsed = ranges
                    .iter()
                    .filter_map(|text| match NumericRange::parse(attribute, text) {
                        Ok(range) => Some(range),
                        Err(e) => {
                            log::warn!("{}; range contributes no rows", e);
                            None
                        }
                    })
                    .collect();
                Predicate::Ranges(attribute, parsed)
            }
            AttributeFilter::Deciles([low, high]) => {
                if low > high {
                    log::debug!("Inverted decile pair for {}, matching nothing", attribute);
                    return Predicate::Nothing;
                }
                match (
                    quantiles.decile(attribute, *low),
                    quantiles.decile(attribute, *high),
                ) {
                    (Some(lo), Some(hi)) => Predicate::Between(attribute, lo, hi),
                    _ => Predicate::Nothing,
                }
            }
        }
    }

    fn matches(&self, product: &Product) -> bool {
        match self {
            Predicate::Genres(genres) => genres.contains(&product.genre),
            Predicate::Ratings(ratings) => ratings.iter().any(|&r| r == product.avg_rating),
            Predicate::Ranges(attribute, ranges) => attribute
                .numeric_value(product)
                .is_some_and(|v| ranges.iter().any(|r| r.contains(v))),
            Predicate::Between(attribute, lo, hi) => attribute
                .numeric_value(product)
                .is_some_and(|v| *lo <= v && v <= *hi),
            Predicate::Nothing => false,
        }
    }
}

/// Reduce the node table to the rows matching every active filter.
/// Decile indices are resolved against the quantiles of the base table.
pub fn apply(table: &NodeTable, spec: &FilterSpec, quantiles: &AttributeQuantiles) -> NodeTable {
    let predicates: Vec<Predicate> = spec
        .filters
        .iter()
        .filter(|(_, filter)| !filter.is_empty())
        .map(|(&attribute, filter)| Predicate::compile(attribute, filter, quantiles))
        .collect();

    let rows: Vec<Product> = table
        .rows
        .iter()
        .filter(|p| predicates.iter().all(|pred| pred.matches(p)))
        .filter(|p| spec.node_ids.as_ref().map_or(true, |ids| ids.contains(&p.id)))
        .cloned()
        .collect();

    log::debug!(
        "Filter retained {} of {} products",
        rows.len(),
        table.len()
    );

    NodeTable::new(rows)
}
