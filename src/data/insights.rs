//! Summary statistics over a node table

use std::collections::BTreeMap;

use serde::Serialize;
use statrs::statistics::Statistics;

use crate::data::filter::Attribute;
use crate::data::NodeTable;
use crate::error::{AnalysisError, Result};

/// Min / max / mean of one numeric attribute
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Spread {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl Spread {
    fn of(values: &[f64]) -> Self {
        Self {
            min: values.min(),
            max: values.max(),
            mean: values.mean(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub products: usize,
    pub most_common_genre: String,
    pub num_pages: Spread,
    pub price: Spread,
    pub num_reviews: Spread,
    pub avg_rating: f64,
}

/// Dataset-level indicators for the overview panel
pub fn insights(table: &NodeTable) -> Result<Insights> {
    if table.is_empty() {
        return Err(AnalysisError::InsufficientData {
            operation: "insights",
            rows: 0,
        });
    }

    let mut genre_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for product in &table.rows {
        *genre_counts.entry(product.genre.as_str()).or_insert(0) += 1;
    }
    // BTreeMap iterates in name order, so the first maximum wins ties
    let most_common_genre = genre_counts
        .iter()
        .fold(None::<(&str, usize)>, |best, (&genre, &count)| match best {
            Some((_, top)) if top >= count => best,
            _ => Some((genre, count)),
        })
        .map(|(genre, _)| genre.to_string())
        .unwrap_or_default();

    let column = |attribute| table.numeric_column(attribute).unwrap_or_default();

    Ok(Insights {
        products: table.len(),
        most_common_genre,
        num_pages: Spread::of(&column(Attribute::NumPages)),
        price: Spread::of(&column(Attribute::Price)),
        num_reviews: Spread::of(&column(Attribute::NumReviews)),
        avg_rating: column(Attribute::AvgRating).mean(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Product;

    fn product(id: i64, genre: &str, price: f64) -> Product {
        Product {
            id,
            genre: genre.to_string(),
            num_pages: 100 * id,
            price,
            sales_rank: id,
            avg_rating: 4.0,
            num_reviews: 10,
        }
    }

    #[test]
    fn test_insights() {
        let table = NodeTable::new(vec![
            product(1, "Mystery", 5.0),
            product(2, "Fantasy", 15.0),
            product(3, "Mystery", 10.0),
            product(4, "Fantasy", 30.0),
        ]);
        let summary = insights(&table).unwrap();
        assert_eq!(summary.products, 4);
        assert_eq!(summary.most_common_genre, "Fantasy");
        assert_eq!(summary.price.min, 5.0);
        assert_eq!(summary.price.max, 30.0);
        assert_eq!(summary.price.mean, 15.0);
        assert_eq!(summary.num_pages.max, 400.0);
        assert_eq!(summary.avg_rating, 4.0);
    }

    #[test]
    fn test_empty_table() {
        assert!(matches!(
            insights(&NodeTable::default()),
            Err(AnalysisError::InsufficientData { .. })
        ));
    }
}
