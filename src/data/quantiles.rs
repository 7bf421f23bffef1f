//! Quartile buckets and decile boundaries over the unfiltered node table

use serde::Serialize;

use crate::data::filter::Attribute;
use crate::data::NodeTable;

/// Quantile with linear interpolation between the closest ranks.
/// `sorted` must be ascending; returns `None` when empty.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

fn sorted_values(table: &NodeTable, attribute: Attribute) -> Vec<f64> {
    let mut values = table.numeric_column(attribute).unwrap_or_default();
    values.sort_by(f64::total_cmp);
    values
}

/// Five-number summary used to build the four quartile buckets
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quartiles {
    pub lowest: i64,
    pub q1: i64,
    pub median: i64,
    pub q3: i64,
    pub highest: i64,
}

impl Quartiles {
    fn from_sorted(sorted: &[f64]) -> Option<Self> {
        Some(Self {
            lowest: *sorted.first()? as i64,
            q1: quantile(sorted, 0.25)? as i64,
            median: quantile(sorted, 0.5)? as i64,
            q3: quantile(sorted, 0.75)? as i64,
            highest: *sorted.last()? as i64,
        })
    }

    /// Range strings in the `"low - high"` form accepted by range filters
    pub fn bucket_labels(&self) -> Vec<String> {
        vec![
            format!("{} - {}", self.lowest, self.q1),
            format!("{} - {}", self.q1 + 1, self.median),
            format!("{} - {}", self.median + 1, self.q3),
            format!("{} - {}", self.q3 + 1, self.highest),
        ]
    }
}

/// Quantile helpers computed once from the base node table
#[derive(Debug, Clone, Default, Serialize)]
pub struct AttributeQuantiles {
    sales_rank: Option<Quartiles>,
    num_reviews: Option<Quartiles>,
    num_pages: Vec<f64>,
    price: Vec<f64>,
    genres: Vec<String>,
    ratings: Vec<f64>,
}

impl AttributeQuantiles {
    pub fn from_table(table: &NodeTable) -> Self {
        let deciles = |attribute| {
            let sorted = sorted_values(table, attribute);
            (0..=10)
                .filter_map(|i| quantile(&sorted, i as f64 * 0.1))
                .collect::<Vec<_>>()
        };

        let mut genres: Vec<String> = table.rows.iter().map(|p| p.genre.clone()).collect();
        genres.sort();
        genres.dedup();

        let mut ratings = sorted_values(table, Attribute::AvgRating);
        ratings.dedup();

        Self {
            sales_rank: Quartiles::from_sorted(&sorted_values(table, Attribute::SalesRank)),
            num_reviews: Quartiles::from_sorted(&sorted_values(table, Attribute::NumReviews)),
            num_pages: deciles(Attribute::NumPages),
            price: deciles(Attribute::Price),
            genres,
            ratings,
        }
    }

    /// Exact decile boundary `index` (0..=10) of a decile-filtered attribute
    pub fn decile(&self, attribute: Attribute, index: u8) -> Option<f64> {
        let boundaries = match attribute {
            Attribute::NumPages => &self.num_pages,
            Attribute::Price => &self.price,
            _ => return None,
        };
        boundaries.get(index as usize).copied()
    }

    pub fn sales_rank_buckets(&self) -> Vec<String> {
        self.sales_rank
            .map(|q| q.bucket_labels())
            .unwrap_or_default()
    }

    pub fn review_buckets(&self) -> Vec<String> {
        self.num_reviews
            .map(|q| q.bucket_labels())
            .unwrap_or_default()
    }

    /// Integer-truncated page count deciles
    pub fn num_pages_deciles(&self) -> Vec<i64> {
        self.num_pages.iter().map(|&v| v as i64).collect()
    }

    /// Price deciles rounded to cents
    pub fn price_deciles(&self) -> Vec<f64> {
        self.price
            .iter()
            .map(|&v| (v * 100.0).round() / 100.0)
            .collect()
    }

    pub fn unique_genres(&self) -> &[String] {
        &self.genres
    }

    pub fn unique_ratings(&self) -> &[f64] {
        &self.ratings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Product;

    fn table(values: &[(i64, f64)]) -> NodeTable {
        NodeTable::new(
            values
                .iter()
                .enumerate()
                .map(|(i, &(rank, price))| Product {
                    id: i as i64,
                    genre: if i % 2 == 0 { "B" } else { "A" }.to_string(),
                    num_pages: rank,
                    price,
                    sales_rank: rank,
                    avg_rating: if i % 2 == 0 { 4.0 } else { 4.5 },
                    num_reviews: rank * 2,
                })
                .collect(),
        )
    }

    #[test]
    fn test_quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile(&sorted, 0.5), Some(2.5));
        assert_eq!(quantile(&sorted, 1.0), Some(4.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_sales_rank_buckets() {
        let t = table(&[(1, 1.0), (3, 2.0), (5, 3.0), (7, 4.0), (9, 5.0)]);
        let q = AttributeQuantiles::from_table(&t);
        assert_eq!(
            q.sales_rank_buckets(),
            vec!["1 - 3", "4 - 5", "6 - 7", "8 - 9"]
        );
    }

    #[test]
    fn test_deciles_cover_range() {
        let t = table(&[(0, 0.0), (10, 1.0)]);
        let q = AttributeQuantiles::from_table(&t);
        assert_eq!(q.num_pages_deciles(), vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(q.price_deciles()[3], 0.3);
        assert_eq!(q.decile(Attribute::Price, 10), Some(1.0));
        assert_eq!(q.decile(Attribute::Genre, 1), None);
        assert_eq!(q.unique_genres(), ["A", "B"]);
        assert_eq!(q.unique_ratings(), [4.0, 4.5]);
    }
}
