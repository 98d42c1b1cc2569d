use crate::product::Product;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

/// The fixed set of selectable price ranges, keyed the way the storefront
/// filter widget names them.
pub static PRICE_BUCKETS: Lazy<Vec<(&'static str, PriceBucket)>> = Lazy::new(|| {
    vec![
        ("0-50", PriceBucket { min: 0, max: 50 }),
        ("50-100", PriceBucket { min: 50, max: 100 }),
        ("100-200", PriceBucket { min: 100, max: 200 }),
        ("200-500", PriceBucket { min: 200, max: 500 }),
        ("500-1000", PriceBucket { min: 500, max: 1000 }),
        ("1000-2000", PriceBucket { min: 1000, max: 2000 }),
        ("2000-99999", PriceBucket { min: 2000, max: 99999 }),
    ]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceBucket {
    pub min: u32,
    pub max: u32,
}

impl PriceBucket {
    /// Inclusive on both ends.
    pub fn contains(&self, price: Decimal) -> bool {
        price >= Decimal::from(self.min) && price <= Decimal::from(self.max)
    }
}

impl FromStr for PriceBucket {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PRICE_BUCKETS
            .iter()
            .find(|(key, _)| *key == s)
            .map(|(_, bucket)| *bucket)
            .ok_or_else(|| anyhow::anyhow!("Unknown price bucket {s}"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum SortKey {
    #[default]
    #[serde(rename = "featured")]
    Featured,
    #[serde(rename = "price-low")]
    PriceLow,
    #[serde(rename = "price-high")]
    PriceHigh,
    #[serde(rename = "name")]
    Name,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub search: Option<String>,
    pub category: Option<String>,
    pub price: Option<PriceBucket>,
    pub sort: SortKey,
}

/// Derives the displayed subset: the three predicates are ANDed, then the
/// sort key is applied. "featured" keeps catalog order; all sorts are stable
/// so identical inputs always yield identical output order.
pub fn apply(products: &[Product], filters: &Filters) -> Vec<Product> {
    let search = filters
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut out: Vec<Product> = products
        .iter()
        .filter(|p| {
            let text_ok = match &search {
                Some(q) => {
                    p.display_name.to_lowercase().contains(q)
                        || p.category.to_lowercase().contains(q)
                        || p
                            .color
                            .as_deref()
                            .is_some_and(|c| c.to_lowercase().contains(q))
                        || p
                            .material
                            .as_deref()
                            .is_some_and(|m| m.to_lowercase().contains(q))
                }
                None => true,
            };
            let category_ok = filters
                .category
                .as_deref()
                .map(|c| p.category == c)
                .unwrap_or(true);
            let price_ok = filters
                .price
                .map(|b| b.contains(p.price))
                .unwrap_or(true);
            text_ok && category_ok && price_ok
        })
        .cloned()
        .collect();

    match filters.sort {
        SortKey::Featured => {}
        SortKey::PriceLow => out.sort_by(|a, b| a.price.cmp(&b.price)),
        SortKey::PriceHigh => out.sort_by(|a, b| b.price.cmp(&a.price)),
        SortKey::Name => out.sort_by(|a, b| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
        }),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RawProductRow;
    use crate::product::normalize;

    fn catalog() -> Vec<Product> {
        let rows = vec![
            RawProductRow {
                product_id: "P1".to_string(),
                sub_product_id: "P1-A".to_string(),
                product_name: "Bear".to_string(),
                size: "S".to_string(),
                color: "Red".to_string(),
                category_type: "Soft Toys".to_string(),
                price: "199.50".to_string(),
                increment_by: "6".to_string(),
                ..Default::default()
            },
            RawProductRow {
                product_id: "P2".to_string(),
                product_name: "Duck".to_string(),
                category_type: "Bath Toys".to_string(),
                price: "50".to_string(),
                ..Default::default()
            },
            RawProductRow {
                product_id: "P3".to_string(),
                product_name: "Elephant".to_string(),
                category_type: "Soft Toys".to_string(),
                price: "199.50".to_string(),
                ..Default::default()
            },
        ];
        normalize(rows)
    }

    #[test]
    fn empty_filters_match_all_in_catalog_order() {
        let products = catalog();
        let out = apply(&products, &Filters::default());
        assert_eq!(out, products);
    }

    #[test]
    fn search_matches_color_field() {
        let products = catalog();
        let out = apply(
            &products,
            &Filters {
                search: Some("red".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "P1-A");
    }

    #[test]
    fn predicates_are_anded() {
        let products = catalog();
        let out = apply(
            &products,
            &Filters {
                search: Some("toys".to_string()),
                category: Some("Bath Toys".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "P2");
    }

    #[test]
    fn price_bucket_bounds_are_inclusive() {
        let products = catalog();
        let bucket: PriceBucket = "0-50".parse().expect("known bucket");
        let out = apply(
            &products,
            &Filters {
                price: Some(bucket),
                ..Default::default()
            },
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "P2");
    }

    #[test]
    fn unknown_bucket_is_rejected() {
        assert!("13-37".parse::<PriceBucket>().is_err());
    }

    #[test]
    fn price_sort_is_stable_for_ties() {
        let products = catalog();
        let out = apply(
            &products,
            &Filters {
                sort: SortKey::PriceLow,
                ..Default::default()
            },
        );
        let ids: Vec<&str> = out.iter().map(|p| p.id.as_str()).collect();
        // P1-A and P3 tie on price and keep their catalog order
        assert_eq!(ids, vec!["P2", "P1-A", "P3"]);
    }

    #[test]
    fn pipeline_is_idempotent() {
        let products = catalog();
        let filters = Filters {
            search: Some("o".to_string()),
            sort: SortKey::Name,
            ..Default::default()
        };
        assert_eq!(apply(&products, &filters), apply(&products, &filters));
    }
}
