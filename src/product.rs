use crate::catalog::RawProductRow;
use lazy_regex::regex;
use rust_decimal::Decimal;
use serde::Serialize;

/// Canonical product record, immutable after normalization. `id` is the
/// sub-variant id when the sheet provides one, else the parent id;
/// `parent_id` groups variants of the same base item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: String,
    pub parent_id: String,
    pub display_name: String,
    pub base_name: String,
    pub image: String,
    pub image_front: String,
    pub image_top: String,
    pub image_side: String,
    pub image_projection: String,
    pub video_embed_url: Option<String>,
    pub category: String,
    pub price: Decimal,
    pub size: Option<String>,
    pub color: Option<String>,
    pub material: Option<String>,
    pub order_increment: u32,
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Normalizes a YouTube watch, short, or embed URL to its embeddable form.
/// Any other input yields no video.
pub fn embed_video_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    if url.contains("youtube.com/embed/") {
        return Some(url.to_string());
    }
    let id = regex!(r"youtube\.com/watch\?[^#\s]*v=([A-Za-z0-9_-]+)")
        .captures(url)
        .or_else(|| regex!(r"youtu\.be/([A-Za-z0-9_-]+)").captures(url))
        .map(|c| c[1].to_string())?;
    Some(format!("https://www.youtube.com/embed/{id}"))
}

fn into_product(row: RawProductRow) -> Option<Product> {
    let parent_id = row.product_id.trim().to_string();
    let id = match row.sub_product_id.trim() {
        "" => parent_id.clone(),
        sub => sub.to_string(),
    };
    if id.is_empty() {
        return None;
    }
    let base_name = row.product_name.trim().to_string();
    if base_name.is_empty() {
        return None;
    }

    let size = non_empty(&row.size);
    let color = non_empty(&row.color);
    let material = non_empty(&row.fabric_type);
    let variant: Vec<&str> = [size.as_deref(), color.as_deref(), material.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    let display_name = if variant.is_empty() {
        base_name.clone()
    } else {
        format!("{} - {}", base_name, variant.join(" "))
    };

    let price = row
        .price
        .trim()
        .parse::<Decimal>()
        .unwrap_or(Decimal::ZERO)
        .max(Decimal::ZERO);
    let order_increment = row
        .increment_by
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|v| *v >= 1)
        .unwrap_or(1);

    let image = row.image_link.trim().to_string();
    let view = |v: &str| non_empty(v).unwrap_or_else(|| image.clone());

    Some(Product {
        image_front: view(&row.image_front),
        image_top: view(&row.image_top),
        image_side: view(&row.image_side),
        image_projection: view(&row.image_projection),
        video_embed_url: embed_video_url(&row.youtube_video),
        category: row.category_type.trim().to_string(),
        id,
        parent_id,
        display_name,
        base_name,
        image,
        price,
        size,
        color,
        material,
        order_increment,
    })
}

/// Pure mapping from raw rows to catalog products. Rows with an empty id or
/// an empty derived name never enter the catalog.
pub fn normalize(rows: Vec<RawProductRow>) -> Vec<Product> {
    rows.into_iter().filter_map(into_product).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bear_row() -> RawProductRow {
        RawProductRow {
            product_id: "P1".to_string(),
            sub_product_id: "P1-A".to_string(),
            product_name: "Bear".to_string(),
            size: "S".to_string(),
            color: "Red".to_string(),
            price: "199.50".to_string(),
            increment_by: "6".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn normalizes_variant_row() {
        let products = normalize(vec![bear_row()]);
        assert_eq!(products.len(), 1);
        let p = &products[0];
        assert_eq!(p.id, "P1-A");
        assert_eq!(p.parent_id, "P1");
        assert_eq!(p.display_name, "Bear - S Red");
        assert_eq!(p.base_name, "Bear");
        assert_eq!(p.price, dec!(199.5));
        assert_eq!(p.order_increment, 6);
    }

    #[test]
    fn drops_rows_without_id_or_name() {
        let no_id = RawProductRow {
            product_name: "Ghost".to_string(),
            ..Default::default()
        };
        let no_name = RawProductRow {
            product_id: "P9".to_string(),
            ..Default::default()
        };
        assert!(normalize(vec![no_id, no_name]).is_empty());
    }

    #[test]
    fn falls_back_to_parent_id() {
        let row = RawProductRow {
            product_id: "P2".to_string(),
            product_name: "Duck".to_string(),
            ..Default::default()
        };
        let products = normalize(vec![row]);
        assert_eq!(products[0].id, "P2");
        assert_eq!(products[0].display_name, "Duck");
    }

    #[test]
    fn invalid_price_and_increment_get_defaults() {
        let row = RawProductRow {
            product_id: "P3".to_string(),
            product_name: "Frog".to_string(),
            price: "n/a".to_string(),
            increment_by: "0".to_string(),
            ..Default::default()
        };
        let p = &normalize(vec![row])[0];
        assert_eq!(p.price, Decimal::ZERO);
        assert_eq!(p.order_increment, 1);
    }

    #[test]
    fn image_views_fall_back_to_generic_image() {
        let row = RawProductRow {
            product_id: "P4".to_string(),
            product_name: "Owl".to_string(),
            image_link: "https://img.example/owl.jpg".to_string(),
            image_top: "https://img.example/owl-top.jpg".to_string(),
            ..Default::default()
        };
        let p = &normalize(vec![row])[0];
        assert_eq!(p.image_front, "https://img.example/owl.jpg");
        assert_eq!(p.image_top, "https://img.example/owl-top.jpg");
        assert_eq!(p.image_side, "https://img.example/owl.jpg");
        assert_eq!(p.image_projection, "https://img.example/owl.jpg");
    }

    #[test]
    fn embeds_youtube_urls() {
        assert_eq!(
            embed_video_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=5"),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            embed_video_url("https://youtu.be/dQw4w9WgXcQ?si=xyz"),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            embed_video_url("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ".to_string())
        );
        assert_eq!(embed_video_url("https://vimeo.com/12345"), None);
        assert_eq!(embed_video_url(""), None);
    }
}
