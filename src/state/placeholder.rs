/// Placeholder records used when the catalog hands over incomplete data
use chrono::{TimeZone, Utc};

use super::data::{ImageRef, Money, Product, Variant};

/// Product shown in place of a record that lacks a variant list
pub fn product_placeholder() -> Product {
    let published_at = Utc
        .with_ymd_and_hms(2021, 6, 17, 18, 33, 17)
        .single()
        .unwrap_or_default();

    let image = ImageRef {
        url: "placeholder/product.jpg".to_string(),
        alt_text: Some("Placeholder product photo".to_string()),
        width: Some(1200),
        height: Some(1500),
    };

    Product {
        id: "placeholder-product".to_string(),
        title: "Example Product Title".to_string(),
        handle: "product-handle".to_string(),
        vendor: "Example Vendor".to_string(),
        published_at,
        images: vec![image.clone()],
        variants: Some(vec![Variant {
            id: "placeholder-variant".to_string(),
            title: "Default".to_string(),
            price: Money::new(9.99, "USD"),
            compare_at_price: None,
            image: Some(image),
        }]),
        label: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_purchasable() {
        let product = product_placeholder();
        assert!(product.first_variant().is_some());
        assert_eq!(product.url(), "/products/product-handle");
    }
}
