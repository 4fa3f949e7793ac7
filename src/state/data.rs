/// Shared data structures for the application state
///
/// These structs represent the product records that flow from the
/// catalog provider into the UI layer. Field names follow the
/// commerce API's camelCase JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A product as delivered by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Globally unique product ID (e.g., "gid://shop/Product/1")
    pub id: String,
    pub title: String,
    /// URL slug used for the product detail page
    pub handle: String,
    pub vendor: String,
    pub published_at: DateTime<Utc>,
    /// Product photos in display order
    #[serde(default)]
    pub images: Vec<ImageRef>,
    /// `None` when the record carries no variant list at all
    #[serde(default)]
    pub variants: Option<Vec<Variant>>,
    /// Merchandising label set on the record itself (e.g., "Limited")
    #[serde(default)]
    pub label: Option<String>,
}

impl Product {
    /// The representative variant: first in the list
    pub fn first_variant(&self) -> Option<&Variant> {
        self.variants.as_ref().and_then(|variants| variants.first())
    }

    /// Path of the product detail page
    pub fn url(&self) -> String {
        format!("/products/{}", self.handle)
    }
}

/// A purchasable variant of a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    pub title: String,
    pub price: Money,
    #[serde(default)]
    pub compare_at_price: Option<Money>,
    #[serde(default)]
    pub image: Option<ImageRef>,
}

/// A monetary amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    /// Commerce APIs send decimals as strings ("25.0"); plain numbers are accepted too
    #[serde(deserialize_with = "decimal_amount")]
    pub amount: f64,
    pub currency_code: String,
}

impl Money {
    pub fn new(amount: f64, currency_code: impl Into<String>) -> Self {
        Self {
            amount,
            currency_code: currency_code.into(),
        }
    }

    /// Narrow currency symbol, falling back to the ISO code
    pub fn symbol(&self) -> &str {
        match self.currency_code.as_str() {
            "USD" | "CAD" | "AUD" | "NZD" | "MXN" => "$",
            "EUR" => "€",
            "GBP" => "£",
            "JPY" | "CNY" => "¥",
            "INR" => "₹",
            "KRW" => "₩",
            other => other,
        }
    }

    /// Amount without trailing zeros ("25", "25.5", "25.55")
    pub fn amount_without_trailing_zeros(&self) -> String {
        let formatted = format!("{:.2}", self.amount);
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }

    /// Display form used on cards, e.g. "$25" or "€19.5"
    pub fn display(&self) -> String {
        format!("{}{}", self.symbol(), self.amount_without_trailing_zeros())
    }
}

/// Reference to a product photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    /// Local path (absolute, or relative to the catalog file)
    pub url: String,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl ImageRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            alt_text: None,
            width: None,
            height: None,
        }
    }
}

fn decimal_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
    }

    match Amount::deserialize(deserializer)? {
        Amount::Number(value) => Ok(value),
        Amount::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_from_commerce_json() {
        let json = r#"{
            "id": "gid://shop/Product/1",
            "title": "Linen Shirt",
            "handle": "linen-shirt",
            "vendor": "Aroma",
            "publishedAt": "2024-05-01T10:00:00Z",
            "images": [{ "url": "shirt-front.jpg", "altText": "Front" }],
            "variants": [{
                "id": "gid://shop/ProductVariant/11",
                "title": "M",
                "price": { "amount": "80.0", "currencyCode": "USD" },
                "compareAtPrice": { "amount": 100, "currencyCode": "USD" }
            }]
        }"#;

        let product: Product = serde_json::from_str(json).unwrap();
        let variant = product.first_variant().unwrap();

        assert_eq!(variant.price.amount, 80.0);
        assert_eq!(variant.compare_at_price.as_ref().unwrap().amount, 100.0);
        assert_eq!(product.images[0].alt_text.as_deref(), Some("Front"));
        assert_eq!(product.url(), "/products/linen-shirt");
        assert!(product.label.is_none());
    }

    #[test]
    fn test_missing_variant_list_is_none() {
        let json = r#"{
            "id": "1", "title": "T", "handle": "t", "vendor": "V",
            "publishedAt": "2024-05-01T10:00:00Z"
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert!(product.variants.is_none());
        assert!(product.first_variant().is_none());
    }

    #[test]
    fn test_bad_amount_is_rejected() {
        let json = r#"{ "amount": "twelve", "currencyCode": "USD" }"#;
        assert!(serde_json::from_str::<Money>(json).is_err());
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::new(25.0, "USD").display(), "$25");
        assert_eq!(Money::new(19.5, "EUR").display(), "€19.5");
        assert_eq!(Money::new(7.25, "GBP").display(), "£7.25");
        assert_eq!(Money::new(10.0, "CHF").display(), "CHF10");
    }
}
