use serde::{Deserialize, Serialize};

use crate::schema::{self, ValidationErrors};

/// Server-assigned product identifier.
pub type ProductId = i64;

/// The writable part of a product: everything except the server-assigned `id`.
///
/// This is the body of create and update requests. Updates replace the whole
/// record, so every field is always sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProductInput {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub price: f64,
    pub sort: i64,
    pub is_active: bool,
    pub is_favorite: bool,
    pub category_id: i64,
}

impl ProductInput {
    /// Run the field rules against an already-typed input.
    pub fn check(&self) -> Result<(), ValidationErrors> {
        schema::check_product_input(self)
    }
}

impl TryFrom<serde_json::Value> for ProductInput {
    type Error = ValidationErrors;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        schema::validate_product_input(&value)
    }
}

/// A product as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Product {
    pub id: ProductId,
    #[serde(flatten)]
    pub fields: ProductInput,
}

impl Product {
    pub fn new(id: ProductId, fields: ProductInput) -> Self {
        Self { id, fields }
    }

    pub fn name(&self) -> &str {
        &self.fields.name
    }

    pub fn price(&self) -> f64 {
        self.fields.price
    }

    /// Drop the id, leaving the submission shape.
    pub fn into_input(self) -> ProductInput {
        self.fields
    }
}

impl TryFrom<serde_json::Value> for Product {
    type Error = ValidationErrors;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        schema::validate_product(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn sample_input() -> ProductInput {
        ProductInput {
            name: "Espresso".to_string(),
            slug: "espresso".to_string(),
            description: None,
            image: Some("https://cdn.example.com/espresso.png".to_string()),
            price: 2.5,
            sort: 1,
            is_active: true,
            is_favorite: false,
            category_id: 3,
        }
    }

    #[test]
    fn test_product_serializes_flat() {
        let product = Product::new(7, sample_input());
        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(value["id"], json!(7));
        assert_eq!(value["slug"], json!("espresso"));
        assert_eq!(value["price"], json!(2.5));
    }

    #[test]
    fn test_input_sends_absent_optionals_as_null() {
        let input = ProductInput {
            image: None,
            ..sample_input()
        };
        let value = serde_json::to_value(&input).unwrap();
        let object = value.as_object().unwrap();
        // Updates replace the whole record, so cleared fields must be sent
        assert_eq!(object.get("description"), Some(&Value::Null));
        assert_eq!(object.get("image"), Some(&Value::Null));
        assert_eq!(object.len(), 9);
    }

    #[test]
    fn test_product_deserializes_with_coercion() {
        let json = r#"{"id":"12","name":"Latte","slug":"latte","description":null,
            "price":"3.20","sort":0,"is_active":true,"is_favorite":true,"category_id":2,
            "created_at":"2024-01-01T00:00:00Z"}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, 12);
        assert_eq!(product.price(), 3.2);
        assert_eq!(product.fields.description, None);
    }

    #[test]
    fn test_product_rejects_invalid_response() {
        let json = r#"{"id":1,"name":"","slug":"bad slug!","price":-1,"sort":0,
            "is_active":true,"is_favorite":false,"category_id":0}"#;
        let err = serde_json::from_str::<Product>(json).unwrap_err();
        assert!(err.to_string().contains("slug"));
    }

    #[test]
    fn test_into_input_drops_id() {
        let product = Product::new(4, sample_input());
        assert_eq!(product.into_input(), sample_input());
    }
}
