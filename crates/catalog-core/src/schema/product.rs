//! Product schema: field rules, validators, and the editable form state.

use serde_json::{Map, Value};
use url::Url;

use super::coerce::Checker;
use super::ValidationErrors;
use crate::models::{Product, ProductInput};

pub const REQUIRED: &str = "Required";
pub const SLUG_CHARSET: &str = "Slug must use only Latin letters, numbers, - or _";
pub const INVALID_URL: &str = "Must be a valid URL";
pub const NEGATIVE_PRICE: &str = "Must be a non-negative number";
pub const NEGATIVE_SORT: &str = "Must be a non-negative integer";
pub const MISSING_CATEGORY: &str = "Category is required";

/// Form fields in display order.
pub const FIELDS: [&str; 9] = [
    "name",
    "slug",
    "description",
    "image",
    "price",
    "sort",
    "is_active",
    "is_favorite",
    "category_id",
];

// ============================================================================
// Field rules
// ============================================================================

fn name_rule(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        Err(REQUIRED)
    } else {
        Ok(())
    }
}

/// Non-empty, `[A-Za-z0-9_-]+`.
pub fn slug_rule(slug: &str) -> Result<(), &'static str> {
    if slug.is_empty() {
        return Err(REQUIRED);
    }
    if slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(SLUG_CHARSET)
    }
}

fn any_string(_: &str) -> Result<(), &'static str> {
    Ok(())
}

fn image_rule(image: &str) -> Result<(), &'static str> {
    Url::parse(image).map(|_| ()).map_err(|_| INVALID_URL)
}

fn price_rule(price: f64) -> Result<(), &'static str> {
    if price >= 0.0 {
        Ok(())
    } else {
        Err(NEGATIVE_PRICE)
    }
}

fn sort_rule(sort: i64) -> Result<(), &'static str> {
    if sort >= 0 {
        Ok(())
    } else {
        Err(NEGATIVE_SORT)
    }
}

fn category_rule(category_id: i64) -> Result<(), &'static str> {
    if category_id >= 1 {
        Ok(())
    } else {
        Err(MISSING_CATEGORY)
    }
}

fn any_integer(_: i64) -> Result<(), &'static str> {
    Ok(())
}

// ============================================================================
// Validators
// ============================================================================

fn read_input(checker: &mut Checker<'_>) -> Option<ProductInput> {
    let name = checker.string("name", name_rule);
    let slug = checker.string("slug", slug_rule);
    let description = checker.optional_string("description", any_string);
    let image = checker.optional_string("image", image_rule);
    let price = checker.number("price", price_rule);
    let sort = checker.integer("sort", sort_rule);
    let is_active = checker.boolean("is_active");
    let is_favorite = checker.boolean("is_favorite");
    let category_id = checker.integer("category_id", category_rule);

    Some(ProductInput {
        name: name?,
        slug: slug?,
        description: description?,
        image: image?,
        price: price?,
        sort: sort?,
        is_active: is_active?,
        is_favorite: is_favorite?,
        category_id: category_id?,
    })
}

/// Validate and coerce the submission shape (a product without `id`).
/// An `id` key, if present, is ignored.
pub fn validate_product_input(value: &Value) -> Result<ProductInput, ValidationErrors> {
    let mut checker = Checker::new(value)?;
    let input = read_input(&mut checker);
    checker.finish(|| input)
}

/// Validate and coerce a full product, including its server-assigned `id`.
pub fn validate_product(value: &Value) -> Result<Product, ValidationErrors> {
    let mut checker = Checker::new(value)?;
    let id = checker.integer("id", any_integer);
    let input = read_input(&mut checker);
    checker.finish(|| Some(Product::new(id?, input?)))
}

/// Apply the field rules to an already-typed input.
pub fn check_product_input(input: &ProductInput) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let mut record = |field: &'static str, result: Result<(), &'static str>| {
        if let Err(message) = result {
            errors.push(field, message);
        }
    };

    record("name", name_rule(&input.name));
    record("slug", slug_rule(&input.slug));
    if let Some(image) = input.image.as_deref().filter(|s| !s.is_empty()) {
        record("image", image_rule(image));
    }
    if input.price.is_finite() {
        record("price", price_rule(input.price));
    } else {
        record("price", Err("Expected number, received nan"));
    }
    record("sort", sort_rule(input.sort));
    record("category_id", category_rule(input.category_id));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// ============================================================================
// Form state
// ============================================================================

/// Raw, unvalidated values of the product form.
///
/// Values may be strings (as typed into inputs) or JSON scalars; validation
/// coerces them. Starts from the blank-form defaults or from a loaded product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductForm {
    values: Map<String, Value>,
}

impl Default for ProductForm {
    fn default() -> Self {
        let mut values = Map::new();
        values.insert("name".into(), Value::from(""));
        values.insert("slug".into(), Value::from(""));
        values.insert("description".into(), Value::from(""));
        values.insert("image".into(), Value::from(""));
        values.insert("price".into(), Value::from(0));
        values.insert("sort".into(), Value::from(0));
        values.insert("is_active".into(), Value::from(false));
        values.insert("is_favorite".into(), Value::from(false));
        values.insert("category_id".into(), Value::from(1));
        Self { values }
    }
}

impl ProductForm {
    /// Pre-fill the form for editing an existing product.
    pub fn from_product(product: &Product) -> Self {
        let fields = &product.fields;
        let mut form = Self::default();
        form.set("name", fields.name.as_str());
        form.set("slug", fields.slug.as_str());
        form.set("description", fields.description.clone().unwrap_or_default());
        form.set("image", fields.image.clone().unwrap_or_default());
        form.set("price", fields.price);
        form.set("sort", fields.sort);
        form.set("is_active", fields.is_active);
        form.set("is_favorite", fields.is_favorite);
        form.set("category_id", fields.category_id);
        form
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.values.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Run the submission schema. Must pass before any request is made.
    pub fn validate(&self) -> Result<ProductInput, ValidationErrors> {
        validate_product_input(&self.to_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_input_json() -> Value {
        json!({
            "name": "Cold Brew",
            "slug": "cold-brew_2",
            "description": "Steeped overnight",
            "image": "https://cdn.example.com/cold-brew.png",
            "price": 4.75,
            "sort": 3,
            "is_active": true,
            "is_favorite": false,
            "category_id": 2
        })
    }

    #[test]
    fn test_slug_rule() {
        assert_eq!(slug_rule("bad slug!"), Err(SLUG_CHARSET));
        assert_eq!(slug_rule("bad-slug_2"), Ok(()));
        assert_eq!(slug_rule(""), Err(REQUIRED));
        assert_eq!(slug_rule("café"), Err(SLUG_CHARSET));
    }

    #[test]
    fn test_price_coerces_string() {
        let mut value = valid_input_json();
        value["price"] = json!("12.5");
        let input = validate_product_input(&value).unwrap();
        assert_eq!(input.price, 12.5);
    }

    #[test]
    fn test_price_rejects_negative() {
        let mut value = valid_input_json();
        value["price"] = json!(-1);
        let errors = validate_product_input(&value).unwrap_err();
        assert_eq!(errors.field("price"), Some(NEGATIVE_PRICE));
    }

    #[test]
    fn test_collects_every_field_error() {
        let value = json!({
            "name": "",
            "slug": "bad slug!",
            "image": "not a url",
            "price": "abc",
            "sort": 1.5,
            "is_active": "yes",
            "category_id": 0
        });
        let errors = validate_product_input(&value).unwrap_err();
        assert_eq!(errors.field("name"), Some(REQUIRED));
        assert_eq!(errors.field("slug"), Some(SLUG_CHARSET));
        assert_eq!(errors.field("image"), Some(INVALID_URL));
        assert_eq!(errors.field("price"), Some("Expected number, received nan"));
        assert_eq!(errors.field("sort"), Some("Expected integer, received float"));
        assert_eq!(errors.field("is_active"), Some("Expected boolean"));
        assert_eq!(errors.field("is_favorite"), Some(REQUIRED));
        assert_eq!(errors.field("category_id"), Some(MISSING_CATEGORY));
        assert_eq!(errors.len(), 8);
    }

    #[test]
    fn test_blank_optionals_are_absent() {
        let mut value = valid_input_json();
        value["description"] = json!("");
        value["image"] = json!(null);
        let input = validate_product_input(&value).unwrap();
        assert_eq!(input.description, None);
        assert_eq!(input.image, None);
    }

    #[test]
    fn test_validate_product_requires_id() {
        let errors = validate_product(&valid_input_json()).unwrap_err();
        assert_eq!(errors.field("id"), Some("Expected number, received nan"));

        let mut value = valid_input_json();
        value["id"] = json!("41");
        assert_eq!(validate_product(&value).unwrap().id, 41);
    }

    #[test]
    fn test_default_form_fails_only_on_name_and_slug() {
        let errors = ProductForm::default().validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.field("name"), Some(REQUIRED));
        assert_eq!(errors.field("slug"), Some(REQUIRED));
    }

    #[test]
    fn test_form_round_trips_product() {
        let product = validate_product(&{
            let mut v = valid_input_json();
            v["id"] = json!(9);
            v
        })
        .unwrap();
        let mut form = ProductForm::from_product(&product);
        form.set("price", "5");
        let input = form.validate().unwrap();
        assert_eq!(input.price, 5.0);
        assert_eq!(input.slug, product.fields.slug);
        assert_eq!(input.category_id, 2);
    }

    #[test]
    fn test_check_product_input() {
        let mut input = validate_product_input(&valid_input_json()).unwrap();
        assert!(check_product_input(&input).is_ok());

        input.slug = "has space".to_string();
        input.price = -0.5;
        let errors = check_product_input(&input).unwrap_err();
        assert_eq!(errors.field("slug"), Some(SLUG_CHARSET));
        assert_eq!(errors.field("price"), Some(NEGATIVE_PRICE));
    }
}
