//! Text renderings of the app's pages.

use std::fmt::Write;

use serde_json::Value;

use catalog_core::schema::product::FIELDS;
use catalog_core::utils::{format_optional, format_price, truncate_string};
use catalog_core::{Product, ProductForm, Session, SessionPhase, ValidationErrors};

/// Column width for product names in the list
const NAME_WIDTH: usize = 32;

pub fn home() -> String {
    "Home Page\n".to_string()
}

pub fn login(session: &Session) -> String {
    if session.is_authenticated() {
        "Already signed in. Open /products to manage the catalog.\n".to_string()
    } else {
        "Login\nRun `catalog-admin login` to sign in.\n".to_string()
    }
}

pub fn not_found(path: &str) -> String {
    format!(
        "404\nPage not found\nThe page you are looking for does not exist: {}\nGo back to Home: /\n",
        path
    )
}

pub fn product_table(products: &[Product]) -> String {
    let mut out = String::from("Products\n");
    if products.is_empty() {
        out.push_str("No products yet. Create one with `catalog-admin products new`.\n");
        return out;
    }

    let _ = writeln!(
        out,
        "{:>6}  {:<width$}  {:>12}",
        "#",
        "Name",
        "Price",
        width = NAME_WIDTH
    );
    for product in products {
        let _ = writeln!(
            out,
            "{:>6}  {:<width$}  {:>12}",
            product.id,
            truncate_string(product.name(), NAME_WIDTH),
            format_price(product.price()),
            width = NAME_WIDTH
        );
    }
    out
}

pub fn product_detail(product: &Product) -> String {
    let f = &product.fields;
    let mut out = String::new();
    let _ = writeln!(out, "Product #{}", product.id);
    let _ = writeln!(out, "  name:        {}", f.name);
    let _ = writeln!(out, "  slug:        {}", f.slug);
    let _ = writeln!(out, "  description: {}", format_optional(&f.description, "-"));
    let _ = writeln!(out, "  image:       {}", format_optional(&f.image, "-"));
    let _ = writeln!(out, "  price:       {}", format_price(f.price));
    let _ = writeln!(out, "  sort:        {}", f.sort);
    let _ = writeln!(out, "  is_active:   {}", f.is_active);
    let _ = writeln!(out, "  is_favorite: {}", f.is_favorite);
    let _ = writeln!(out, "  category_id: {}", f.category_id);
    out
}

/// The blank or pre-filled form, one `field = value` per line.
pub fn product_form(title: &str, form: &ProductForm) -> String {
    let mut out = format!("{}\n", title);
    for field in FIELDS {
        let value = match form.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let _ = writeln!(out, "  {:<12} = {}", field, value);
    }
    out
}

/// One line per field error, in form order.
pub fn validation_errors(errors: &ValidationErrors) -> String {
    let mut out = String::new();
    for error in errors.iter() {
        if error.field.is_empty() {
            let _ = writeln!(out, "  {}", error.message);
        } else {
            let _ = writeln!(out, "  {}: {}", error.field, error.message);
        }
    }
    out
}

pub fn status(session: &Session, api_url: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "API:     {}", api_url);
    let phase = match session.phase() {
        SessionPhase::Hydrating => "loading",
        SessionPhase::Unauthenticated => "signed out",
        SessionPhase::Authenticated => "signed in",
    };
    let _ = writeln!(out, "Session: {}", phase);
    if session.is_authenticated() {
        let _ = writeln!(out, "User:    {}", session.email().unwrap_or("-"));
        let _ = writeln!(out, "Tenant:  {}", session.tenant_id().unwrap_or("-"));
        if let Some(minutes) = session.claims().and_then(|c| c.minutes_until_expiry()) {
            let _ = writeln!(out, "Expires: in {} min", minutes);
        }
    }
    out
}
