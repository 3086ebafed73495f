//! Command-line definitions.

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use catalog_core::models::ProductId;
use catalog_core::schema::product::FIELDS;

/// Fields that take `true`/`false` rather than text
const BOOLEAN_FIELDS: [&str; 2] = ["is_active", "is_favorite"];

#[derive(Parser, Debug)]
#[command(name = "catalog-admin")]
#[command(author, version, about = "Manage a tenant's product catalog")]
pub struct Cli {
    /// Keep the session in memory only; nothing is written to disk or keychain
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and store the session token
    Login {
        #[arg(short, long, env = "CATALOG_USERNAME")]
        username: Option<String>,
    },
    /// Sign out and forget the stored token
    Logout,
    /// Show the current session
    Status,
    /// Navigate to a path, e.g. `/products/7`
    Open { path: String },
    /// Product catalog operations
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProductAction {
    /// List the tenant's products
    List,
    /// Show one product
    Show { id: ProductId },
    /// Create a product from FIELD=VALUE pairs
    New {
        #[arg(value_name = "FIELD=VALUE", value_parser = parse_field)]
        fields: Vec<(String, Value)>,
    },
    /// Change fields of an existing product; the rest are kept
    Edit {
        id: ProductId,
        #[arg(value_name = "FIELD=VALUE", value_parser = parse_field)]
        fields: Vec<(String, Value)>,
    },
    /// Delete a product
    Delete {
        id: ProductId,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Parse one `FIELD=VALUE` assignment.
///
/// Values stay text, as typed into a form, except for the boolean fields.
/// Numeric coercion is left to the schema.
pub fn parse_field(raw: &str) -> Result<(String, Value)> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected FIELD=VALUE, got `{}`", raw))?;
    let field = field.trim();
    if !FIELDS.contains(&field) {
        bail!("unknown field `{}` (expected one of: {})", field, FIELDS.join(", "));
    }

    let value = if BOOLEAN_FIELDS.contains(&field) {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Value::Bool(true),
            "false" | "no" | "0" => Value::Bool(false),
            other => bail!("`{}` must be true or false, got `{}`", field, other),
        }
    } else {
        Value::String(value.to_string())
    };
    Ok((field.to_string(), value))
}
