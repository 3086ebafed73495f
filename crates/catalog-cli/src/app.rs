//! Application state and command flows for catalog-admin.
//!
//! `App` owns the config, the session manager and the product resource.
//! Each command navigates to its route first; the guard decides whether the
//! page renders, waits, or redirects to login.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

use catalog_core::auth::MemoryCredentialStore;
use catalog_core::{
    navigate, ApiClient, Config, CredentialStore, Credentials, FetchError, LoginForm, Navigation,
    Product, ProductForm, ProductId, ProductResource, Route, SessionManager, TenantResolver,
};

use crate::cli::{Command, ProductAction};
use crate::pages;

/// Shown after a successful login
const LOGIN_SUCCESS: &str = "Login Successful";

pub struct App {
    config: Config,
    manager: SessionManager<ApiClient>,
    products: ProductResource,
    ephemeral: bool,
}

impl App {
    /// Build the app from config and environment, then restore the session.
    pub fn new(ephemeral: bool) -> Result<Self> {
        let mut config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        config.apply_env();
        debug!(api_url = ?config.api_url, tenant = ?config.tenant_id, "Config loaded");

        let api = ApiClient::new(config.api_url()?, config.request_timeout())?;

        let store: Arc<dyn CredentialStore> = if ephemeral {
            Arc::new(MemoryCredentialStore::new())
        } else {
            config.credential_store()?
        };

        let manager = SessionManager::new(api.clone(), store)
            .with_cookie_attributes(config.cookie_attributes())
            .with_claims_policy(config.claims_policy());
        let phase = manager.hydrate();
        debug!(?phase, "Session restored");

        let tenant = config.tenant_resolver().unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to the token's tenant");
            TenantResolver::FromSession { fallback: None }
        });
        let products = ProductResource::new(api, manager.subscribe(), tenant);

        Ok(Self {
            config,
            manager,
            products,
            ephemeral,
        })
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Login { username } => self.login(username).await,
            Command::Logout => {
                self.manager.logout();
                println!("Logged out");
                Ok(())
            }
            Command::Status => {
                print!("{}", pages::status(&self.manager.snapshot(), self.config.api_url()?));
                Ok(())
            }
            Command::Open { path } => self.open(&path).await,
            Command::Products { action } => match action {
                ProductAction::List => self.open(&Route::Products.path()).await,
                ProductAction::Show { id } => self.open(&Route::EditProduct(id).path()).await,
                ProductAction::New { fields } => self.create_product(fields).await,
                ProductAction::Edit { id, fields } => self.update_product(id, fields).await,
                ProductAction::Delete { id, yes } => self.delete_product(id, yes).await,
            },
        }
    }

    // ===== Navigation =====

    /// Run the guard for `path`. Returns the route to render.
    ///
    /// A redirect to login either signs in inline (`--ephemeral`, where no
    /// stored session can exist) or fails with a hint.
    async fn enter(&mut self, path: &str) -> Result<Route> {
        match navigate(&self.manager.snapshot(), path) {
            Navigation::Render(route) => Ok(route),
            Navigation::Pending(route) => {
                // hydrate() runs in App::new, so this only happens if it never did
                warn!(%route, "Session still loading");
                bail!("Loading...")
            }
            Navigation::Redirect { from, to } => {
                info!(%from, %to, "Redirecting");
                if !self.ephemeral {
                    bail!("Not signed in. Run `catalog-admin login` first.");
                }
                self.sign_in(None).await?;
                match navigate(&self.manager.snapshot(), path) {
                    Navigation::Render(route) => Ok(route),
                    _ => bail!("Not signed in."),
                }
            }
        }
    }

    /// Navigate to `path` and print the page.
    pub async fn open(&mut self, path: &str) -> Result<()> {
        let route = self.enter(path).await?;
        let page = match route {
            Route::Home => pages::home(),
            Route::Login => pages::login(&self.manager.snapshot()),
            Route::Products => pages::product_table(&self.products.list().await.map_err(report)?),
            Route::NewProduct => pages::product_form("New Product", &ProductForm::default()),
            Route::EditProduct(id) => pages::product_detail(&self.load_product(id).await?),
            Route::NotFound(path) => pages::not_found(&path),
        };
        print!("{}", page);
        Ok(())
    }

    // ===== Login =====

    async fn login(&mut self, username: Option<String>) -> Result<()> {
        // Public route: the guard never redirects it
        if let Navigation::Render(route) = navigate(&self.manager.snapshot(), &Route::Login.path()) {
            debug!(%route, "Opening login");
        }
        self.sign_in(username).await
    }

    async fn sign_in(&mut self, username: Option<String>) -> Result<()> {
        let username = match username.filter(|u| !u.is_empty()) {
            Some(u) => u,
            None => prompt_username(self.config.last_username.as_deref())?,
        };
        let password = match std::env::var("CATALOG_PASSWORD") {
            Ok(p) if !p.is_empty() => p,
            _ => rpassword::prompt_password("Password: ")?,
        };

        let credentials = Credentials::validate(LoginForm { username, password })
            .map_err(|errors| anyhow!("{}", pages::validation_errors(&errors).trim_end()))?;

        self.manager
            .login(&credentials)
            .await
            .map_err(|e| anyhow!("{}", e))?;
        println!("{}", LOGIN_SUCCESS);

        self.config.last_username = Some(credentials.username().to_string());
        if !self.ephemeral {
            // Env overrides stay out of the file
            let mut stored = Config::load().unwrap_or_default();
            stored.last_username = self.config.last_username.clone();
            if let Err(e) = stored.save() {
                warn!(error = %e, "Failed to save config");
            }
        }
        Ok(())
    }

    // ===== Products =====

    async fn load_product(&self, id: ProductId) -> Result<Product> {
        self.products.get(id).await.map_err(|e| {
            if e.is_not_found() {
                anyhow!("Product not found")
            } else {
                report(e)
            }
        })
    }

    async fn create_product(&mut self, fields: Vec<(String, Value)>) -> Result<()> {
        self.enter(&Route::NewProduct.path()).await?;

        let mut form = ProductForm::default();
        apply_fields(&mut form, fields);
        let input = form
            .validate()
            .map_err(|errors| anyhow!("{}", pages::validation_errors(&errors).trim_end()))?;

        let product = self.products.create(&input).await.map_err(report)?;
        println!("Product created!");
        print!("{}", pages::product_detail(&product));
        Ok(())
    }

    async fn update_product(&mut self, id: ProductId, fields: Vec<(String, Value)>) -> Result<()> {
        self.enter(&Route::EditProduct(id).path()).await?;

        let current = self.load_product(id).await?;
        let mut form = ProductForm::from_product(&current);
        apply_fields(&mut form, fields);
        let input = form
            .validate()
            .map_err(|errors| anyhow!("{}", pages::validation_errors(&errors).trim_end()))?;

        let product = self.products.update(id, &input).await.map_err(report)?;
        println!("Product updated!");
        print!("{}", pages::product_detail(&product));
        Ok(())
    }

    async fn delete_product(&mut self, id: ProductId, yes: bool) -> Result<()> {
        self.enter(&Route::Products.path()).await?;

        if !yes && !confirm("Delete this product?")? {
            println!("Cancelled");
            return Ok(());
        }
        self.products.delete(id).await.map_err(report)?;
        println!("Product deleted successfully!");
        Ok(())
    }
}

fn apply_fields(form: &mut ProductForm, fields: Vec<(String, Value)>) {
    for (field, value) in fields {
        form.set(&field, value);
    }
}

/// Turn a resource failure into the message shown to the user.
fn report(error: FetchError) -> anyhow::Error {
    debug!(error = ?error, "Request failed");
    match error {
        FetchError::Invalid(errors) => anyhow!("{}", pages::validation_errors(&errors).trim_end()),
        e if e.is_unauthorized() => anyhow!("{}. Your session may have expired; log in again.", e),
        e => anyhow!("{}", e),
    }
}

fn prompt_username(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();
    Ok(match last {
        Some(last) if input.is_empty() => last.to_string(),
        _ => input.to_string(),
    })
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N]: ", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}
