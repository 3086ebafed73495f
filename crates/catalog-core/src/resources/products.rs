use tokio::sync::watch;
use tracing::{debug, info};

use crate::api::{ApiClient, FetchError, Operation};
use crate::auth::Session;
use crate::models::{Product, ProductId, ProductInput};

/// How the tenant for a request is chosen.
///
/// Resolution happens per call from the current session, so switching to
/// per-session tenants is a configuration change, not an API change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantResolver {
    /// One tenant for the whole deployment.
    Fixed(String),
    /// The token's `tenantId` claim, else `fallback`.
    FromSession { fallback: Option<String> },
}

impl TenantResolver {
    pub fn resolve(&self, session: &Session) -> Option<String> {
        match self {
            TenantResolver::Fixed(id) => Some(id.clone()),
            TenantResolver::FromSession { fallback } => session
                .tenant_id()
                .map(str::to_string)
                .or_else(|| fallback.clone()),
        }
    }
}

/// Tenant-scoped product CRUD.
///
/// Holds a read handle to the session, never the manager: it can observe the
/// session but not change it. Nothing is cached; every call hits the API.
#[derive(Clone)]
pub struct ProductResource {
    api: ApiClient,
    session: watch::Receiver<Session>,
    tenant: TenantResolver,
}

impl ProductResource {
    pub fn new(api: ApiClient, session: watch::Receiver<Session>, tenant: TenantResolver) -> Self {
        Self {
            api,
            session,
            tenant,
        }
    }

    /// Tenant and bearer token for one request.
    fn scope(&self, op: Operation) -> Result<(String, Option<String>), FetchError> {
        let session = self.session.borrow();
        let tenant = self
            .tenant
            .resolve(&session)
            .ok_or(FetchError::NoTenant { op })?;
        Ok((tenant, session.token().map(str::to_string)))
    }

    pub async fn list(&self) -> Result<Vec<Product>, FetchError> {
        let (tenant, token) = self.scope(Operation::ListProducts)?;
        let products = self.api.list_products(&tenant, token.as_deref()).await?;
        debug!(%tenant, count = products.len(), "Products loaded");
        Ok(products)
    }

    pub async fn get(&self, id: ProductId) -> Result<Product, FetchError> {
        let (tenant, token) = self.scope(Operation::GetProduct)?;
        self.api.get_product(&tenant, id, token.as_deref()).await
    }

    /// Validates `input` before sending; the server assigns the id.
    pub async fn create(&self, input: &ProductInput) -> Result<Product, FetchError> {
        input.check()?;
        let (tenant, token) = self.scope(Operation::CreateProduct)?;
        let product = self.api.create_product(&tenant, input, token.as_deref()).await?;
        info!(%tenant, id = product.id, "Product created");
        Ok(product)
    }

    /// Replaces every writable field of product `id`.
    pub async fn update(&self, id: ProductId, input: &ProductInput) -> Result<Product, FetchError> {
        input.check()?;
        let (tenant, token) = self.scope(Operation::UpdateProduct)?;
        let product = self
            .api
            .update_product(&tenant, id, input, token.as_deref())
            .await?;
        info!(%tenant, id, "Product updated");
        Ok(product)
    }

    pub async fn delete(&self, id: ProductId) -> Result<(), FetchError> {
        let (tenant, token) = self.scope(Operation::DeleteProduct)?;
        self.api.delete_product(&tenant, id, token.as_deref()).await?;
        info!(%tenant, id, "Product deleted");
        Ok(())
    }
}
