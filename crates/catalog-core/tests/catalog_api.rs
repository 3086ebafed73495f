//! End-to-end flows against an in-process fake of the catalog API.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Form, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};

use catalog_core::auth::{CookieAttributes, FileCredentialStore, MemoryCredentialStore};
use catalog_core::{
    navigate, ApiClient, AuthError, ClaimsPolicy, CredentialStore, Credentials, FetchError,
    LoginForm, Navigation, ProductForm, ProductResource, Route, SessionManager, SessionPhase,
    TenantResolver,
};

const USERNAME: &str = "admin@example.com";
const PASSWORD: &str = "hunter2";
const TENANT: &str = "acme";

fn mint_token(tenant: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({
            "sub": "1",
            "email": USERNAME,
            "tenantId": tenant,
            "exp": 4102444800_i64,
        })
        .to_string(),
    );
    format!("{}.{}.signature", header, payload)
}

// ============================================================================
// Fake server
// ============================================================================

#[derive(Default)]
struct Catalog {
    products: BTreeMap<(String, i64), Value>,
    next_id: i64,
}

#[derive(Clone)]
struct FakeApi {
    catalog: Arc<Mutex<Catalog>>,
    token: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

impl FakeApi {
    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {}", self.token))
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "detail": "Not authenticated" })),
    )
        .into_response()
}

async fn login(State(api): State<FakeApi>, Form(form): Form<LoginRequest>) -> Response {
    if form.username == USERNAME && form.password == PASSWORD {
        Json(json!({ "access_token": api.token, "token_type": "bearer" })).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Incorrect email or password" })),
        )
            .into_response()
    }
}

async fn list_products(
    State(api): State<FakeApi>,
    Path(tenant): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !api.authorized(&headers) {
        return unauthorized();
    }
    let catalog = api.catalog.lock().unwrap();
    let products: Vec<Value> = catalog
        .products
        .iter()
        .filter(|((t, _), _)| *t == tenant)
        .map(|(_, v)| v.clone())
        .collect();
    Json(products).into_response()
}

async fn create_product(
    State(api): State<FakeApi>,
    Path(tenant): Path<String>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if !api.authorized(&headers) {
        return unauthorized();
    }
    let mut catalog = api.catalog.lock().unwrap();
    catalog.next_id += 1;
    let id = catalog.next_id;
    body["id"] = json!(id);
    catalog.products.insert((tenant, id), body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn get_product(
    State(api): State<FakeApi>,
    Path((tenant, id)): Path<(String, i64)>,
    headers: HeaderMap,
) -> Response {
    if !api.authorized(&headers) {
        return unauthorized();
    }
    match api.catalog.lock().unwrap().products.get(&(tenant, id)) {
        Some(product) => Json(product.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found" }))).into_response(),
    }
}

async fn update_product(
    State(api): State<FakeApi>,
    Path((tenant, id)): Path<(String, i64)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !api.authorized(&headers) {
        return unauthorized();
    }
    let mut catalog = api.catalog.lock().unwrap();
    let Some(stored) = catalog.products.get_mut(&(tenant, id)) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    // Applies only the keys it receives, like servers that update "set" fields
    if let (Some(stored), Some(body)) = (stored.as_object_mut(), body.as_object()) {
        for (key, value) in body {
            stored.insert(key.clone(), value.clone());
        }
        stored.insert("id".to_string(), json!(id));
    }
    Json(stored.clone()).into_response()
}

async fn delete_product(
    State(api): State<FakeApi>,
    Path((tenant, id)): Path<(String, i64)>,
    headers: HeaderMap,
) -> Response {
    if !api.authorized(&headers) {
        return unauthorized();
    }
    match api.catalog.lock().unwrap().products.remove(&(tenant, id)) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

struct TestServer {
    base_url: String,
    api: FakeApi,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let api = FakeApi {
            catalog: Arc::new(Mutex::new(Catalog::default())),
            token: mint_token(TENANT),
        };
        let app = Router::new()
            .route("/api/v1/login/access-token", post(login))
            .route(
                "/api/v1/tenants/:tenant/products/",
                get(list_products).post(create_product),
            )
            .route(
                "/api/v1/tenants/:tenant/products/:id",
                get(get_product).put(update_product).delete(delete_product),
            )
            .with_state(api.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}/api/v1", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            api,
            handle,
        }
    }

    fn client(&self) -> ApiClient {
        ApiClient::new(&self.base_url, None).unwrap()
    }

    fn seed(&self, tenant: &str, id: i64, product: Value) {
        self.api
            .catalog
            .lock()
            .unwrap()
            .products
            .insert((tenant.to_string(), id), product);
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn credentials(username: &str, password: &str) -> Credentials {
    Credentials::validate(LoginForm {
        username: username.to_string(),
        password: password.to_string(),
    })
    .unwrap()
}

fn temp_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("catalog-core-it-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn sample_form() -> ProductForm {
    let mut form = ProductForm::default();
    form.set("name", "Espresso");
    form.set("slug", "espresso");
    form.set("description", "Short and strong");
    form.set("image", "https://cdn.example.com/espresso.png");
    form.set("price", "2.5");
    form.set("sort", 3);
    form.set("is_active", true);
    form
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_rejected_login_surfaces_detail_and_stays_signed_out() {
    let server = TestServer::spawn().await;
    let store = Arc::new(MemoryCredentialStore::new());
    let manager = SessionManager::new(server.client(), store.clone());
    manager.hydrate();

    let err = manager
        .login(&credentials(USERNAME, "wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Rejected { .. }));
    assert_eq!(err.to_string(), "Incorrect email or password");

    assert!(!manager.snapshot().is_authenticated());
    assert!(store.record().is_none());
}

#[tokio::test]
async fn test_login_persists_token_and_restores_on_next_start() {
    let server = TestServer::spawn().await;
    let dir = temp_dir("login");

    let manager = SessionManager::new(server.client(), Arc::new(FileCredentialStore::new(&dir)));
    assert_eq!(manager.hydrate(), SessionPhase::Unauthenticated);

    let mut updates = manager.subscribe();
    manager.login(&credentials(USERNAME, PASSWORD)).await.unwrap();
    assert!(updates.has_changed().unwrap());
    let session = updates.borrow_and_update().clone();
    assert!(session.is_authenticated());
    assert_eq!(session.tenant_id(), Some(TENANT));
    assert_eq!(session.email(), Some(USERNAME));

    // A fresh process reads the same slot
    let restarted =
        SessionManager::new(server.client(), Arc::new(FileCredentialStore::new(&dir)));
    assert_eq!(restarted.snapshot().phase(), SessionPhase::Hydrating);
    assert_eq!(restarted.hydrate(), SessionPhase::Authenticated);
    assert_eq!(restarted.snapshot().token(), Some(server.api.token.as_str()));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_logout_redirects_protected_routes() {
    let server = TestServer::spawn().await;
    let store = Arc::new(MemoryCredentialStore::new());
    let manager = SessionManager::new(server.client(), store.clone());
    manager.hydrate();
    manager.login(&credentials(USERNAME, PASSWORD)).await.unwrap();

    assert_eq!(
        navigate(&manager.snapshot(), "/products"),
        Navigation::Render(Route::Products)
    );

    manager.logout();
    assert!(store.read().unwrap().is_none());
    assert_eq!(
        navigate(&manager.snapshot(), "/products"),
        Navigation::Redirect {
            from: Route::Products,
            to: Route::Login
        }
    );
}

#[tokio::test]
async fn test_malformed_stored_token_follows_claims_policy() {
    let server = TestServer::spawn().await;

    let lenient_store = Arc::new(MemoryCredentialStore::new());
    lenient_store
        .write("not-a-jwt", &CookieAttributes::default())
        .unwrap();
    let lenient = SessionManager::new(server.client(), lenient_store);
    assert_eq!(lenient.hydrate(), SessionPhase::Authenticated);
    assert_eq!(lenient.snapshot().tenant_id(), None);

    let strict_store = Arc::new(MemoryCredentialStore::new());
    strict_store
        .write("not-a-jwt", &CookieAttributes::default())
        .unwrap();
    let strict = SessionManager::new(server.client(), strict_store.clone())
        .with_claims_policy(ClaimsPolicy::Strict);
    assert_eq!(strict.hydrate(), SessionPhase::Unauthenticated);
    assert!(strict_store.record().is_none());
}

// ============================================================================
// Products
// ============================================================================

async fn signed_in(server: &TestServer, tenant: TenantResolver) -> ProductResource {
    let manager = SessionManager::new(server.client(), Arc::new(MemoryCredentialStore::new()));
    manager.hydrate();
    manager.login(&credentials(USERNAME, PASSWORD)).await.unwrap();
    ProductResource::new(server.client(), manager.subscribe(), tenant)
}

#[tokio::test]
async fn test_create_then_get_returns_same_fields() {
    let server = TestServer::spawn().await;
    let products = signed_in(&server, TenantResolver::Fixed(TENANT.to_string())).await;

    let input = sample_form().validate().unwrap();
    assert_eq!(input.price, 2.5);

    let created = products.create(&input).await.unwrap();
    assert_eq!(created.fields, input);

    let fetched = products.get(created.id).await.unwrap();
    assert_eq!(fetched, created);

    let listed = products.list().await.unwrap();
    assert_eq!(listed, vec![created]);
}

#[tokio::test]
async fn test_update_replaces_all_fields() {
    let server = TestServer::spawn().await;
    let products = signed_in(&server, TenantResolver::Fixed(TENANT.to_string())).await;
    let created = products
        .create(&sample_form().validate().unwrap())
        .await
        .unwrap();

    let mut form = ProductForm::from_product(&created);
    form.set("name", "Doppio");
    form.set("description", "");
    form.set("image", "");
    let updated = products
        .update(created.id, &form.validate().unwrap())
        .await
        .unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.name(), "Doppio");
    assert_eq!(updated.fields.description, None);
    assert_eq!(updated.fields.image, None);
    assert_eq!(updated.fields.category_id, created.fields.category_id);
}

#[tokio::test]
async fn test_delete_removes_from_list() {
    let server = TestServer::spawn().await;
    let products = signed_in(&server, TenantResolver::Fixed(TENANT.to_string())).await;
    let created = products
        .create(&sample_form().validate().unwrap())
        .await
        .unwrap();

    products.delete(created.id).await.unwrap();
    assert!(products.list().await.unwrap().is_empty());

    let err = products.get(created.id).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Failed to fetch product");
}

#[tokio::test]
async fn test_tenant_from_session_claims() {
    let server = TestServer::spawn().await;
    server.seed(
        "other",
        90,
        json!({
            "id": 90, "name": "Hidden", "slug": "hidden", "price": 1,
            "sort": 0, "is_active": true, "is_favorite": false, "category_id": 1
        }),
    );
    let products = signed_in(&server, TenantResolver::FromSession { fallback: None }).await;

    products
        .create(&sample_form().validate().unwrap())
        .await
        .unwrap();
    let listed = products.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name(), "Espresso");
}

#[tokio::test]
async fn test_malformed_response_fails_validation() {
    let server = TestServer::spawn().await;
    server.seed(
        TENANT,
        5,
        json!({ "id": 5, "name": "Broken", "slug": "broken", "price": "free" }),
    );
    let products = signed_in(&server, TenantResolver::Fixed(TENANT.to_string())).await;

    let err = products.get(5).await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidResponse { .. }));
    assert_eq!(err.to_string(), "Failed to fetch product");
}

#[tokio::test]
async fn test_requests_without_session_are_unauthorized() {
    let server = TestServer::spawn().await;
    let manager = SessionManager::new(server.client(), Arc::new(MemoryCredentialStore::new()));
    manager.hydrate();
    let products = ProductResource::new(
        server.client(),
        manager.subscribe(),
        TenantResolver::Fixed(TENANT.to_string()),
    );

    let err = products.list().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Failed to fetch products");
}
