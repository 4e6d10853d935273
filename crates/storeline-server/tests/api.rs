//! End-to-end API tests against an in-memory database.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use storeline_auth::{NewUser, PasswordHasher, Role};
use storeline_db::Db;
use storeline_server::{router, AppState, StorelineConfig};
use tower::ServiceExt;

struct TestApp {
    app: Router,
    state: AppState,
}

struct Reply {
    status: StatusCode,
    cart_session: Option<String>,
    body: Value,
}

impl TestApp {
    async fn new() -> Self {
        let db = Db::in_memory().await.unwrap();
        let state = AppState::with_hasher(
            db,
            StorelineConfig::default(),
            PasswordHasher::new(64, 1).unwrap(),
        );
        Self {
            app: router(state.clone()),
            state,
        }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        cart: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(cart) = cart {
            builder = builder.header("x-cart-session", cart);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cart_session = response
            .headers()
            .get("x-cart-session")
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Reply {
            status,
            cart_session,
            body,
        }
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> Reply {
        self.send("GET", uri, token, None, None).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Reply {
        self.send("POST", uri, token, None, Some(body)).await
    }

    /// Create an account directly and sign it in through the API.
    async fn sign_in_as(&self, email: &str, role: Role) -> String {
        self.state
            .users
            .create(NewUser {
                email: email.to_string(),
                password: "password123".to_string(),
                name: None,
                role,
            })
            .await
            .unwrap();
        let reply = self
            .post(
                "/api/auth/login",
                None,
                json!({ "email": email, "password": "password123" }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        reply.body["token"].as_str().unwrap().to_string()
    }

    /// Create an active product with one variant; returns (product, variant id).
    async fn create_product(
        &self,
        admin: &str,
        name: &str,
        sku: &str,
        price: i64,
    ) -> (Value, String) {
        let reply = self
            .post(
                "/admin/api/products",
                Some(admin),
                json!({
                    "name": name,
                    "status": "active",
                    "variants": [{ "sku": sku, "price_cents": price, "inventory": 10 }]
                }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        let variant_id = reply.body["variants"][0]["id"].as_str().unwrap().to_string();
        (reply.body, variant_id)
    }
}

fn address() -> Value {
    json!({
        "name": "Ada Lovelace",
        "line1": "12 Analytical Row",
        "city": "London",
        "postal_code": "N1 9GU",
        "country": "GB"
    })
}

#[tokio::test]
async fn test_healthz_and_unknown_route() {
    let app = TestApp::new().await;

    let reply = app.get("/healthz", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ok");

    let reply = app.get("/nope", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_admin_requires_staff() {
    let app = TestApp::new().await;

    let reply = app.get("/admin/api/dashboard", None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"]["code"], "unauthorized");

    let reply = app.get("/admin/api/dashboard", Some("sess_bogus")).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let customer = app.sign_in_as("shopper@example.com", Role::Customer).await;
    let reply = app.get("/admin/api/dashboard", Some(&customer)).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let staff = app.sign_in_as("staff@example.com", Role::Staff).await;
    let reply = app.get("/admin/api/dashboard", Some(&staff)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["customer_count"], 1);

    // User management is admin-only.
    let reply = app.get("/admin/api/users", Some(&staff)).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    let admin = app.sign_in_as("admin@example.com", Role::Admin).await;
    let reply = app.get("/admin/api/users", Some(&admin)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_catalog_admin_and_storefront() {
    let app = TestApp::new().await;
    let admin = app.sign_in_as("admin@example.com", Role::Admin).await;

    let men = app
        .post("/admin/api/categories", Some(&admin), json!({ "name": "Men" }))
        .await;
    assert_eq!(men.status, StatusCode::CREATED);
    let shirts = app
        .post(
            "/admin/api/categories",
            Some(&admin),
            json!({ "name": "Shirts", "parent_id": men.body["id"] }),
        )
        .await;
    assert_eq!(shirts.body["path"], "men/shirts");

    let tag = app
        .post("/admin/api/tags", Some(&admin), json!({ "name": "Summer" }))
        .await;
    assert_eq!(tag.status, StatusCode::CREATED);

    let product = app
        .post(
            "/admin/api/products",
            Some(&admin),
            json!({
                "name": "Linen Shirt",
                "status": "active",
                "category_id": shirts.body["id"],
                "tag_ids": [tag.body["id"]],
                "variants": [{ "sku": "LS-M", "size": "M", "price_cents": 4500, "inventory": 3 }]
            }),
        )
        .await;
    assert_eq!(product.status, StatusCode::CREATED);
    assert_eq!(product.body["slug"], "linen-shirt");

    let draft = app
        .post(
            "/admin/api/products",
            Some(&admin),
            json!({
                "name": "Secret Shirt",
                "category_id": shirts.body["id"],
                "variants": [{ "sku": "SS-M", "price_cents": 100, "inventory": 1 }]
            }),
        )
        .await;
    assert_eq!(draft.status, StatusCode::CREATED);

    // Storefront sees only the active product.
    let listing = app.get("/api/products", None).await;
    assert_eq!(listing.status, StatusCode::OK);
    assert_eq!(listing.body["total"], 1);
    let listing = app.get("/api/products?status=draft", None).await;
    assert_eq!(listing.body["total"], 1);
    assert_eq!(listing.body["items"][0]["name"], "Linen Shirt");

    let reply = app.get("/api/products/linen-shirt", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let reply = app.get("/api/products/secret-shirt", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let page = app.get("/api/categories/men", None).await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["breadcrumb"], "Men");
    assert_eq!(page.body["products"]["total"], 1);
    let page = app.get("/api/categories/men/shirts", None).await;
    assert_eq!(page.body["category"]["name"], "Shirts");
    let page = app.get("/api/categories/women", None).await;
    assert_eq!(page.status, StatusCode::NOT_FOUND);

    let tree = app.get("/api/categories", None).await;
    assert_eq!(tree.body[0]["children"][0]["slug"], "shirts");

    // Admin listing includes drafts.
    let listing = app.get("/admin/api/products", Some(&admin)).await;
    assert_eq!(listing.body["total"], 2);

    // A category with children cannot be deleted.
    let reply = app
        .send(
            "DELETE",
            &format!("/admin/api/categories/{}", men.body["id"].as_str().unwrap()),
            Some(&admin),
            None,
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reply.body["error"]["code"], "category_has_children");

    // Duplicate SKUs conflict.
    let reply = app
        .post(
            "/admin/api/products",
            Some(&admin),
            json!({
                "name": "Linen Shirt Copy",
                "variants": [{ "sku": "LS-M", "price_cents": 4500, "inventory": 1 }]
            }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_guest_cart_coupon_and_checkout() {
    let app = TestApp::new().await;
    let admin = app.sign_in_as("admin@example.com", Role::Admin).await;
    let (_, variant) = app.create_product(&admin, "Canvas Tote", "TOTE", 2000).await;

    let coupon = app
        .post(
            "/admin/api/coupons",
            Some(&admin),
            json!({ "code": "save10", "kind": "percentage", "percent_off": 10 }),
        )
        .await;
    assert_eq!(coupon.status, StatusCode::CREATED);
    assert_eq!(coupon.body["code"], "SAVE10");

    // A new guest is issued a cart token.
    let reply = app
        .send(
            "POST",
            "/api/cart/items",
            None,
            None,
            Some(json!({ "variant_id": variant, "quantity": 2 })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let cart = reply.cart_session.expect("guest cart token");
    assert_eq!(reply.body["summary"]["item_count"], 2);

    let reply = app
        .send(
            "POST",
            "/api/cart/coupon",
            None,
            Some(&cart),
            Some(json!({ "code": "nope" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = app
        .send(
            "POST",
            "/api/cart/coupon",
            None,
            Some(&cart),
            Some(json!({ "code": " Save10 " })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.cart_session.is_none());
    assert_eq!(reply.body["summary"]["discount"]["amount_cents"], 400);
    assert_eq!(reply.body["summary"]["total"]["amount_cents"], 4100);

    // Guests must give an email.
    let reply = app
        .send(
            "POST",
            "/api/checkout",
            None,
            Some(&cart),
            Some(json!({ "shipping_address": address() })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app
        .send(
            "POST",
            "/api/checkout",
            None,
            Some(&cart),
            Some(json!({ "email": "Guest@Example.com", "shipping_address": address() })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    assert_eq!(reply.body["status"], "pending");
    assert_eq!(reply.body["email"], "guest@example.com");
    assert_eq!(reply.body["total"]["amount_cents"], 4100);
    let order_id = reply.body["id"].as_str().unwrap().to_string();

    // The cart is gone.
    let reply = app.send("GET", "/api/cart", None, Some(&cart), None).await;
    assert_eq!(reply.body["summary"]["item_count"], 0);
    let reply = app
        .send("POST", "/api/checkout", None, Some(&cart), Some(json!({
            "email": "guest@example.com",
            "shipping_address": address()
        })))
        .await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reply.body["error"]["code"], "empty_cart");

    // Admin fulfils the order.
    let pay = app
        .post(&format!("/admin/api/orders/{}/pay", order_id), Some(&admin), json!({}))
        .await;
    assert_eq!(pay.body["status"], "paid");
    let again = app
        .post(&format!("/admin/api/orders/{}/pay", order_id), Some(&admin), json!({}))
        .await;
    assert_eq!(again.status, StatusCode::UNPROCESSABLE_ENTITY);
    let ship = app
        .post(&format!("/admin/api/orders/{}/ship", order_id), Some(&admin), json!({}))
        .await;
    assert_eq!(ship.body["status"], "shipped");

    let orders = app.get("/admin/api/orders?status=shipped", Some(&admin)).await;
    assert_eq!(orders.body["total"], 1);
    let orders = app.get("/admin/api/orders?email=nobody", Some(&admin)).await;
    assert_eq!(orders.body["total"], 0);

    let stats = app.get("/admin/api/dashboard", Some(&admin)).await;
    assert_eq!(stats.body["revenue"]["amount_cents"], 4100);
    assert_eq!(stats.body["orders"]["shipped"], 1);

    let coupons = app.get("/admin/api/coupons", Some(&admin)).await;
    assert_eq!(coupons.body[0]["usage_count"], 1);
    assert_eq!(coupons.body[0]["status"], "active");
}

#[tokio::test]
async fn test_register_merges_guest_cart_and_account_orders() {
    let app = TestApp::new().await;
    let admin = app.sign_in_as("admin@example.com", Role::Admin).await;
    let (_, variant) = app.create_product(&admin, "Mug", "MUG", 1200).await;

    let reply = app
        .send(
            "POST",
            "/api/cart/items",
            None,
            None,
            Some(json!({ "variant_id": variant })),
        )
        .await;
    let cart = reply.cart_session.unwrap();

    let reply = app
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(&cart),
            Some(json!({ "email": "ada@example.com", "password": "lovelace1", "name": "Ada" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["user"]["role"], "customer");
    let token = reply.body["token"].as_str().unwrap().to_string();

    let reply = app.get("/api/cart", Some(&token)).await;
    assert_eq!(reply.body["summary"]["item_count"], 1);

    let reply = app
        .post(
            "/api/auth/register",
            None,
            json!({ "email": "ADA@example.com", "password": "lovelace1" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let reply = app
        .post("/api/checkout", Some(&token), json!({ "shipping_address": address() }))
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["email"], "ada@example.com");
    let order_id = reply.body["id"].as_str().unwrap().to_string();

    let mine = app.get("/api/account/orders", Some(&token)).await;
    assert_eq!(mine.body.as_array().unwrap().len(), 1);

    // Other customers cannot see it.
    let other = app.sign_in_as("bob@example.com", Role::Customer).await;
    let reply = app
        .get(&format!("/api/account/orders/{}", order_id), Some(&other))
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = app
        .post(
            &format!("/api/account/orders/{}/cancel", order_id),
            Some(&token),
            json!({}),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "cancelled");

    let product = app.get("/api/products/mug", None).await;
    assert_eq!(product.body["variants"][0]["inventory"], 10);
}

#[tokio::test]
async fn test_account_profile_password_and_logout() {
    let app = TestApp::new().await;
    let token = app.sign_in_as("ada@example.com", Role::Customer).await;

    let reply = app
        .send(
            "PATCH",
            "/api/account",
            Some(&token),
            None,
            Some(json!({ "name": "Ada Lovelace" })),
        )
        .await;
    assert_eq!(reply.body["name"], "Ada Lovelace");

    let reply = app
        .post(
            "/api/account/password",
            Some(&token),
            json!({ "current_password": "wrong", "new_password": "newpassword1" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = app
        .post(
            "/api/account/password",
            Some(&token),
            json!({ "current_password": "password123", "new_password": "newpassword1" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let fresh = reply.body["token"].as_str().unwrap().to_string();

    // The old session ended with the password change.
    assert_eq!(
        app.get("/api/account", Some(&token)).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(app.get("/api/account", Some(&fresh)).await.status, StatusCode::OK);

    let reply = app.post("/api/auth/logout", Some(&fresh), json!({})).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    assert_eq!(
        app.get("/api/account", Some(&fresh)).await.status,
        StatusCode::UNAUTHORIZED
    );

    let reply = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "ada@example.com", "password": "password123" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"]["message"], "invalid credentials");
}

#[tokio::test]
async fn test_admin_user_management() {
    let app = TestApp::new().await;
    let admin = app.sign_in_as("admin@example.com", Role::Admin).await;
    let clerk = app.sign_in_as("clerk@example.com", Role::Customer).await;

    let users = app.get("/admin/api/users", Some(&admin)).await;
    let find = |email: &str| {
        users.body.as_array().unwrap().iter()
            .find(|u| u["email"] == email)
            .map(|u| u["id"].as_str().unwrap().to_string())
            .unwrap()
    };
    let admin_id = find("admin@example.com");
    let clerk_id = find("clerk@example.com");

    let reply = app
        .send(
            "PATCH",
            &format!("/admin/api/users/{}/role", clerk_id),
            Some(&admin),
            None,
            Some(json!({ "role": "staff" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["role"], "staff");
    // The clerk must sign in again.
    assert_eq!(
        app.get("/api/account", Some(&clerk)).await.status,
        StatusCode::UNAUTHORIZED
    );

    let reply = app
        .send(
            "PATCH",
            &format!("/admin/api/users/{}/role", admin_id),
            Some(&admin),
            None,
            Some(json!({ "role": "customer" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = app
        .send(
            "DELETE",
            &format!("/admin/api/users/{}", admin_id),
            Some(&admin),
            None,
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = app
        .send(
            "DELETE",
            &format!("/admin/api/users/{}", clerk_id),
            Some(&admin),
            None,
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    let users = app.get("/admin/api/users", Some(&admin)).await;
    assert_eq!(users.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_bad_requests_use_error_format() {
    let app = TestApp::new().await;
    let admin = app.sign_in_as("admin@example.com", Role::Admin).await;

    let request = Request::builder()
        .method("POST")
        .uri("/admin/api/tags")
        .header(header::AUTHORIZATION, format!("Bearer {}", admin))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    let reply = app
        .send("GET", "/api/cart", None, Some("bad token!"), None)
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app
        .post(
            "/admin/api/coupons/validate",
            Some(&admin),
            json!({ "code": "GHOST", "subtotal_cents": 1000 }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    app.post(
        "/admin/api/coupons",
        Some(&admin),
        json!({
            "code": "BIG",
            "kind": "fixed",
            "amount_off_cents": 500,
            "min_subtotal_cents": 5000,
        }),
    )
    .await;
    let reply = app
        .post(
            "/admin/api/coupons/validate",
            Some(&admin),
            json!({ "code": "big", "subtotal_cents": 1000 }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reply.body["error"]["code"], "minimum_not_met");
    let reply = app
        .post(
            "/admin/api/coupons/validate",
            Some(&admin),
            json!({ "code": "big", "subtotal_cents": 6000 }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["discount"]["items"]["amount_cents"], 500);
}
