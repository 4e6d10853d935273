//! Repository tests against an in-memory database.

use storeline_commerce::cart::MAX_QUANTITY_PER_ITEM;
use storeline_commerce::current_timestamp;
use storeline_commerce::prelude::*;
use storeline_commerce::repository::{CategoryInput, CategoryUpdate, Customer, Store};
use storeline_db::{params, Db};

async fn store() -> Store {
    let db = Db::in_memory().await.unwrap();
    Store::new(db, ShopSettings::default())
}

fn variant(sku: &str, price_cents: i64, inventory: i64) -> VariantInput {
    VariantInput {
        sku: sku.to_string(),
        price_cents,
        inventory,
        ..Default::default()
    }
}

fn product_input(name: &str, variants: Vec<VariantInput>) -> ProductInput {
    ProductInput {
        name: name.to_string(),
        status: ProductStatus::Active,
        variants,
        ..Default::default()
    }
}

fn checkout_input(email: Option<&str>) -> CheckoutInput {
    CheckoutInput {
        email: email.map(str::to_string),
        shipping_address: Address {
            name: "Ada Lovelace".into(),
            line1: "12 Analytical Row".into(),
            city: "London".into(),
            postal_code: "N1 9GU".into(),
            country: "gb".into(),
            ..Default::default()
        },
        note: None,
    }
}

async fn insert_user(store: &Store, email: &str) -> UserId {
    let id = UserId::generate();
    store
        .db
        .execute(
            "INSERT INTO users (id, email, name, password_hash, role, created_at, updated_at) \
             VALUES (?, ?, NULL, 'x', 'customer', 0, 0)",
            params![id.as_str(), email],
        )
        .await
        .unwrap();
    id
}

async fn inventory_of(store: &Store, sku: &str) -> i64 {
    store
        .db
        .query_scalar_i64(
            "SELECT inventory FROM product_variants WHERE sku = ?",
            params![sku],
        )
        .await
        .unwrap()
}

fn guest(token: &str) -> CartOwner {
    CartOwner::Guest(token.to_string())
}

#[tokio::test]
async fn test_category_tree_operations() {
    let store = store().await;
    let men = store
        .categories
        .create(CategoryInput {
            name: "Men".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let shirts = store
        .categories
        .create(CategoryInput {
            name: "Shirts".into(),
            parent_id: Some(men.id.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    let casual = store
        .categories
        .create(CategoryInput {
            name: "Casual".into(),
            parent_id: Some(shirts.id.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(casual.path, "men/shirts/casual");
    assert_eq!(casual.level, 2);
    assert_eq!(
        store.categories.breadcrumb(&casual.id).await.unwrap(),
        "Men > Shirts > Casual"
    );

    // Renaming rewrites the paths below.
    store
        .categories
        .update(
            &men.id,
            CategoryUpdate {
                name: Some("Menswear".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let casual = store.categories.get(&casual.id).await.unwrap();
    assert_eq!(casual.path, "menswear/shirts/casual");

    // Moving to the root carries the subtree.
    let shirts = store.categories.move_to(&shirts.id, None).await.unwrap();
    assert_eq!(shirts.path, "shirts");
    assert_eq!(shirts.level, 0);
    let casual = store.categories.get(&casual.id).await.unwrap();
    assert_eq!(casual.path, "shirts/casual");
    assert_eq!(casual.level, 1);

    assert!(matches!(
        store.categories.move_to(&shirts.id, Some(&casual.id)).await,
        Err(CommerceError::InvalidCategoryMove(_))
    ));
    assert!(matches!(
        store.categories.delete(&shirts.id).await,
        Err(CommerceError::CategoryHasChildren(_))
    ));

    let tree = store.categories.tree().await.unwrap();
    assert_eq!(tree.roots.len(), 2);
    assert_eq!(tree.len(), 3);

    store.categories.delete(&casual.id).await.unwrap();
    store.categories.delete(&shirts.id).await.unwrap();
    assert!(store.categories.get(&shirts.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_sibling_slugs_are_unique() {
    let store = store().await;
    let first = store
        .categories
        .create(CategoryInput {
            name: "Sale".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let second = store
        .categories
        .create(CategoryInput {
            name: "Sale!".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(first.slug, "sale");
    assert_eq!(second.slug, "sale-2");
    assert_eq!(
        store.categories.get_by_path("/sale-2/").await.unwrap().id,
        second.id
    );
}

#[tokio::test]
async fn test_product_create_and_update() {
    let store = store().await;
    let cotton = store.tags.create("Cotton").await.unwrap();
    assert!(matches!(
        store.tags.create("cotton").await,
        Err(CommerceError::Conflict(_))
    ));

    let mut input = product_input(
        "Classic Tee",
        vec![variant("TEE-S", 2000, 5), variant("TEE-M", 2200, 5)],
    );
    input.tag_ids = vec![cotton.id.clone()];
    let product = store.products.create(input).await.unwrap();
    assert_eq!(product.slug, "classic-tee");
    assert_eq!(product.variants.len(), 2);
    assert_eq!(product.tags[0].slug, "cotton");
    let (low, high) = product.price_range().unwrap();
    assert_eq!((low.amount_cents, high.amount_cents), (2000, 2200));

    let twin = store
        .products
        .create(product_input("Classic Tee", vec![variant("TEE2-S", 1000, 1)]))
        .await
        .unwrap();
    assert_eq!(twin.slug, "classic-tee-2");

    // Keep TEE-S with a new price, drop TEE-M, and hand its SKU to a new variant.
    let small = product.variants[0].clone();
    let mut kept = variant("TEE-S", 1800, 4);
    kept.id = Some(small.id.clone());
    let mut edit = product_input("Classic Tee (2024)", vec![kept, variant("TEE-M", 2100, 7)]);
    edit.featured = true;
    let updated = store.products.update(&product.id, edit).await.unwrap();

    assert_eq!(updated.slug, "classic-tee");
    assert!(updated.featured);
    assert!(updated.tags.is_empty());
    assert_eq!(updated.variants.len(), 2);
    assert_eq!(updated.variants[0].id, small.id);
    assert_eq!(updated.variants[0].price.amount_cents, 1800);
    assert_ne!(updated.variants[1].id, product.variants[1].id);
    assert_eq!(updated.variants[1].sku, "TEE-M");
    assert_eq!(updated.total_inventory(), 11);

    assert!(matches!(
        store
            .products
            .create(product_input("Clash", vec![variant("TEE-M", 100, 1)]))
            .await,
        Err(CommerceError::Conflict(_))
    ));

    store.products.delete(&twin.id).await.unwrap();
    assert!(matches!(
        store.products.get_by_slug("classic-tee-2").await,
        Err(CommerceError::ProductNotFound(_))
    ));
}

#[tokio::test]
async fn test_product_listing_filters() {
    let store = store().await;
    let apparel = store
        .categories
        .create(CategoryInput {
            name: "Apparel".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let hats = store
        .categories
        .create(CategoryInput {
            name: "Hats".into(),
            parent_id: Some(apparel.id.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    let summer = store.tags.create("Summer").await.unwrap();

    let mut cap = product_input("Cap", vec![variant("CAP", 1500, 0)]);
    cap.category_id = Some(hats.id.clone());
    cap.tag_ids = vec![summer.id.clone()];
    store.products.create(cap).await.unwrap();

    let mut jacket = product_input("Jacket", vec![variant("JKT", 9000, 3)]);
    jacket.category_id = Some(apparel.id.clone());
    store.products.create(jacket).await.unwrap();

    let mut draft = product_input("Prototype", vec![variant("PROTO", 500, 3)]);
    draft.status = ProductStatus::Draft;
    store.products.create(draft).await.unwrap();

    let all = store.products.list(&ProductQuery::new()).await.unwrap();
    assert_eq!(all.total, 3);

    let visible = ProductQuery::new()
        .storefront()
        .with_sort(SortOption::PriceDesc);
    let page = store.products.list(&visible).await.unwrap();
    let names: Vec<_> = page.items.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Jacket", "Cap"]);

    let in_apparel = ProductQuery {
        category_id: Some(apparel.id.clone()),
        ..ProductQuery::new()
    };
    assert_eq!(store.products.list(&in_apparel).await.unwrap().total, 2);

    let by_path = ProductQuery {
        category_path: Some("apparel/hats".into()),
        ..ProductQuery::new()
    };
    assert_eq!(store.products.list(&by_path).await.unwrap().items[0].name, "Cap");

    let tagged = ProductQuery {
        tag: Some("summer".into()),
        ..ProductQuery::new()
    };
    assert_eq!(store.products.list(&tagged).await.unwrap().total, 1);

    let in_stock_cheap = ProductQuery {
        in_stock: Some(true),
        max_price: Some(5000),
        ..ProductQuery::new()
    };
    let page = store.products.list(&in_stock_cheap).await.unwrap();
    assert_eq!(page.items[0].name, "Prototype");
    assert_eq!(page.total, 1);

    let paged = ProductQuery::new()
        .with_sort(SortOption::NameAsc)
        .with_pagination(2, 2);
    let page = store.products.list(&paged).await.unwrap();
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].name, "Prototype");

    let search = ProductQuery::new().with_text("jack");
    assert_eq!(store.products.list(&search).await.unwrap().total, 1);
}

#[tokio::test]
async fn test_cart_lines_and_pricing() {
    let store = store().await;
    let tee = store
        .products
        .create(product_input("Tee", vec![variant("TEE", 2500, 10)]))
        .await
        .unwrap();
    let variant_id = tee.variants[0].id.clone();
    let owner = guest("g-1");

    store.carts.add_item(&owner, &variant_id, 1).await.unwrap();
    let cart = store.carts.add_item(&owner, &variant_id, 2).await.unwrap();
    assert_eq!(cart.unique_item_count(), 1);
    assert_eq!(cart.item_count(), 3);

    let view = store.carts.view(&owner, None).await.unwrap();
    assert_eq!(view.summary.subtotal.amount_cents, 7500);
    assert_eq!(view.summary.shipping.amount_cents, 0);
    assert_eq!(view.summary.total.amount_cents, 7500);

    let item_id = view.cart.items[0].id.clone();
    assert!(matches!(
        store.carts.update_item(&owner, &item_id, 11).await,
        Err(CommerceError::InsufficientInventory { available: 10, .. })
    ));
    let cart = store.carts.update_item(&owner, &item_id, 1).await.unwrap();
    assert_eq!(cart.item_count(), 1);

    // Below the free-shipping threshold the flat rate applies.
    let view = store.carts.view(&owner, None).await.unwrap();
    assert_eq!(view.summary.shipping.amount_cents, 500);
    assert_eq!(view.summary.total.amount_cents, 3000);

    store.carts.update_item(&owner, &item_id, 0).await.unwrap();
    assert!(store.carts.load(&owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cart_drops_unavailable_products() {
    let store = store().await;
    let mug = store
        .products
        .create(product_input("Mug", vec![variant("MUG", 900, 4)]))
        .await
        .unwrap();
    let owner = guest("g-2");
    store
        .carts
        .add_item(&owner, &mug.variants[0].id, 1)
        .await
        .unwrap();

    let mut archived = product_input("Mug", vec![variant("MUG", 900, 4)]);
    archived.variants[0].id = Some(mug.variants[0].id.clone());
    archived.status = ProductStatus::Archived;
    store.products.update(&mug.id, archived).await.unwrap();

    assert!(store.carts.load(&owner).await.unwrap().is_empty());
    assert!(matches!(
        store.carts.add_item(&owner, &mug.variants[0].id, 1).await,
        Err(CommerceError::ProductUnavailable(_))
    ));
}

#[tokio::test]
async fn test_merge_guest_cart() {
    let store = store().await;
    let user = insert_user(&store, "sam@example.com").await;
    let socks = store
        .products
        .create(product_input("Socks", vec![variant("SOCK", 500, 200)]))
        .await
        .unwrap();
    let hat = store
        .products
        .create(product_input("Hat", vec![variant("HAT", 1500, 5)]))
        .await
        .unwrap();

    let member = CartOwner::User(user.clone());
    store
        .carts
        .add_item(&member, &socks.variants[0].id, 60)
        .await
        .unwrap();
    let visitor = guest("g-3");
    store
        .carts
        .add_item(&visitor, &socks.variants[0].id, 60)
        .await
        .unwrap();
    store
        .carts
        .add_item(&visitor, &hat.variants[0].id, 1)
        .await
        .unwrap();

    store.carts.merge_guest("g-3", &user).await.unwrap();

    let cart = store.carts.load(&member).await.unwrap();
    assert_eq!(cart.unique_item_count(), 2);
    let socks_line = cart.get_item_by_variant(&socks.variants[0].id).unwrap();
    assert_eq!(socks_line.quantity, MAX_QUANTITY_PER_ITEM);
    assert!(store.carts.load(&visitor).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_with_coupon_and_cancel() {
    let store = store().await;
    let tee = store
        .products
        .create(product_input("Tee", vec![variant("TEE", 2500, 10)]))
        .await
        .unwrap();
    store
        .coupons
        .create(CouponInput {
            code: "save10".into(),
            kind: "percentage".into(),
            percent_off: Some(10),
            usage_limit: Some(5),
            ..Default::default()
        })
        .await
        .unwrap();

    let owner = guest("g-4");
    store
        .carts
        .add_item(&owner, &tee.variants[0].id, 2)
        .await
        .unwrap();
    let view = store.carts.apply_coupon(&owner, " Save10 ", None).await.unwrap();
    assert_eq!(view.cart.coupon_code.as_deref(), Some("SAVE10"));
    assert_eq!(view.summary.discount.amount_cents, 500);
    // 4500 after discount is under the threshold, so shipping is charged.
    assert_eq!(view.summary.shipping.amount_cents, 500);
    assert_eq!(view.summary.total.amount_cents, 5000);

    let order = store
        .orders
        .place_order(&owner, None, checkout_input(Some("Buyer@Example.com")))
        .await
        .unwrap();
    assert!(order.order_number.starts_with("ORD-"));
    assert_eq!(order.email, "buyer@example.com");
    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(order.grand_total.amount_cents, 5000);
    assert_eq!(order.shipping_address.country, "GB");
    assert_eq!(inventory_of(&store, "TEE").await, 8);
    assert_eq!(store.coupons.get_by_code("SAVE10").await.unwrap().usage_count, 1);
    assert!(store.carts.load(&owner).await.unwrap().is_empty());

    let stored = store.orders.get(&order.id).await.unwrap();
    assert_eq!(stored.items.len(), 1);
    assert_eq!(stored.items[0].line_total.amount_cents, 5000);
    assert_eq!(stored.coupon_code.as_deref(), Some("SAVE10"));

    let cancelled = store.orders.cancel(&order.id).await.unwrap();
    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert_eq!(inventory_of(&store, "TEE").await, 10);
    assert_eq!(store.coupons.get_by_code("SAVE10").await.unwrap().usage_count, 0);

    assert!(matches!(
        store.orders.cancel(&order.id).await,
        Err(CommerceError::InvalidOrderTransition { .. })
    ));
}

#[tokio::test]
async fn test_checkout_rejections() {
    let store = store().await;
    let owner = guest("g-5");
    assert!(matches!(
        store
            .orders
            .place_order(&owner, None, checkout_input(Some("a@b.co")))
            .await,
        Err(CommerceError::EmptyCart)
    ));

    let lamp = store
        .products
        .create(product_input("Lamp", vec![variant("LAMP", 4000, 2)]))
        .await
        .unwrap();
    store
        .carts
        .add_item(&owner, &lamp.variants[0].id, 2)
        .await
        .unwrap();

    assert!(matches!(
        store.orders.place_order(&owner, None, checkout_input(None)).await,
        Err(CommerceError::ValidationError(_))
    ));

    store
        .db
        .execute(
            "UPDATE product_variants SET inventory = 1 WHERE sku = 'LAMP'",
            params![],
        )
        .await
        .unwrap();
    assert!(matches!(
        store
            .orders
            .place_order(&owner, None, checkout_input(Some("a@b.co")))
            .await,
        Err(CommerceError::InsufficientInventory {
            requested: 2,
            available: 1,
            ..
        })
    ));
    assert_eq!(store.carts.load(&owner).await.unwrap().item_count(), 2);
}

#[tokio::test]
async fn test_coupon_customer_limit() {
    let store = store().await;
    let user = insert_user(&store, "kim@example.com").await;
    let book = store
        .products
        .create(product_input("Book", vec![variant("BOOK", 3000, 10)]))
        .await
        .unwrap();
    let coupon = store
        .coupons
        .create(CouponInput {
            code: "WELCOME".into(),
            kind: "fixed".into(),
            amount_off_cents: Some(500),
            per_customer_limit: Some(1),
            min_subtotal_cents: Some(2000),
            ..Default::default()
        })
        .await
        .unwrap();

    let owner = CartOwner::User(user.clone());
    store
        .carts
        .add_item(&owner, &book.variants[0].id, 1)
        .await
        .unwrap();
    store
        .carts
        .apply_coupon(&owner, "welcome", Some(&user))
        .await
        .unwrap();
    let order = store
        .orders
        .place_order(
            &owner,
            Some(Customer {
                id: &user,
                email: "kim@example.com",
            }),
            checkout_input(None),
        )
        .await
        .unwrap();
    assert_eq!(order.user_id.as_ref(), Some(&user));
    assert_eq!(order.discount_total.amount_cents, 500);

    store
        .carts
        .add_item(&owner, &book.variants[0].id, 1)
        .await
        .unwrap();
    assert!(matches!(
        store.carts.apply_coupon(&owner, "WELCOME", Some(&user)).await,
        Err(CommerceError::CouponRejected(CouponRejection::CustomerLimitReached))
    ));

    // Guests are not bound by the per-customer limit, but the minimum still applies.
    let visitor = guest("g-6");
    store
        .carts
        .add_item(&visitor, &book.variants[0].id, 1)
        .await
        .unwrap();
    store.coupons.set_active(&coupon.id, false).await.unwrap();
    assert!(matches!(
        store.carts.apply_coupon(&visitor, "WELCOME", None).await,
        Err(CommerceError::CouponRejected(CouponRejection::Inactive))
    ));

    let listing = store.coupons.list_with_status(current_timestamp()).await.unwrap();
    assert_eq!(listing[0].status, CouponStatus::Disabled);
}

#[tokio::test]
async fn test_order_lifecycle_and_listing() {
    let store = store().await;
    let user = insert_user(&store, "lee@example.com").await;
    let pen = store
        .products
        .create(product_input("Pen", vec![variant("PEN", 300, 50)]))
        .await
        .unwrap();

    let mut placed = Vec::new();
    for _ in 0..3 {
        let owner = CartOwner::User(user.clone());
        store
            .carts
            .add_item(&owner, &pen.variants[0].id, 1)
            .await
            .unwrap();
        let customer = Customer {
            id: &user,
            email: "lee@example.com",
        };
        placed.push(
            store
                .orders
                .place_order(&owner, Some(customer), checkout_input(None))
                .await
                .unwrap(),
        );
    }

    let first = &placed[0].id;
    assert!(matches!(
        store.orders.mark_shipped(first).await,
        Err(CommerceError::InvalidOrderTransition { .. })
    ));
    store.orders.mark_paid(first).await.unwrap();
    store.orders.mark_shipped(first).await.unwrap();
    let delivered = store.orders.mark_delivered(first).await.unwrap();
    assert_eq!(delivered.status(), OrderStatus::Delivered);
    assert!(matches!(
        store.orders.cancel(first).await,
        Err(CommerceError::InvalidOrderTransition { .. })
    ));

    store.orders.mark_paid(&placed[1].id).await.unwrap();
    assert!(matches!(
        store.orders.cancel_for_user(&user, &placed[1].id).await,
        Err(CommerceError::InvalidOrderTransition { .. })
    ));
    store
        .orders
        .cancel_for_user(&user, &placed[2].id)
        .await
        .unwrap();

    let delivered_only = OrderQuery {
        status: Some(OrderStatus::Delivered),
        ..Default::default()
    };
    let page = store.orders.list(&delivered_only).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, *first);

    let by_email = OrderQuery {
        email: Some("LEE@".into()),
        ..Default::default()
    };
    assert_eq!(store.orders.list(&by_email).await.unwrap().total, 3);
    assert_eq!(store.orders.list_for_user(&user).await.unwrap().len(), 3);

    let stranger = UserId::generate();
    assert!(matches!(
        store.orders.get_for_user(&stranger, first).await,
        Err(CommerceError::OrderNotFound(_))
    ));

    let stats = store.dashboard.stats().await.unwrap();
    assert_eq!(stats.orders.delivered, 1);
    assert_eq!(stats.orders.paid, 1);
    assert_eq!(stats.orders.cancelled, 1);
    assert_eq!(stats.orders.total(), 3);
    // Two paid orders: 300 + 500 shipping each.
    assert_eq!(stats.revenue.amount_cents, 1600);
    assert_eq!(stats.customer_count, 1);
    assert_eq!(stats.product_count, 1);
    assert_eq!(stats.recent_orders.len(), 3);
}

#[tokio::test]
async fn test_dashboard_low_stock() {
    let store = store().await;
    store
        .products
        .create(product_input(
            "Candle",
            vec![variant("CANDLE-S", 800, 2), variant("CANDLE-L", 1200, 40)],
        ))
        .await
        .unwrap();

    let stats = store.dashboard.stats().await.unwrap();
    assert_eq!(stats.low_stock.len(), 1);
    assert_eq!(stats.low_stock[0].sku, "CANDLE-S");
    assert_eq!(stats.revenue.amount_cents, 0);
    assert_eq!(stats.active_product_count, 1);
}

#[tokio::test]
async fn test_category_delete_detaches_products() {
    let store = store().await;
    let kitchen = store
        .categories
        .create(CategoryInput {
            name: "Kitchen".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let mut input = product_input("Mug", vec![variant("MUG", 1800, 3)]);
    input.category_id = Some(kitchen.id.clone());
    let mug = store.products.create(input).await.unwrap();
    assert_eq!(mug.category_id.as_ref(), Some(&kitchen.id));

    store.categories.delete(&kitchen.id).await.unwrap();

    let mug = store.products.get(&mug.id).await.unwrap();
    assert_eq!(mug.category_id, None);
    assert_eq!(mug.variants.len(), 1);
}

#[tokio::test]
async fn test_order_history_survives_product_delete() {
    let store = store().await;
    let lamp = store
        .products
        .create(product_input("Desk Lamp", vec![variant("LAMP", 4200, 5)]))
        .await
        .unwrap();

    let owner = guest("g-lamp");
    store
        .carts
        .add_item(&owner, &lamp.variants[0].id, 1)
        .await
        .unwrap();
    let order = store
        .orders
        .place_order(&owner, None, checkout_input(Some("lamp@example.com")))
        .await
        .unwrap();
    assert_eq!(order.items[0].product_id.as_ref(), Some(&lamp.id));

    store.products.delete(&lamp.id).await.unwrap();
    assert!(matches!(
        store.products.delete(&lamp.id).await,
        Err(CommerceError::ProductNotFound(_))
    ));

    let stored = store.orders.get(&order.id).await.unwrap();
    assert_eq!(stored.items.len(), 1);
    let item = &stored.items[0];
    assert_eq!(item.variant_id, None);
    assert_eq!(item.product_id, None);
    assert_eq!(item.sku, "LAMP");
    assert_eq!(item.product_name, "Desk Lamp");
    assert_eq!(item.line_total.amount_cents, 4200);
}

#[tokio::test]
async fn test_redeemed_coupon_code_is_fixed() {
    let store = store().await;
    let tee = store
        .products
        .create(product_input("Tee", vec![variant("TEE", 2500, 10)]))
        .await
        .unwrap();
    let rules = |code: &str| CouponInput {
        code: code.into(),
        kind: "percentage".into(),
        percent_off: Some(10),
        ..Default::default()
    };
    let coupon = store.coupons.create(rules("SPRING")).await.unwrap();

    let owner = guest("g-spring");
    store
        .carts
        .add_item(&owner, &tee.variants[0].id, 1)
        .await
        .unwrap();
    store.carts.apply_coupon(&owner, "spring", None).await.unwrap();
    let order = store
        .orders
        .place_order(&owner, None, checkout_input(Some("spring@example.com")))
        .await
        .unwrap();

    assert!(matches!(
        store.coupons.update(&coupon.id, rules("SUMMER")).await,
        Err(CommerceError::Conflict(_))
    ));
    let mut deeper = rules("spring");
    deeper.percent_off = Some(15);
    let updated = store.coupons.update(&coupon.id, deeper).await.unwrap();
    assert_eq!(updated.code, "SPRING");

    store.orders.cancel(&order.id).await.unwrap();
    assert_eq!(store.coupons.get_by_code("SPRING").await.unwrap().usage_count, 0);
    let renamed = store.coupons.update(&coupon.id, rules("SUMMER")).await.unwrap();
    assert_eq!(renamed.code, "SUMMER");
}
