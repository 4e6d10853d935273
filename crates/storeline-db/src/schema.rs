//! Embedded schema, applied by [`crate::Db::migrate`].
//!
//! Money columns hold integer cents; timestamps are Unix seconds.

pub(crate) const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS categories (
        id TEXT PRIMARY KEY,
        parent_id TEXT REFERENCES categories(id) ON DELETE RESTRICT,
        name TEXT NOT NULL,
        slug TEXT NOT NULL,
        description TEXT,
        position INTEGER NOT NULL DEFAULT 0,
        level INTEGER NOT NULL DEFAULT 0,
        path TEXT NOT NULL UNIQUE,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_categories_parent ON categories(parent_id)",
    "CREATE TABLE IF NOT EXISTS tags (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS products (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        description TEXT,
        status TEXT NOT NULL DEFAULT 'draft',
        category_id TEXT REFERENCES categories(id) ON DELETE SET NULL,
        featured INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_products_category ON products(category_id)",
    "CREATE TABLE IF NOT EXISTS product_variants (
        id TEXT PRIMARY KEY,
        product_id TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
        sku TEXT NOT NULL UNIQUE,
        size TEXT,
        color TEXT,
        material TEXT,
        price_cents INTEGER NOT NULL CHECK (price_cents >= 0),
        compare_at_cents INTEGER,
        inventory INTEGER NOT NULL DEFAULT 0 CHECK (inventory >= 0),
        position INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_variants_product ON product_variants(product_id)",
    "CREATE TABLE IF NOT EXISTS product_tags (
        product_id TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
        tag_id TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
        PRIMARY KEY (product_id, tag_id)
    )",
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        name TEXT,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'customer',
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        last_login_at INTEGER
    )",
    "CREATE TABLE IF NOT EXISTS carts (
        id TEXT PRIMARY KEY,
        owner_key TEXT NOT NULL UNIQUE,
        coupon_code TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS cart_items (
        id TEXT PRIMARY KEY,
        cart_id TEXT NOT NULL REFERENCES carts(id) ON DELETE CASCADE,
        variant_id TEXT NOT NULL REFERENCES product_variants(id) ON DELETE CASCADE,
        quantity INTEGER NOT NULL CHECK (quantity > 0),
        created_at INTEGER NOT NULL,
        UNIQUE (cart_id, variant_id)
    )",
    "CREATE TABLE IF NOT EXISTS coupons (
        id TEXT PRIMARY KEY,
        code TEXT NOT NULL UNIQUE,
        description TEXT,
        kind TEXT NOT NULL,
        percent_off INTEGER,
        amount_off_cents INTEGER,
        min_subtotal_cents INTEGER,
        max_discount_cents INTEGER,
        starts_at INTEGER,
        ends_at INTEGER,
        usage_limit INTEGER,
        usage_count INTEGER NOT NULL DEFAULT 0,
        per_customer_limit INTEGER,
        active INTEGER NOT NULL DEFAULT 1,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS orders (
        id TEXT PRIMARY KEY,
        order_number TEXT NOT NULL UNIQUE,
        user_id TEXT REFERENCES users(id) ON DELETE SET NULL,
        email TEXT NOT NULL,
        currency TEXT NOT NULL,
        subtotal_cents INTEGER NOT NULL,
        discount_cents INTEGER NOT NULL,
        shipping_cents INTEGER NOT NULL,
        tax_cents INTEGER NOT NULL,
        total_cents INTEGER NOT NULL,
        coupon_code TEXT,
        note TEXT,
        ship_name TEXT NOT NULL,
        ship_line1 TEXT NOT NULL,
        ship_line2 TEXT,
        ship_city TEXT NOT NULL,
        ship_region TEXT,
        ship_postal_code TEXT NOT NULL,
        ship_country TEXT NOT NULL,
        ship_phone TEXT,
        placed_at INTEGER NOT NULL,
        paid_at INTEGER,
        shipped_at INTEGER,
        delivered_at INTEGER,
        cancelled_at INTEGER
    )",
    "CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_orders_placed ON orders(placed_at)",
    "CREATE TABLE IF NOT EXISTS order_items (
        id TEXT PRIMARY KEY,
        order_id TEXT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
        variant_id TEXT REFERENCES product_variants(id) ON DELETE SET NULL,
        product_id TEXT REFERENCES products(id) ON DELETE SET NULL,
        sku TEXT NOT NULL,
        product_name TEXT NOT NULL,
        variant_title TEXT NOT NULL,
        unit_price_cents INTEGER NOT NULL,
        quantity INTEGER NOT NULL,
        line_total_cents INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_order_items_order ON order_items(order_id)",
];
