//! Marketplace schema
//!
//! Every statement is idempotent, so `run` is safe on every startup.

use sqlx::PgPool;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        auth_subject UUID NOT NULL UNIQUE,
        username TEXT NOT NULL,
        email TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'USER' CHECK (role IN ('USER', 'ADMIN')),
        status TEXT NOT NULL DEFAULT 'ACTIVE' CHECK (status IN ('ACTIVE', 'SUSPENDED')),
        is_premium BOOLEAN NOT NULL DEFAULT FALSE,
        premium_until TIMESTAMPTZ,
        free_promotions_used INTEGER NOT NULL DEFAULT 0 CHECK (free_promotions_used >= 0),
        free_promotions_reset_at TIMESTAMPTZ,
        average_rating NUMERIC(3, 2),
        total_reviews INTEGER NOT NULL DEFAULT 0,
        avatar_url TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS users_username_key ON users (lower(username))",
    r#"
    CREATE TABLE IF NOT EXISTS listings (
        id BIGSERIAL PRIMARY KEY,
        seller_id BIGINT NOT NULL REFERENCES users(id),
        name TEXT NOT NULL,
        description TEXT,
        price NUMERIC(12, 2) NOT NULL CHECK (price > 0),
        condition_type TEXT NOT NULL,
        brand TEXT,
        size TEXT,
        category TEXT,
        image_urls TEXT[] NOT NULL DEFAULT '{}',
        listed BOOLEAN NOT NULL DEFAULT TRUE,
        sold BOOLEAN NOT NULL DEFAULT FALSE,
        sold_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CONSTRAINT listings_sold_not_listed CHECK (NOT (sold AND listed)),
        CONSTRAINT listings_sold_has_time CHECK (NOT sold OR sold_at IS NOT NULL)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS listings_feed_idx ON listings (created_at DESC) WHERE listed AND NOT sold",
    "CREATE INDEX IF NOT EXISTS listings_seller_idx ON listings (seller_id)",
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id BIGSERIAL PRIMARY KEY,
        order_number TEXT NOT NULL UNIQUE,
        buyer_id BIGINT NOT NULL REFERENCES users(id),
        seller_id BIGINT NOT NULL REFERENCES users(id),
        listing_id BIGINT NOT NULL REFERENCES listings(id),
        status TEXT NOT NULL DEFAULT 'PENDING' CHECK (status IN (
            'PENDING', 'TO_SHIP', 'SHIPPED', 'DELIVERED', 'RECEIVED',
            'COMPLETED', 'REVIEWED', 'CANCELLED'
        )),
        quantity INTEGER NOT NULL DEFAULT 1 CHECK (quantity > 0),
        unit_price NUMERIC(12, 2) NOT NULL,
        subtotal NUMERIC(12, 2) NOT NULL,
        shipping_fee NUMERIC(12, 2) NOT NULL,
        tax_amount NUMERIC(12, 2) NOT NULL,
        total_amount NUMERIC(12, 2) NOT NULL,
        currency TEXT NOT NULL DEFAULT 'USD',
        shipping_method TEXT,
        notes TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        shipped_at TIMESTAMPTZ,
        delivered_at TIMESTAMPTZ,
        completed_at TIMESTAMPTZ,
        cancelled_at TIMESTAMPTZ,
        CONSTRAINT orders_not_self CHECK (buyer_id <> seller_id)
    )
    "#,
    // One order holds a listing until it is cancelled.
    "CREATE UNIQUE INDEX IF NOT EXISTS orders_one_per_listing ON orders (listing_id) WHERE status <> 'CANCELLED'",
    "CREATE INDEX IF NOT EXISTS orders_buyer_idx ON orders (buyer_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS orders_seller_idx ON orders (seller_id, created_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS reviews (
        id BIGSERIAL PRIMARY KEY,
        order_id BIGINT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
        reviewer_id BIGINT NOT NULL REFERENCES users(id),
        reviewee_id BIGINT NOT NULL REFERENCES users(id),
        rating SMALLINT NOT NULL CHECK (rating BETWEEN 1 AND 5),
        comment TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (order_id, reviewer_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS reviews_reviewee_idx ON reviews (reviewee_id, created_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS conversations (
        id BIGSERIAL PRIMARY KEY,
        initiator_id BIGINT NOT NULL REFERENCES users(id),
        participant_id BIGINT NOT NULL REFERENCES users(id),
        listing_id BIGINT REFERENCES listings(id) ON DELETE SET NULL,
        kind TEXT NOT NULL DEFAULT 'GENERAL' CHECK (kind IN ('ORDER', 'SUPPORT', 'GENERAL')),
        last_message_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CONSTRAINT conversations_not_self CHECK (initiator_id <> participant_id)
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS conversations_pair_key ON conversations (
        LEAST(initiator_id, participant_id),
        GREATEST(initiator_id, participant_id),
        COALESCE(listing_id, 0),
        kind
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        id BIGSERIAL PRIMARY KEY,
        conversation_id BIGINT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
        sender_id BIGINT REFERENCES users(id),
        kind TEXT NOT NULL DEFAULT 'TEXT' CHECK (kind IN ('TEXT', 'IMAGE', 'SYSTEM')),
        content TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CONSTRAINT messages_sender_kind CHECK ((kind = 'SYSTEM') = (sender_id IS NULL))
    )
    "#,
    "CREATE INDEX IF NOT EXISTS messages_conversation_idx ON messages (conversation_id, created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS listing_promotions (
        id BIGSERIAL PRIMARY KEY,
        listing_id BIGINT NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
        seller_id BIGINT NOT NULL REFERENCES users(id),
        status TEXT NOT NULL DEFAULT 'ACTIVE' CHECK (status IN ('ACTIVE', 'EXPIRED', 'SCHEDULED')),
        starts_at TIMESTAMPTZ NOT NULL,
        ends_at TIMESTAMPTZ NOT NULL,
        used_free_credit BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CHECK (ends_at > starts_at)
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS listing_promotions_one_active ON listing_promotions (listing_id) WHERE status = 'ACTIVE'",
    r#"
    CREATE TABLE IF NOT EXISTS user_likes (
        user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        listing_id BIGINT NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (user_id, listing_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS user_likes_listing_idx ON user_likes (listing_id)",
    r#"
    CREATE TABLE IF NOT EXISTS reports (
        id BIGSERIAL PRIMARY KEY,
        reporter_id BIGINT NOT NULL REFERENCES users(id),
        target_type TEXT NOT NULL CHECK (target_type IN ('LISTING', 'USER')),
        target_id BIGINT NOT NULL,
        reason TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'OPEN' CHECK (status IN ('OPEN', 'RESOLVED', 'DISMISSED')),
        notes TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        resolved_at TIMESTAMPTZ,
        CONSTRAINT reports_closed_has_time CHECK ((status = 'OPEN') = (resolved_at IS NULL))
    )
    "#,
    "CREATE INDEX IF NOT EXISTS reports_status_idx ON reports (status, created_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS pricing_plans (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        months INTEGER NOT NULL CHECK (months > 0),
        price NUMERIC(12, 2) NOT NULL,
        free_promotions_per_month INTEGER NOT NULL DEFAULT 3,
        description TEXT,
        active BOOLEAN NOT NULL DEFAULT TRUE
    )
    "#,
    r#"
    INSERT INTO pricing_plans (name, months, price, description)
    VALUES
        ('Premium Monthly', 1, 6.90, 'Lower commission and 3 free promotions every month'),
        ('Premium Quarterly', 3, 18.90, 'Three months of premium benefits'),
        ('Premium Annual', 12, 59.90, 'A full year of premium benefits')
    ON CONFLICT (name) DO NOTHING
    "#,
];

/// Create or update the marketplace schema.
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("running marketplace migrations");

    let mut tx = pool.begin().await?;
    for statement in SCHEMA {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    tracing::info!(statements = SCHEMA.len(), "migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_statement_is_idempotent() {
        for statement in SCHEMA {
            let s = statement.trim_start();
            assert!(
                s.contains("IF NOT EXISTS") || s.contains("ON CONFLICT"),
                "not idempotent: {s}"
            );
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn migrations_run_twice() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url, 2).await.expect("pool");
        run(&pool).await.expect("first run");
        run(&pool).await.expect("second run");
    }
}
