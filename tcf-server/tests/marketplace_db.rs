//! Repository tests against a real Postgres.
//!
//! Run with: DATABASE_URL=postgres://... cargo test -p tcf-server -- --ignored

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use tcf_core::{
    Condition, ConversationKind, FreePromotionQuota, ImageUrls, LikeAction, ListingName,
    MessageBody, MessageKind, OrderStatus, Pagination, Price, QuotaError, Rating, ReportReason,
    ReportStatus, ReportTarget, UserStatus, Username,
};
use tcf_server::db::{
    migrations, AdminUserUpdate, Caller, ConversationRepo, DashboardRepo, DbError, LikeRepo,
    ListingChanges, ListingRepo, MessageRepo, NewListing, NewPromotion, OrderRepo, PromotionRepo,
    ReportRepo, ReportUpdate, ReviewRepo, ShopFilter, User, UserRepo,
};
use tcf_server::maintenance;

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let pool = tcf_server::create_pool(&url, 5).await.unwrap();
    migrations::run(&pool).await.unwrap();
    pool
}

async fn user(pool: &PgPool, prefix: &str) -> User {
    let subject = Uuid::new_v4();
    let name = format!("{prefix}_{}", &subject.simple().to_string()[..10]);
    UserRepo::new(pool)
        .register(subject, Username::new(&name).unwrap(), &format!("{name}@example.com"))
        .await
        .unwrap()
}

async fn listing(pool: &PgPool, seller: &User) -> i64 {
    let new = NewListing {
        name: ListingName::new("Wool overcoat").unwrap(),
        description: Some("Worn twice".into()),
        price: Price::new(Decimal::new(4500, 2)).unwrap(),
        condition: Condition::LikeNew,
        brand: None,
        size: Some("M".into()),
        category: Some("outerwear".into()),
        image_urls: ImageUrls::new(vec!["https://img.example.com/coat.jpg".into()]).unwrap(),
    };
    ListingRepo::new(pool).create(seller.id, new).await.unwrap().id
}

#[tokio::test]
#[ignore = "requires database"]
async fn order_lifecycle_keeps_listing_and_conversation_in_step() {
    let pool = pool().await;
    let seller = user(&pool, "seller").await;
    let buyer = user(&pool, "buyer").await;
    let listing_id = listing(&pool, &seller).await;
    let orders = OrderRepo::new(&pool);
    let listings = ListingRepo::new(&pool);
    let now = Utc::now();

    let order = orders
        .create(buyer.id, listing_id, None, None, now)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.quantity, 1);

    let reserved = listings.get(listing_id).await.unwrap();
    assert!(!reserved.listed && !reserved.sold);

    // A second buyer cannot take the same item.
    let rival = user(&pool, "rival").await;
    let err = orders
        .create(rival.id, listing_id, None, None, now)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Conflict { .. }));

    // The buyer cannot ship.
    let err = orders
        .transition(order.id, buyer.caller(), OrderStatus::Shipped, now)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Transition(_)));

    for (caller, target) in [
        (seller.caller(), OrderStatus::ToShip),
        (seller.caller(), OrderStatus::Shipped),
        (buyer.caller(), OrderStatus::Delivered),
        (buyer.caller(), OrderStatus::Received),
        (buyer.caller(), OrderStatus::Completed),
    ] {
        orders.transition(order.id, caller, target, now).await.unwrap();
    }

    let sold = listings.get(listing_id).await.unwrap();
    assert!(sold.sold && !sold.listed);
    assert!(sold.sold_at.is_some());

    let conversation = ConversationRepo::new(&pool)
        .create_or_get(buyer.id, seller.id, Some(listing_id), ConversationKind::Order)
        .await
        .unwrap();
    let messages = MessageRepo::new(&pool)
        .list_for_conversation(conversation.id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(messages.total, 6);
    assert!(messages.items.iter().all(|m| m.sender_id.is_none()));
    assert_eq!(
        conversation.last_message_at,
        messages.items.last().map(|m| m.created_at)
    );

    // Completed orders cannot be cancelled.
    let err = orders
        .transition(order.id, seller.caller(), OrderStatus::Cancelled, now)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Transition(_)));

    // Both reviews move the order to REVIEWED.
    let reviews = ReviewRepo::new(&pool);
    reviews
        .create(order.id, buyer.caller(), Rating::new(5).unwrap(), None, now)
        .await
        .unwrap();
    reviews
        .create(order.id, seller.caller(), Rating::new(4).unwrap(), Some("Quick payment".into()), now)
        .await
        .unwrap();
    let reviewed = orders.get_for_party(order.id, buyer.caller()).await.unwrap();
    assert_eq!(reviewed.status, OrderStatus::Reviewed);

    let seller = UserRepo::new(&pool).get(seller.id).await.unwrap();
    assert_eq!(seller.total_reviews, 1);
    assert_eq!(seller.average_rating, Some(Decimal::new(500, 2)));
}

#[tokio::test]
#[ignore = "requires database"]
async fn cancelling_relists_the_item() {
    let pool = pool().await;
    let seller = user(&pool, "seller").await;
    let buyer = user(&pool, "buyer").await;
    let listing_id = listing(&pool, &seller).await;
    let orders = OrderRepo::new(&pool);

    let order = orders
        .create(buyer.id, listing_id, None, None, Utc::now())
        .await
        .unwrap();
    let cancelled = orders
        .transition(order.id, buyer.caller(), OrderStatus::Cancelled, Utc::now())
        .await
        .unwrap();
    assert!(cancelled.cancelled_at.is_some());

    let relisted = ListingRepo::new(&pool).get(listing_id).await.unwrap();
    assert!(relisted.listed && !relisted.sold && relisted.sold_at.is_none());

    // The item can be bought again.
    orders
        .create(buyer.id, listing_id, None, None, Utc::now())
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn strangers_cannot_see_orders() {
    let pool = pool().await;
    let seller = user(&pool, "seller").await;
    let buyer = user(&pool, "buyer").await;
    let stranger = user(&pool, "stranger").await;
    let listing_id = listing(&pool, &seller).await;

    let order = OrderRepo::new(&pool)
        .create(buyer.id, listing_id, None, None, Utc::now())
        .await
        .unwrap();
    let err = OrderRepo::new(&pool)
        .get_for_party(order.id, stranger.caller())
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));
}

#[tokio::test]
#[ignore = "requires database"]
async fn free_promotions_follow_the_monthly_quota() {
    let pool = pool().await;
    let seller = user(&pool, "seller").await;
    let users = UserRepo::new(&pool);
    let quota = FreePromotionQuota { per_month: 1 };
    let now = Utc::now();

    let err = users.use_free_promotion(seller.id, quota, now).await.unwrap_err();
    assert!(matches!(err, DbError::Quota(QuotaError::NotPremium)));

    users.upgrade_premium(seller.id, 1, now).await.unwrap();
    let outcome = users.use_free_promotion(seller.id, quota, now).await.unwrap();
    assert_eq!((outcome.used, outcome.remaining), (1, 0));

    // The promotion itself cannot draw on an exhausted quota.
    let listing_id = listing(&pool, &seller).await;
    let err = PromotionRepo::new(&pool)
        .create(
            seller.caller(),
            NewPromotion {
                listing_id,
                days: 7,
                use_free_credit: true,
            },
            quota,
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Quota(QuotaError::Exhausted)));

    // Paid promotions still work, and expire on schedule.
    let promotion = PromotionRepo::new(&pool)
        .create(
            seller.caller(),
            NewPromotion {
                listing_id,
                days: 1,
                use_free_credit: false,
            },
            quota,
            now,
        )
        .await
        .unwrap();
    let report = maintenance::run_all(&pool, now + Duration::days(2), true)
        .await
        .unwrap();
    assert!(report.expired_promotions.contains(&promotion.id));
}

#[tokio::test]
#[ignore = "requires database"]
async fn reconcile_repairs_listing_drift() {
    let pool = pool().await;
    let seller = user(&pool, "seller").await;
    let buyer = user(&pool, "buyer").await;
    let listing_id = listing(&pool, &seller).await;

    OrderRepo::new(&pool)
        .create(buyer.id, listing_id, None, None, Utc::now())
        .await
        .unwrap();

    // Put the reserved listing back on the feed behind the API's back.
    sqlx::query("UPDATE listings SET listed = TRUE WHERE id = $1")
        .bind(listing_id)
        .execute(&pool)
        .await
        .unwrap();

    let drift = maintenance::reconcile_open_orders(&pool, true).await.unwrap();
    assert!(drift.iter().any(|d| d.listing_id == listing_id));
    assert!(ListingRepo::new(&pool).get(listing_id).await.unwrap().listed);

    maintenance::reconcile_open_orders(&pool, false).await.unwrap();
    assert!(!ListingRepo::new(&pool).get(listing_id).await.unwrap().listed);
}

fn paid_promotion(listing_id: i64, days: u32) -> NewPromotion {
    NewPromotion {
        listing_id,
        days,
        use_free_credit: false,
    }
}

#[tokio::test]
#[ignore = "requires database"]
async fn lapsed_promotion_does_not_block_a_new_one() {
    let pool = pool().await;
    let seller = user(&pool, "seller").await;
    let listing_id = listing(&pool, &seller).await;
    let promotions = PromotionRepo::new(&pool);
    let quota = FreePromotionQuota { per_month: 3 };
    let now = Utc::now();

    let first = promotions
        .create(seller.caller(), paid_promotion(listing_id, 1), quota, now)
        .await
        .unwrap();

    // Still running: a second one is refused.
    let err = promotions
        .create(seller.caller(), paid_promotion(listing_id, 1), quota, now + Duration::hours(1))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Conflict { .. }));

    // Past its end but not yet swept.
    let later = now + Duration::days(2);
    let second = promotions
        .create(seller.caller(), paid_promotion(listing_id, 3), quota, later)
        .await
        .unwrap();
    assert_ne!(first.id, second.id);

    let status: String = sqlx::query_scalar("SELECT status FROM listing_promotions WHERE id = $1")
        .bind(first.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "EXPIRED");
}

#[tokio::test]
#[ignore = "requires database"]
async fn failed_listing_update_rolls_back_the_status_change() {
    let pool = pool().await;
    let seller = user(&pool, "seller").await;
    let buyer = user(&pool, "buyer").await;
    let listing_id = listing(&pool, &seller).await;
    let orders = OrderRepo::new(&pool);

    let order = orders
        .create(buyer.id, listing_id, None, None, Utc::now())
        .await
        .unwrap();
    let conversation = ConversationRepo::new(&pool)
        .create_or_get(buyer.id, seller.id, Some(listing_id), ConversationKind::Order)
        .await
        .unwrap();

    // Silently skip every update to this listing row.
    let function = format!("skip_listing_update_{listing_id}");
    sqlx::query(&format!(
        "CREATE FUNCTION {function}() RETURNS trigger AS $$ BEGIN RETURN NULL; END $$ LANGUAGE plpgsql"
    ))
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(&format!(
        "CREATE TRIGGER {function} BEFORE UPDATE ON listings FOR EACH ROW \
         WHEN (OLD.id = {listing_id}) EXECUTE FUNCTION {function}()"
    ))
    .execute(&pool)
    .await
    .unwrap();

    let result = orders
        .transition(order.id, buyer.caller(), OrderStatus::Cancelled, Utc::now())
        .await;

    sqlx::query(&format!("DROP TRIGGER {function} ON listings"))
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(&format!("DROP FUNCTION {function}()"))
        .execute(&pool)
        .await
        .unwrap();

    assert!(matches!(result, Err(DbError::NotFound { resource: "listing", .. })));

    let unchanged = orders.get_for_party(order.id, buyer.caller()).await.unwrap();
    assert_eq!(unchanged.status, OrderStatus::Pending);
    assert!(unchanged.cancelled_at.is_none());

    let messages = MessageRepo::new(&pool)
        .list_for_conversation(conversation.id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(messages.total, 1, "only the order-placed message");

    let listing = ListingRepo::new(&pool).get(listing_id).await.unwrap();
    assert!(!listing.listed && !listing.sold);

    // With the listing writable again the same move goes through.
    orders
        .transition(order.id, buyer.caller(), OrderStatus::Cancelled, Utc::now())
        .await
        .unwrap();
    assert!(ListingRepo::new(&pool).get(listing_id).await.unwrap().listed);
}

#[tokio::test]
#[ignore = "requires database"]
async fn reconcile_marks_completed_listings_sold() {
    let pool = pool().await;
    let seller = user(&pool, "seller").await;
    let buyer = user(&pool, "buyer").await;
    let listing_id = listing(&pool, &seller).await;
    let orders = OrderRepo::new(&pool);
    let now = Utc::now();

    let order = orders.create(buyer.id, listing_id, None, None, now).await.unwrap();
    for (caller, target) in [
        (seller.caller(), OrderStatus::ToShip),
        (seller.caller(), OrderStatus::Shipped),
        (buyer.caller(), OrderStatus::Received),
        (buyer.caller(), OrderStatus::Completed),
    ] {
        orders.transition(order.id, caller, target, now).await.unwrap();
    }
    let completed = orders.get_for_party(order.id, buyer.caller()).await.unwrap();

    sqlx::query("UPDATE listings SET sold = FALSE, sold_at = NULL WHERE id = $1")
        .bind(listing_id)
        .execute(&pool)
        .await
        .unwrap();

    let drift = maintenance::reconcile_sold_listings(&pool, true).await.unwrap();
    let found = drift.iter().find(|d| d.listing_id == listing_id).unwrap();
    assert_eq!(found.order_id, order.id);
    assert!(!found.sold);
    assert!(!ListingRepo::new(&pool).get(listing_id).await.unwrap().sold);

    maintenance::reconcile_sold_listings(&pool, false).await.unwrap();
    let repaired = ListingRepo::new(&pool).get(listing_id).await.unwrap();
    assert!(repaired.sold && !repaired.listed);
    assert_eq!(repaired.sold_at, Some(completed.updated_at));

    let again = maintenance::reconcile_sold_listings(&pool, true).await.unwrap();
    assert!(again.iter().all(|d| d.listing_id != listing_id));
}

#[tokio::test]
#[ignore = "requires database"]
async fn reconcile_resets_last_message_time() {
    let pool = pool().await;
    let alice = user(&pool, "alice").await;
    let bob = user(&pool, "bob").await;

    let conversation = ConversationRepo::new(&pool)
        .create_or_get(alice.id, bob.id, None, ConversationKind::General)
        .await
        .unwrap();
    let message = MessageRepo::new(&pool)
        .send(
            conversation.id,
            alice.caller(),
            MessageKind::Text,
            MessageBody::new("Is the coat still available?").unwrap(),
            Utc::now(),
        )
        .await
        .unwrap();

    sqlx::query(
        "UPDATE conversations SET last_message_at = last_message_at - INTERVAL '1 hour' WHERE id = $1",
    )
    .bind(conversation.id)
    .execute(&pool)
    .await
    .unwrap();

    let drift = maintenance::reconcile_last_message_at(&pool, true).await.unwrap();
    let found = drift.iter().find(|d| d.conversation_id == conversation.id).unwrap();
    assert_eq!(found.drift_secs, Some(3600));
    assert_eq!(found.actual, Some(message.created_at));

    let stored = ConversationRepo::new(&pool)
        .get_for_party(conversation.id, alice.caller())
        .await
        .unwrap();
    assert_eq!(stored.last_message_at, Some(message.created_at - Duration::hours(1)));

    maintenance::reconcile_last_message_at(&pool, false).await.unwrap();
    let repaired = ConversationRepo::new(&pool)
        .get_for_party(conversation.id, alice.caller())
        .await
        .unwrap();
    assert_eq!(repaired.last_message_at, Some(message.created_at));
}

#[tokio::test]
#[ignore = "requires database"]
async fn visibility_is_locked_while_an_order_is_open() {
    let pool = pool().await;
    let seller = user(&pool, "seller").await;
    let buyer = user(&pool, "buyer").await;
    let listing_id = listing(&pool, &seller).await;
    let listings = ListingRepo::new(&pool);

    let order = OrderRepo::new(&pool)
        .create(buyer.id, listing_id, None, None, Utc::now())
        .await
        .unwrap();

    for listed in [false, true] {
        let err = listings
            .update(
                listing_id,
                seller.caller(),
                ListingChanges {
                    listed: Some(listed),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }), "listed = {listed}");
    }

    // Other edits are still allowed.
    let renamed = listings
        .update(
            listing_id,
            seller.caller(),
            ListingChanges {
                name: Some(ListingName::new("Wool overcoat, navy").unwrap()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Wool overcoat, navy");

    OrderRepo::new(&pool)
        .transition(order.id, buyer.caller(), OrderStatus::Cancelled, Utc::now())
        .await
        .unwrap();
    let hidden = listings
        .update(
            listing_id,
            seller.caller(),
            ListingChanges {
                listed: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!hidden.listed);
}

#[tokio::test]
#[ignore = "requires database"]
async fn admins_may_manage_any_listing() {
    let pool = pool().await;
    let seller = user(&pool, "seller").await;
    let stranger = user(&pool, "stranger").await;
    let listing_id = listing(&pool, &seller).await;
    let listings = ListingRepo::new(&pool);
    let rename = || ListingChanges {
        name: Some(ListingName::new("Renamed coat").unwrap()),
        ..Default::default()
    };

    let err = listings
        .update(listing_id, stranger.caller(), rename())
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Forbidden { .. }));

    let err = PromotionRepo::new(&pool)
        .create(
            stranger.caller(),
            paid_promotion(listing_id, 1),
            FreePromotionQuota { per_month: 3 },
            Utc::now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Forbidden { .. }));

    let admin = Caller::admin(stranger.id);
    listings.update(listing_id, admin, rename()).await.unwrap();
    let promotion = PromotionRepo::new(&pool)
        .create(
            admin,
            paid_promotion(listing_id, 1),
            FreePromotionQuota { per_month: 3 },
            Utc::now(),
        )
        .await
        .unwrap();
    // The promotion still belongs to the seller.
    assert_eq!(promotion.seller_id, seller.id);
}

#[tokio::test]
#[ignore = "requires database"]
async fn likes_are_idempotent() {
    let pool = pool().await;
    let seller = user(&pool, "seller").await;
    let fan = user(&pool, "fan").await;
    let listing_id = listing(&pool, &seller).await;
    let likes = LikeRepo::new(&pool);

    assert!(likes.apply(fan.id, listing_id, LikeAction::Like).await.unwrap());
    assert!(likes.apply(fan.id, listing_id, LikeAction::Like).await.unwrap());

    let liked = likes.list_for_user(fan.id, Pagination::default()).await.unwrap();
    assert_eq!(liked.total, 1);
    assert_eq!(liked.items[0].listing.id, listing_id);

    assert!(!likes.apply(fan.id, listing_id, LikeAction::Unlike).await.unwrap());
    assert!(!likes.apply(fan.id, listing_id, LikeAction::Unlike).await.unwrap());
    assert_eq!(likes.list_for_user(fan.id, Pagination::default()).await.unwrap().total, 0);

    let err = likes.apply(fan.id, i64::MAX, LikeAction::Like).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));
}

#[tokio::test]
#[ignore = "requires database"]
async fn reports_are_filed_and_resolved() {
    let pool = pool().await;
    let seller = user(&pool, "seller").await;
    let reporter = user(&pool, "reporter").await;
    let listing_id = listing(&pool, &seller).await;
    let reports = ReportRepo::new(&pool);
    let reason = || ReportReason::new(Some("Counterfeit"), Some("Logo looks off")).unwrap();

    let report = reports
        .create(reporter.id, ReportTarget::Listing, listing_id, reason())
        .await
        .unwrap();
    assert_eq!(report.status, ReportStatus::Open);
    assert_eq!(report.reason, "Counterfeit - Logo looks off");
    assert!(report.resolved_at.is_none());

    let err = reports
        .create(reporter.id, ReportTarget::User, reporter.id, reason())
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Conflict { .. }));

    let err = reports
        .create(reporter.id, ReportTarget::User, i64::MAX, reason())
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound { resource: "user", .. }));

    let now = Utc::now();
    let resolved = reports
        .update(
            report.id,
            ReportUpdate {
                status: Some(ReportStatus::Resolved),
                notes: Some("Listing checked".into()),
            },
            now,
        )
        .await
        .unwrap();
    assert_eq!(resolved.status, ReportStatus::Resolved);
    assert!(resolved.resolved_at.is_some());

    // Notes alone keep the resolution time.
    let annotated = reports
        .update(
            report.id,
            ReportUpdate {
                status: None,
                notes: Some("Seller warned".into()),
            },
            now + Duration::hours(1),
        )
        .await
        .unwrap();
    assert_eq!(annotated.resolved_at, resolved.resolved_at);

    let reopened = reports
        .update(
            report.id,
            ReportUpdate {
                status: Some(ReportStatus::Open),
                notes: None,
            },
            now,
        )
        .await
        .unwrap();
    assert!(reopened.resolved_at.is_none());
    assert_eq!(reopened.notes.as_deref(), Some("Seller warned"));
}

#[tokio::test]
#[ignore = "requires database"]
async fn public_profile_counts_listings() {
    let pool = pool().await;
    let seller = user(&pool, "seller").await;
    let buyer = user(&pool, "buyer").await;
    let reserved = listing(&pool, &seller).await;
    let available = listing(&pool, &seller).await;

    OrderRepo::new(&pool)
        .create(buyer.id, reserved, None, None, Utc::now())
        .await
        .unwrap();

    let users = UserRepo::new(&pool);
    let profile = users.public_profile(&seller.username.to_uppercase()).await.unwrap();
    assert_eq!(profile.id, seller.id);
    assert_eq!(
        (profile.total_listings, profile.active_listings, profile.sold_listings),
        (2, 1, 0)
    );

    let listings = ListingRepo::new(&pool);
    let active = listings
        .list_for_seller(seller.id, ShopFilter::Active, Pagination::default())
        .await
        .unwrap();
    assert_eq!(active.items.iter().map(|l| l.id).collect::<Vec<_>>(), vec![available]);
    let all = listings
        .list_for_seller(seller.id, ShopFilter::All, Pagination::default())
        .await
        .unwrap();
    assert_eq!(all.total, 2);
    let sold = listings
        .list_for_seller(seller.id, ShopFilter::Sold, Pagination::default())
        .await
        .unwrap();
    assert_eq!(sold.total, 0);

    users
        .update_admin(
            seller.id,
            AdminUserUpdate {
                status: Some(UserStatus::Suspended),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let err = users.public_profile(&seller.username).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));
}

#[tokio::test]
#[ignore = "requires database"]
async fn dashboard_counts_recent_activity() {
    let pool = pool().await;
    let seller = user(&pool, "seller").await;
    let reporter = user(&pool, "reporter").await;
    let listing_id = listing(&pool, &seller).await;
    ReportRepo::new(&pool)
        .create(
            reporter.id,
            ReportTarget::Listing,
            listing_id,
            ReportReason::new(None, Some("Wrong size listed")).unwrap(),
        )
        .await
        .unwrap();

    let stats = DashboardRepo::new(&pool).stats(Utc::now()).await.unwrap();
    assert!(stats.users.total >= 2 && stats.users.new_this_week >= 2);
    assert!(stats.users.active <= stats.users.total);
    assert!(stats.listings.active >= 1 && stats.listings.new_this_week >= 1);
    assert!(stats.orders.completed <= stats.orders.total);
    assert!(stats.orders.revenue_this_month <= stats.orders.revenue_total);
    assert!(stats.open_reports >= 1);
}
