//! Concurrency tests for the order core
//!
//! Exercises the whole stack end to end:
//! - Service → Actor → Storage, with a sandbox payment gateway
//! - Oversell prevention under concurrent placement
//! - Idempotent reconciliation across callback and polling delivery
//! - Order lifecycle legality

use anyhow::Result;
use momo_gateway::{GatewayStatus, SandboxGateway};
use order_core::{
    Caller, Config, Error, OrderLine, OrderService, OrderStatus, Product,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

async fn test_service() -> Result<(Arc<OrderService>, Arc<SandboxGateway>, tempfile::TempDir)> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("order_core=debug")
        .with_test_writer()
        .try_init();

    let temp_dir = tempfile::tempdir()?;
    let mut config = Config::default();
    config.data_dir = temp_dir.path().to_path_buf();

    let gateway = Arc::new(SandboxGateway::new());
    let service = Arc::new(OrderService::open(config, gateway.clone()).await?);
    Ok((service, gateway, temp_dir))
}

async fn seed_product(service: &OrderService, stock: u32, price_cents: i64) -> Result<Product> {
    let product = Product::new("Limited Sneaker", Decimal::new(price_cents, 2), stock, "shoes");
    service.upsert_product(product.clone()).await?;
    Ok(product)
}

#[tokio::test]
async fn test_concurrent_buyers_last_unit() -> Result<()> {
    let (service, _gateway, _temp) = test_service().await?;
    let product = seed_product(&service, 1, 19999).await?;

    // Eight buyers race for one unit
    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        let product_id = product.product_id;
        handles.push(tokio::spawn(async move {
            service
                .place_order(
                    Uuid::new_v4(),
                    vec![OrderLine { product_id, quantity: 1 }],
                    None,
                )
                .await
        }));
    }

    let mut placed = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => placed += 1,
            Err(Error::InsufficientStock { available, .. }) => {
                assert_eq!(available, 0);
                refused += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(placed, 1);
    assert_eq!(refused, 7);

    let row = service.get_product(product.product_id).await?;
    assert_eq!(row.stock, 0);
    assert_eq!(row.reserved, 1);
    assert_eq!(service.metrics().orders_placed.get(), 1);
    assert_eq!(service.metrics().insufficient_stock.get(), 7);

    Ok(())
}

#[tokio::test]
async fn test_stock_conservation_under_load() -> Result<()> {
    let (service, _gateway, _temp) = test_service().await?;
    let product = seed_product(&service, 3, 500).await?;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let service = service.clone();
        let product_id = product.product_id;
        handles.push(tokio::spawn(async move {
            service
                .place_order(
                    Uuid::new_v4(),
                    vec![OrderLine { product_id, quantity: 1 }],
                    None,
                )
                .await
        }));
    }

    let mut placed = 0;
    for handle in handles {
        if handle.await?.is_ok() {
            placed += 1;
        }
    }

    assert_eq!(placed, 3);

    // stock + reserved == seeded stock, always
    let row = service.get_product(product.product_id).await?;
    assert_eq!(row.stock + row.reserved, 3);
    assert_eq!(row.stock, 0);

    Ok(())
}

#[tokio::test]
async fn test_full_order_and_payment_lifecycle() -> Result<()> {
    let (service, gateway, _temp) = test_service().await?;
    let product = seed_product(&service, 5, 12050).await?;

    let user_id = Uuid::new_v4();
    let caller = Caller::user(user_id);
    let admin = Caller::admin(Uuid::new_v4());

    let order = service
        .place_order(
            user_id,
            vec![OrderLine { product_id: product.product_id, quantity: 2 }],
            Some(Decimal::new(24100, 2)),
        )
        .await?;
    assert_eq!(order.total, Decimal::new(24100, 2));
    assert_eq!(order.status, OrderStatus::Pending);

    let reference = service
        .initiate_payment(order.order_id, "+250 788 555 123", &caller)
        .await?;
    assert_eq!(gateway.charge_count(), 1);

    gateway.resolve(&reference, GatewayStatus::Successful)?;

    // Callback and a later poll both deliver the same outcome
    service
        .apply_payment_status(&reference, GatewayStatus::Successful, order.total)
        .await?;
    service.poll_payment(&reference).await?;

    let paid = service.get_order(order.order_id, &caller).await?;
    assert_eq!(paid.status, OrderStatus::Processing);
    assert_eq!(service.metrics().payments_succeeded.get(), 1);

    // Fulfilment
    let shipped = service
        .update_status(order.order_id, OrderStatus::Shipped, &admin)
        .await?;
    assert_eq!(shipped.status, OrderStatus::Shipped);
    let delivered = service
        .update_status(order.order_id, OrderStatus::Delivered, &admin)
        .await?;
    assert_eq!(delivered.status, OrderStatus::Delivered);

    // Delivered is terminal
    let err = service
        .update_status(order.order_id, OrderStatus::Cancelled, &admin)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));

    Ok(())
}

#[tokio::test]
async fn test_duplicate_callbacks_apply_once() -> Result<()> {
    let (service, gateway, _temp) = test_service().await?;
    let product = seed_product(&service, 5, 1000).await?;

    let user_id = Uuid::new_v4();
    let caller = Caller::user(user_id);

    let order = service
        .place_order(
            user_id,
            vec![OrderLine { product_id: product.product_id, quantity: 1 }],
            None,
        )
        .await?;
    let reference = service
        .initiate_payment(order.order_id, "0788123456", &caller)
        .await?;
    gateway.resolve(&reference, GatewayStatus::Successful)?;

    for _ in 0..5 {
        service
            .apply_payment_status(&reference, GatewayStatus::Successful, order.total)
            .await?;
    }

    assert_eq!(service.metrics().payments_succeeded.get(), 1);
    assert_eq!(
        service.get_order(order.order_id, &caller).await?.status,
        OrderStatus::Processing
    );

    Ok(())
}

#[tokio::test]
async fn test_list_orders_newest_first() -> Result<()> {
    let (service, _gateway, _temp) = test_service().await?;
    let product = seed_product(&service, 10, 1000).await?;
    let user_id = Uuid::new_v4();

    let mut placed = Vec::new();
    for _ in 0..3 {
        let order = service
            .place_order(
                user_id,
                vec![OrderLine { product_id: product.product_id, quantity: 1 }],
                None,
            )
            .await?;
        placed.push(order.order_id);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    // A stranger's order never shows up in this user's list
    service
        .place_order(
            Uuid::new_v4(),
            vec![OrderLine { product_id: product.product_id, quantity: 1 }],
            None,
        )
        .await?;

    let listed = service.list_orders(user_id).await?;
    assert_eq!(listed.len(), 3);
    for window in listed.windows(2) {
        assert!(window[0].created_at >= window[1].created_at);
    }
    assert_eq!(listed[0].order_id, *placed.last().unwrap());

    Ok(())
}

#[tokio::test]
async fn test_multi_line_order_is_all_or_nothing() -> Result<()> {
    let (service, _gateway, _temp) = test_service().await?;

    let plenty = Product::new("Notebook", Decimal::new(300, 2), 50, "stationery");
    let scarce = Product::new("Fountain Pen", Decimal::new(8000, 2), 1, "stationery");
    service.upsert_product(plenty.clone()).await?;
    service.upsert_product(scarce.clone()).await?;

    let err = service
        .place_order(
            Uuid::new_v4(),
            vec![
                OrderLine { product_id: plenty.product_id, quantity: 10 },
                OrderLine { product_id: scarce.product_id, quantity: 2 },
            ],
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientStock { .. }));

    // The passing line left no trace
    assert_eq!(service.get_product(plenty.product_id).await?.stock, 50);
    assert_eq!(service.get_product(scarce.product_id).await?.stock, 1);
    assert!(service.list_orders(Uuid::new_v4()).await?.is_empty());

    Ok(())
}
