//! WebSocket 路由: 互补角色转发、心跳应答、非法 type

mod common;

use std::time::Duration;

use common::{TestRelay, assert_silent, recv_one, send};
use futures::SinkExt;
use shared::{Envelope, MessageType, Order, OrderItem, OrderStatus, OrderType};
use tokio_tungstenite::tungstenite;

fn order() -> Order {
    Order::new(OrderType::DineIn, vec![OrderItem::new(1, "Arepa", 2, 5000.0)]).with_table(9)
}

#[tokio::test]
async fn test_order_new_reaches_kitchen_exactly_once() {
    let relay = TestRelay::start().await;
    let mut kitchen = relay.connect("kitchen").await;
    let mut waiter = relay.connect("waiter").await;

    let order = order();
    send(&mut waiter, &Envelope::order_new(&order).unwrap()).await;

    let received = recv_one(&mut kitchen).await;
    assert_eq!(received.message_type, MessageType::OrderNew);
    assert_eq!(received.order().unwrap().id, order.id);

    // exactly once, and never echoed to the sender
    assert_silent(&mut kitchen).await;
    assert_silent(&mut waiter).await;

    relay.stop().await;
}

#[tokio::test]
async fn test_kitchen_update_reaches_all_waiters() {
    let relay = TestRelay::start().await;
    let mut kitchen = relay.connect("kitchen").await;
    let mut waiter_a = relay.connect("waiter").await;
    let mut waiter_b = relay.connect("waiter").await;

    send(
        &mut kitchen,
        &Envelope::kitchen_update("123", OrderStatus::Ready).unwrap(),
    )
    .await;

    for waiter in [&mut waiter_a, &mut waiter_b] {
        let update = recv_one(waiter).await.status_update().unwrap();
        assert_eq!(update.order_id, "123");
        assert_eq!(update.status, OrderStatus::Ready);
    }
    assert_silent(&mut kitchen).await;

    relay.stop().await;
}

#[tokio::test]
async fn test_heartbeat_answered_to_sender_only() {
    let relay = TestRelay::start().await;
    let mut kitchen = relay.connect("kitchen").await;
    let mut waiter = relay.connect("waiter").await;

    send(&mut waiter, &Envelope::heartbeat()).await;

    let reply = recv_one(&mut waiter).await;
    assert_eq!(reply.message_type, MessageType::Heartbeat);
    assert_silent(&mut kitchen).await;

    relay.stop().await;
}

#[tokio::test]
async fn test_relayed_orders_are_recorded() {
    let relay = TestRelay::start().await;
    let mut kitchen = relay.connect("kitchen").await;
    let mut waiter = relay.connect("waiter").await;

    let order = order();
    send(&mut waiter, &Envelope::order_new(&order).unwrap()).await;
    recv_one(&mut kitchen).await;

    send(
        &mut kitchen,
        &Envelope::kitchen_update(order.id.clone(), OrderStatus::Completed).unwrap(),
    )
    .await;
    recv_one(&mut waiter).await;

    // the order book tap runs asynchronously
    let mut recorded = None;
    for _ in 0..50 {
        recorded = relay
            .state
            .orders
            .get(&order.id)
            .filter(|o| o.status == OrderStatus::Completed);
        if recorded.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(recorded.is_some());
    assert_eq!(relay.state.orders.history()[0].id, order.id);

    relay.stop().await;
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    let relay = TestRelay::start().await;
    let mut kitchen = relay.connect("kitchen").await;
    let mut waiter = relay.connect("waiter").await;

    waiter
        .send(tungstenite::Message::Text("not json".into()))
        .await
        .unwrap();
    assert_silent(&mut kitchen).await;

    send(&mut waiter, &Envelope::heartbeat()).await;
    assert_eq!(recv_one(&mut waiter).await.message_type, MessageType::Heartbeat);

    relay.stop().await;
}

#[tokio::test]
async fn test_missing_or_unknown_type_is_rejected() {
    let relay = TestRelay::start().await;

    for query in ["", "?type=cashier"] {
        let url = format!("ws://{}/ws{}", relay.addr, query);
        match tokio_tungstenite::connect_async(url).await {
            Err(tungstenite::Error::Http(response)) => {
                assert_eq!(response.status().as_u16(), 400);
            }
            other => panic!("expected HTTP 400, got {:?}", other.map(|_| ())),
        }
    }
    assert_eq!(relay.health().await.connections.total(), 0);

    relay.stop().await;
}

#[tokio::test]
async fn test_disconnect_updates_health_counts() {
    let relay = TestRelay::start().await;
    let kitchen = relay.connect("kitchen").await;
    let _waiter = relay.connect("waiter").await;

    let health = relay.health().await;
    assert!(health.is_ok());
    assert_eq!(health.connections.kitchen, 1);
    assert_eq!(health.connections.waiter, 1);

    drop(kitchen);
    relay.wait_for_total(1).await;
    assert_eq!(relay.health().await.connections.kitchen, 0);

    relay.stop().await;
}

/// 空闲 1 秒即断开的中继
async fn start_with_short_idle() -> TestRelay {
    TestRelay::start_with_config(Vec::new(), |config| {
        config.ws_idle_timeout_secs = 1;
        config.ws_ping_interval_secs = 5;
    })
    .await
}

#[tokio::test]
async fn test_silent_client_is_dropped_after_idle_timeout() {
    let relay = start_with_short_idle().await;
    let _silent = relay.connect("kitchen").await;

    relay.wait_for_total_within(0, Duration::from_secs(4)).await;
    assert_eq!(relay.health().await.connections.kitchen, 0);

    relay.stop().await;
}

#[tokio::test]
async fn test_heartbeats_keep_connection_alive() {
    let relay = start_with_short_idle().await;
    let mut waiter = relay.connect("waiter").await;

    for _ in 0..8 {
        send(&mut waiter, &Envelope::heartbeat()).await;
        let ack = recv_one(&mut waiter).await;
        assert_eq!(ack.message_type, MessageType::Heartbeat);
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    // 2.4s without a gap longer than the idle timeout
    let health = relay.health().await;
    assert_eq!(health.connections.waiter, 1);

    relay.stop().await;
}
