//! Adapter event subscriptions follow the active adapter.

mod common;

use common::{fixture, MockAdapter};
use lib_wallet::{AdapterError, AdapterEvent, WalletError};
use std::sync::atomic::Ordering;
use tokio::sync::broadcast::error::TryRecvError;

#[tokio::test]
async fn test_initial_adapter_gets_one_handler_per_event() {
    let fx = fixture(vec![MockAdapter::new("Phantom")], Some("Phantom"), false);
    let phantom = fx.adapter("Phantom");

    assert_eq!(phantom.on_calls.load(Ordering::SeqCst), 4);
    assert_eq!(phantom.off_calls.load(Ordering::SeqCst), 0);
    assert_eq!(phantom.active_handlers(), 4);
}

#[tokio::test]
async fn test_switching_adapters_moves_subscriptions() {
    let fx = fixture(
        vec![MockAdapter::new("Phantom"), MockAdapter::new("Solflare")],
        Some("Phantom"),
        false,
    );

    fx.session.select(Some("Solflare")).await;

    let phantom = fx.adapter("Phantom");
    let solflare = fx.adapter("Solflare");
    assert_eq!(phantom.off_calls.load(Ordering::SeqCst), 4);
    assert_eq!(phantom.active_handlers(), 0);
    assert_eq!(solflare.on_calls.load(Ordering::SeqCst), 4);
    assert_eq!(solflare.active_handlers(), 4);
}

#[tokio::test]
async fn test_clearing_selection_unsubscribes() {
    let fx = fixture(vec![MockAdapter::new("Phantom")], Some("Phantom"), false);

    fx.session.select(None).await;

    assert_eq!(fx.adapter("Phantom").off_calls.load(Ordering::SeqCst), 4);
    assert_eq!(fx.adapter("Phantom").active_handlers(), 0);
}

#[tokio::test]
async fn test_events_from_previous_adapter_are_ignored() {
    let fx = fixture(
        vec![MockAdapter::new("Phantom"), MockAdapter::new("Solflare")],
        Some("Phantom"),
        false,
    );
    let mut errors = fx.session.subscribe_errors();
    fx.session.select(Some("Solflare")).await;

    fx.adapter("Phantom").connect_externally();
    fx.adapter("Phantom")
        .emit(AdapterEvent::Error(AdapterError::Connection("stale".into())));

    assert!(!fx.session.connected());
    assert!(matches!(errors.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_ready_event_marks_session_ready() {
    let fx = fixture(vec![MockAdapter::new("Phantom").not_ready()], Some("Phantom"), false);
    assert!(!fx.session.ready());

    fx.adapter("Phantom").become_ready();

    assert!(fx.session.ready());
}

#[tokio::test]
async fn test_connect_event_refreshes_state() {
    let fx = fixture(vec![MockAdapter::new("Phantom")], Some("Phantom"), false);

    fx.adapter("Phantom").connect_externally();

    assert!(fx.session.connected());
    assert_eq!(fx.session.public_key(), Some(fx.adapter("Phantom").key()));
}

#[tokio::test]
async fn test_disconnect_event_leaves_state_untouched() {
    let fx = fixture(vec![MockAdapter::new("Phantom")], Some("Phantom"), false);
    fx.session.connect().await.unwrap();

    fx.adapter("Phantom").emit(AdapterEvent::Disconnect);

    assert!(fx.session.connected());
    assert_eq!(fx.session.selected_provider().as_deref(), Some("Phantom"));
}

#[tokio::test]
async fn test_error_event_is_broadcast() {
    let fx = fixture(vec![MockAdapter::new("Phantom")], Some("Phantom"), false);
    let mut errors = fx.session.subscribe_errors();
    let failure = AdapterError::SendTransaction("blockhash expired".into());

    fx.adapter("Phantom").emit(AdapterEvent::Error(failure.clone()));

    assert_eq!(errors.try_recv().unwrap(), WalletError::Adapter(failure));
    assert_eq!(fx.session.selected_provider().as_deref(), Some("Phantom"));
}

#[tokio::test]
async fn test_close_releases_handlers_and_stops_rebinding() {
    let fx = fixture(
        vec![MockAdapter::new("Phantom"), MockAdapter::new("Solflare")],
        Some("Phantom"),
        false,
    );

    fx.session.close();
    assert_eq!(fx.adapter("Phantom").active_handlers(), 0);

    fx.session.select(Some("Solflare")).await;
    assert_eq!(fx.adapter("Solflare").on_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_dropping_session_releases_handlers() {
    let fx = fixture(vec![MockAdapter::new("Phantom")], Some("Phantom"), false);
    let phantom = fx.adapter("Phantom").clone();
    assert_eq!(phantom.active_handlers(), 4);

    drop(fx);

    assert_eq!(phantom.active_handlers(), 0);
    assert_eq!(phantom.off_calls.load(Ordering::SeqCst), 4);
}
