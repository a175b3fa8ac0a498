use std::time::Duration;

use labctl::{wait_for_payment_callback, PaymentCallback, PaymentOutcome};
use pretty_assertions::assert_eq;
use tokio::net::TcpListener;

async fn listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();

    (listener, port)
}

#[tokio::test]
async fn successful_payment_reports_the_balance() {
    let (listener, port) = listener().await;
    let waiting = tokio::spawn(wait_for_payment_callback(
        listener,
        Duration::from_secs(10),
    ));

    let page = reqwest::get(format!(
        "http://127.0.0.1:{port}/payment?status=success&balance=12.50"
    ))
    .await
    .unwrap()
    .text()
    .await
    .unwrap();
    assert!(page.contains("You may now close this window."));

    let callback = waiting.await.unwrap().unwrap();
    assert_eq!(
        callback,
        PaymentCallback {
            status: "success".to_string(),
            balance: "12.50".to_string(),
        }
    );
    assert_eq!(
        PaymentOutcome::from(callback),
        PaymentOutcome::Success {
            balance: "12.50".to_string()
        }
    );
}

#[tokio::test]
async fn canceled_payment() {
    let (listener, port) = listener().await;
    let waiting = tokio::spawn(wait_for_payment_callback(
        listener,
        Duration::from_secs(10),
    ));

    reqwest::get(format!("http://127.0.0.1:{port}/?status=cancel"))
        .await
        .unwrap();

    let callback = waiting.await.unwrap().unwrap();
    assert_eq!(PaymentOutcome::from(callback), PaymentOutcome::Canceled);
}

#[tokio::test]
async fn silence_times_out() {
    let (listener, port) = listener().await;

    let callback = wait_for_payment_callback(listener, Duration::from_millis(200))
        .await
        .unwrap();

    assert_eq!(PaymentOutcome::from(callback), PaymentOutcome::TimedOut);
    // the listener is gone once waiting is over
    assert!(reqwest::get(format!("http://127.0.0.1:{port}/"))
        .await
        .is_err());
}

#[tokio::test]
async fn form_posted_payment_is_read_from_the_body() {
    let (listener, port) = listener().await;
    let waiting = tokio::spawn(wait_for_payment_callback(
        listener,
        Duration::from_secs(10),
    ));

    let response = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{port}/payment"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("status=success&balance=12.50")
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let callback = waiting.await.unwrap().unwrap();
    assert_eq!(
        PaymentOutcome::from(callback),
        PaymentOutcome::Success {
            balance: "12.50".to_string()
        }
    );
}
