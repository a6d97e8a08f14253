// tests/webhook_http.rs
// Exercises DiscordNotifier against a throwaway local HTTP responder.
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use subreddit_relay::{DiscordNotifier, Notifier, RetryPolicy};

/// Serve `statuses[n]` to the n-th request (the last one repeats), counting
/// requests.
async fn spawn_responder(statuses: Vec<&'static str>) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut sock, _)) = listener.accept().await else {
                break;
            };
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let status = statuses[n.min(statuses.len() - 1)];
            let mut buf = [0u8; 4096];
            let _ = sock.read(&mut buf).await;
            let rsp = format!("HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            let _ = sock.write_all(rsp.as_bytes()).await;
        }
    });

    (addr, hits)
}

fn quick_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(5), Duration::from_millis(20))
}

#[tokio::test]
async fn any_2xx_is_success_on_the_first_attempt() {
    let (addr, hits) = spawn_responder(vec!["204 No Content"]).await;
    let notifier =
        DiscordNotifier::new(format!("http://{addr}/hook")).with_retry_policy(quick_retry());

    notifier.send("**hello**\nhttps://example.com").await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn persistent_failure_uses_three_attempts_then_gives_up() {
    let (addr, hits) = spawn_responder(vec!["500 Internal Server Error"]).await;
    let notifier =
        DiscordNotifier::new(format!("http://{addr}/hook")).with_retry_policy(quick_retry());

    let err = notifier.send("msg").await.unwrap_err();
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert!(err.to_string().contains("an error occurred with the request"));
}

#[tokio::test]
async fn recovery_mid_retry_still_succeeds() {
    let (addr, hits) =
        spawn_responder(vec!["502 Bad Gateway", "502 Bad Gateway", "200 OK"]).await;
    let notifier =
        DiscordNotifier::new(format!("http://{addr}/hook")).with_retry_policy(quick_retry());

    notifier.send("msg").await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn shutdown_cuts_the_backoff_between_attempts_short() {
    let (addr, hits) = spawn_responder(vec!["500 Internal Server Error"]).await;
    let (tx, rx) = tokio::sync::watch::channel(false);
    let notifier = DiscordNotifier::new(format!("http://{addr}/hook"))
        // Would spend 10s in backoff if the shutdown signal were ignored.
        .with_retry_policy(RetryPolicy::new(3, Duration::from_secs(5), Duration::from_secs(5)))
        .with_shutdown(rx);

    let handle = tokio::spawn(async move { notifier.send("msg").await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(true).unwrap();

    let out = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("send should give up within one backoff step")
        .unwrap();
    assert!(out.is_err());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn not_found_surfaces_the_specific_reason() {
    let (addr, _hits) = spawn_responder(vec!["404 Not Found"]).await;
    let notifier = DiscordNotifier::new(format!("http://{addr}/hook"))
        .with_retry_policy(RetryPolicy::new(1, Duration::from_millis(1), Duration::from_millis(1)));

    let err = notifier.send("msg").await.unwrap_err();
    assert!(err.to_string().contains("could not be found"));
}
