//! Stats sink tests against loopback collectors.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, UdpSocket};
use tokio::time::timeout;

use svcboot::config::{StatsNetwork, StatsSettings};
use svcboot::lifecycle::Shutdown;
use svcboot::stats;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn settings(network: StatsNetwork, address: String, flush_period_ms: u64) -> StatsSettings {
    StatsSettings {
        prefix: "t".to_string(),
        network,
        address,
        flush_period_ms,
    }
}

async fn recv_datagram(collector: &UdpSocket) -> String {
    let mut buf = vec![0u8; 2048];
    let (len, _) = timeout(RECV_TIMEOUT, collector.recv_from(&mut buf))
        .await
        .expect("timed out waiting for a datagram")
        .expect("recv failed");
    String::from_utf8(buf[..len].to_vec()).expect("payload should be UTF-8")
}

#[tokio::test]
async fn periodic_flush_delivers_counts_and_timings() {
    let collector = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = collector.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (client, worker) = stats::channel(settings(StatsNetwork::Udp, addr.to_string(), 25));
    tokio::spawn(worker.run(shutdown.clone()));

    client.incr("request.get.200");
    client.timing("request.elapsed", Duration::from_millis(7));

    let payload = recv_datagram(&collector).await;
    assert!(
        payload.contains("t.request.get.200:1|c"),
        "payload: {payload:?}"
    );
    assert!(
        payload.contains("t.request.elapsed:7|ms"),
        "payload: {payload:?}"
    );

    shutdown.trigger();
}

#[tokio::test]
async fn zero_period_flushes_only_when_the_buffer_fills() {
    let collector = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = collector.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (client, worker) = stats::channel(settings(StatsNetwork::Udp, addr.to_string(), 0));
    tokio::spawn(worker.run(shutdown.clone()));

    client.incr("first");
    let mut buf = vec![0u8; 2048];
    assert!(
        timeout(Duration::from_millis(200), collector.recv_from(&mut buf))
            .await
            .is_err(),
        "nothing should flush before the buffer fills"
    );

    for i in 0..120i64 {
        client.count("padding.counter", i);
    }
    let payload = recv_datagram(&collector).await;
    assert!(payload.starts_with("t.first:1|c"), "payload: {payload:?}");
    assert!(payload.len() <= 1432);

    shutdown.trigger();
}

#[tokio::test]
async fn shutdown_flushes_the_remainder() {
    let collector = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = collector.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (client, worker) = stats::channel(settings(StatsNetwork::Udp, addr.to_string(), 0));
    let handle = tokio::spawn(worker.run(shutdown.clone()));

    client.incr("final.count");
    shutdown.trigger();
    handle.await.expect("worker task panicked");

    let payload = recv_datagram(&collector).await;
    assert!(payload.contains("t.final.count:1|c"), "payload: {payload:?}");
}

#[tokio::test]
async fn dropping_every_client_stops_the_worker() {
    let collector = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = collector.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (client, worker) = stats::channel(settings(StatsNetwork::Udp, addr.to_string(), 0));
    let handle = tokio::spawn(worker.run(shutdown.clone()));

    client.incr("orphan");
    drop(client);

    timeout(RECV_TIMEOUT, handle)
        .await
        .expect("worker should stop once the queue closes")
        .expect("worker task panicked");
    let payload = recv_datagram(&collector).await;
    assert!(payload.contains("t.orphan:1|c"), "payload: {payload:?}");
}

#[tokio::test]
async fn tcp_collector_receives_newline_framed_lines() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (client, worker) = stats::channel(settings(StatsNetwork::Tcp, addr.to_string(), 20));
    tokio::spawn(worker.run(shutdown.clone()));

    client.incr("request.get.200");

    let (stream, _) = timeout(RECV_TIMEOUT, listener.accept())
        .await
        .expect("no connection from the worker")
        .expect("accept failed");
    let mut lines = BufReader::new(stream).lines();
    let line = timeout(RECV_TIMEOUT, lines.next_line())
        .await
        .expect("timed out waiting for a line")
        .expect("read failed")
        .expect("stream closed before a line arrived");
    assert_eq!(line, "t.request.get.200:1|c");

    shutdown.trigger();
}

#[tokio::test]
async fn unreachable_collector_does_not_stall_the_worker() {
    // TCP connect to a loopback port nobody listens on fails fast; the
    // worker must drop the payload and keep serving the queue.
    let shutdown = Shutdown::new();
    let (client, worker) = stats::channel(settings(
        StatsNetwork::Tcp,
        "127.0.0.1:59999".to_string(),
        10,
    ));
    let handle = tokio::spawn(worker.run(shutdown.clone()));

    client.incr("lost");
    tokio::time::sleep(Duration::from_millis(50)).await;
    client.incr("also.lost");
    tokio::time::sleep(Duration::from_millis(50)).await;

    shutdown.trigger();
    timeout(RECV_TIMEOUT, handle)
        .await
        .expect("worker should still shut down cleanly")
        .expect("worker task panicked");
}
