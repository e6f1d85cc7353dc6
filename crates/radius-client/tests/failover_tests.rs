//! Failover, cool-down and primary-restoration tests
//!
//! Each test runs against two fake auth servers (non-blocking UDP sockets
//! that never answer) under tokio's paused clock, walking the retransmission
//! schedule until the stuck-entry tally trips the failover threshold.

use radius_client::{ClientConfig, MessageType, RadiusClient, RetryConfig, ServerConfig, StationId};
use radius_proto::{
    generate_request_authenticator, AcctStatusType, Attribute, AttributeType, Code, Packet,
};
use std::io::ErrorKind;
use std::net::UdpSocket;
use tokio::time::{self, Duration};

const STATION_A: StationId = StationId::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);

fn bind_server() -> (UdpSocket, String) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.set_nonblocking(true).unwrap();
    let address = socket.local_addr().unwrap().to_string();
    (socket, address)
}

fn server_config(address: &str, secret: &str) -> ServerConfig {
    ServerConfig {
        address: address.to_string(),
        secret: secret.to_string(),
        name: None,
    }
}

fn drain(server: &UdpSocket) -> Vec<Vec<u8>> {
    let mut datagrams = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match server.recv_from(&mut buf) {
            Ok((n, _)) => datagrams.push(buf[..n].to_vec()),
            Err(err) if err.kind() == ErrorKind::WouldBlock => break,
            Err(err) => panic!("server socket failed: {err}"),
        }
    }
    datagrams
}

/// Let the client task work through queued events. Sleeping (rather than
/// yielding) parks the runtime so socket readiness gets polled and the
/// paused clock only hops the single millisecond each sleep asks for.
async fn settle() {
    for _ in 0..5 {
        time::sleep(Duration::from_millis(1)).await;
    }
}

async fn advance(seconds: u64) {
    time::advance(Duration::from_secs(seconds)).await;
    settle().await;
}

fn access_request(id: u8) -> Packet {
    let mut packet = Packet::new(Code::AccessRequest, id, generate_request_authenticator());
    packet.add_attribute(Attribute::string(AttributeType::UserName.as_u8(), "testuser").unwrap());
    packet
}

fn acct_start_request(id: u8) -> Packet {
    let mut packet = Packet::new(Code::AccountingRequest, id, [0u8; 16]);
    packet.add_attribute(
        Attribute::integer(
            AttributeType::AcctStatusType.as_u8(),
            AcctStatusType::Start.as_u32(),
        )
        .unwrap(),
    );
    packet
}

#[tokio::test(start_paused = true)]
async fn test_failover_after_threshold_switches_once() {
    let (primary, primary_addr) = bind_server();
    let (secondary, secondary_addr) = bind_server();
    let config = ClientConfig {
        auth_servers: vec![
            server_config(&primary_addr, "shared_secret"),
            server_config(&secondary_addr, "shared_secret"),
        ],
        retry: RetryConfig {
            failover_cooldown: 100_000,
            ..RetryConfig::default()
        },
        ..ClientConfig::default()
    };
    let client = RadiusClient::start(config).await.unwrap();

    for _ in 0..3 {
        let id = client.next_identifier().await.unwrap();
        client
            .send(access_request(id), MessageType::Auth, STATION_A)
            .unwrap();
    }
    settle().await;
    let mut originals = drain(&primary);
    assert_eq!(originals.len(), 3);
    originals.sort();

    // Four retry rounds against the primary push every entry past the
    // stuck threshold, so the fourth round also switches servers
    for gap in [3u64, 6, 12, 24] {
        advance(gap).await;
        assert_eq!(drain(&primary).len(), 3);
        assert!(drain(&secondary).is_empty());
    }

    // The rewound entries go out to the secondary after the initial wait,
    // byte for byte the same messages
    advance(3).await;
    assert!(drain(&primary).is_empty());
    let mut resent = drain(&secondary);
    assert_eq!(resent.len(), 3);
    resent.sort();
    assert_eq!(resent, originals);

    advance(6).await;
    assert!(drain(&primary).is_empty());
    assert_eq!(drain(&secondary).len(), 3);

    let stats = client.stats().await.unwrap();
    // Primary: 3 first transmissions, 4 rounds of 3 retransmissions, 12
    // scan timeouts plus 3 charged by the failover itself
    assert!(stats.contains("radiusAuthClientAccessRetransmissions=12\n"));
    assert!(stats.contains("radiusAuthClientTimeouts=15\n"));
    // Secondary: the rewound entries count as fresh first transmissions
    assert_eq!(
        stats.matches("radiusAuthClientAccessRequests=3\n").count(),
        2
    );
    assert!(stats.contains("radiusAuthClientAccessRetransmissions=3\n"));
    assert!(stats.contains("radiusAuthClientTimeouts=3\n"));
    // Pending entries are attributed to the new active server
    let inactive = stats.find("radiusAuthClientPendingRequests=0").unwrap();
    let active = stats.find("radiusAuthClientPendingRequests=3").unwrap();
    assert!(inactive < active);
}

#[tokio::test(start_paused = true)]
async fn test_secret_change_flushes_every_role() {
    let (primary, primary_addr) = bind_server();
    let (secondary, secondary_addr) = bind_server();
    let (acct_server, acct_addr) = bind_server();
    let config = ClientConfig {
        auth_servers: vec![
            server_config(&primary_addr, "first_secret"),
            server_config(&secondary_addr, "second_secret"),
        ],
        acct_servers: vec![server_config(&acct_addr, "acct_secret")],
        ..ClientConfig::default()
    };
    let client = RadiusClient::start(config).await.unwrap();

    let auth_id = client.next_identifier().await.unwrap();
    client
        .send(access_request(auth_id), MessageType::Auth, STATION_A)
        .unwrap();
    let acct_id = client.next_identifier().await.unwrap();
    client
        .send(acct_start_request(acct_id), MessageType::Acct, STATION_A)
        .unwrap();
    settle().await;
    assert_eq!(drain(&primary).len(), 1);
    assert_eq!(drain(&acct_server).len(), 1);

    for gap in [3u64, 6, 12, 24] {
        advance(gap).await;
        assert_eq!(drain(&primary).len(), 1);
        assert_eq!(drain(&acct_server).len(), 1);
    }

    // The new server's secret differs, so old messages cannot simply be
    // replayed: every pending entry in both roles was dropped
    let stats = client.stats().await.unwrap();
    assert_eq!(
        stats.matches("radiusAuthClientPendingRequests=0\n").count(),
        2
    );
    assert!(stats.contains("radiusAccClientPendingRequests=0\n"));
    // 4 scan timeouts plus 1 charged by the failover
    assert!(stats.contains("radiusAuthClientTimeouts=5\n"));
    // The lone accounting server cannot fail over and is never charged
    assert!(stats.contains("radiusAccClientTimeouts=4\n"));

    // Nothing is left to retransmit anywhere
    advance(3).await;
    advance(6).await;
    assert!(drain(&primary).is_empty());
    assert!(drain(&secondary).is_empty());
    assert!(drain(&acct_server).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_suppresses_rapid_second_failover() {
    let (primary, primary_addr) = bind_server();
    let (secondary, secondary_addr) = bind_server();
    let config = ClientConfig {
        auth_servers: vec![
            server_config(&primary_addr, "shared_secret"),
            server_config(&secondary_addr, "shared_secret"),
        ],
        retry: RetryConfig {
            failover_cooldown: 1000,
            ..RetryConfig::default()
        },
        ..ClientConfig::default()
    };
    let client = RadiusClient::start(config).await.unwrap();

    for _ in 0..3 {
        let id = client.next_identifier().await.unwrap();
        client
            .send(access_request(id), MessageType::Auth, STATION_A)
            .unwrap();
    }
    settle().await;
    assert_eq!(drain(&primary).len(), 3);

    // First failover fires normally once the entries are stuck
    for gap in [3u64, 6, 12, 24] {
        advance(gap).await;
    }
    assert_eq!(drain(&primary).len(), 12);

    // Walk the secondary through the same schedule until the entries are
    // stuck again, inside the cool-down window this time
    for gap in [3u64, 6, 12, 24, 48] {
        advance(gap).await;
    }
    assert_eq!(drain(&secondary).len(), 15);

    let stats = client.stats().await.unwrap();
    // Only the primary carries a failover charge; the suppressed attempt
    // left the secondary's timeouts at its plain scan count
    assert_eq!(stats.matches("radiusAuthClientTimeouts=15\n").count(), 1);
    assert!(stats.contains("radiusAuthClientTimeouts=12\n"));
    let inactive = stats.find("radiusAuthClientPendingRequests=0").unwrap();
    let active = stats.find("radiusAuthClientPendingRequests=3").unwrap();
    assert!(inactive < active);

    // The next retry round still targets the secondary
    advance(96).await;
    assert!(drain(&primary).is_empty());
    assert_eq!(drain(&secondary).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_primary_restoration_switches_back() {
    let (primary, primary_addr) = bind_server();
    let (secondary, secondary_addr) = bind_server();
    let config = ClientConfig {
        auth_servers: vec![
            server_config(&primary_addr, "shared_secret"),
            server_config(&secondary_addr, "shared_secret"),
        ],
        retry: RetryConfig {
            failover_cooldown: 100_000,
            ..RetryConfig::default()
        },
        retry_primary_interval: 200,
        ..ClientConfig::default()
    };
    let client = RadiusClient::start(config).await.unwrap();

    let id = client.next_identifier().await.unwrap();
    client
        .send(access_request(id), MessageType::Auth, STATION_A)
        .unwrap();
    settle().await;
    assert_eq!(drain(&primary).len(), 1);

    // Failover to the secondary at the fourth retry round, then keep
    // retrying against it (the second tally is inside the cool-down)
    for gap in [3u64, 6, 12, 24, 3, 6, 12, 24, 48] {
        advance(gap).await;
    }
    assert_eq!(drain(&primary).len(), 4);
    assert_eq!(drain(&secondary).len(), 5);

    // The periodic restore timer fires at the 200 second mark and moves
    // the role back to the primary with a rewound schedule
    advance(62).await;
    advance(3).await;
    assert_eq!(drain(&primary).len(), 1);
    assert!(drain(&secondary).is_empty());

    let stats = client.stats().await.unwrap();
    assert!(stats.contains("radiusAuthClientAccessRequests=2\n"));
    let active = stats.find("radiusAuthClientPendingRequests=1").unwrap();
    let inactive = stats.find("radiusAuthClientPendingRequests=0").unwrap();
    assert!(active < inactive);
}
