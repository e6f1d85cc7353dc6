//! Sends one Access-Request through the client and waits for the verdict.
//!
//! The client keeps retransmitting on its own; this example just parks on a
//! channel until a handler sees the response or patience runs out.
//!
//! Usage: access_request <username> <password> <secret> [server_addr]

use radius_client::{
    ClientConfig, HandlerOutcome, MessageType, RadiusClient, ServerConfig, StationId,
};
use radius_proto::{
    auth::{encrypt_user_password, generate_request_authenticator, verify_response_authenticator},
    Attribute, AttributeType, Code, Packet,
};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 4 {
        eprintln!("Usage: {} <username> <password> <secret> [server_addr]", args[0]);
        eprintln!("Example: {} admin admin123 testing123 127.0.0.1:1812", args[0]);
        std::process::exit(1);
    }

    let username = &args[1];
    let password = &args[2];
    let secret = &args[3];
    let server_addr = args.get(4).map(|s| s.as_str()).unwrap_or("127.0.0.1:1812");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("RADIUS Client Test");
    println!("==================");
    println!("Server: {}", server_addr);
    println!("Username: {}", username);
    println!();

    let config = ClientConfig {
        auth_servers: vec![ServerConfig {
            address: server_addr.to_string(),
            secret: secret.clone(),
            name: Some("primary".to_string()),
        }],
        ..ClientConfig::default()
    };
    let client = RadiusClient::start(config).await?;

    // Responses surface through a handler running on the client's event
    // task; forward them here over a channel
    let (verdict_tx, mut verdict_rx) = mpsc::unbounded_channel();
    client.register_handler(
        MessageType::Auth,
        move |response: Packet, request: &Packet, shared_secret: &[u8]| {
            if !verify_response_authenticator(&response, &request.authenticator, shared_secret) {
                return HandlerOutcome::InvalidAuthenticator(response);
            }
            let _ = verdict_tx.send(response);
            HandlerOutcome::Queued
        },
    )?;

    // Build the Access-Request the same way a NAS would
    let identifier = client.next_identifier().await?;
    let request_auth = generate_request_authenticator();
    let mut packet = Packet::new(Code::AccessRequest, identifier, request_auth);
    packet.add_attribute(Attribute::string(AttributeType::UserName.as_u8(), username)?);
    let encrypted_password = encrypt_user_password(password, secret.as_bytes(), &request_auth);
    packet.add_attribute(Attribute::new(
        AttributeType::UserPassword.as_u8(),
        encrypted_password,
    )?);
    packet.add_attribute(Attribute::ipv4(
        AttributeType::NasIpAddress.as_u8(),
        [127, 0, 0, 1],
    )?);

    let station = StationId::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
    println!("Sending Access-Request (identifier {})...", identifier);
    client.send(packet, MessageType::Auth, station)?;

    match timeout(Duration::from_secs(5), verdict_rx.recv()).await {
        Ok(Some(response)) => {
            match response.code {
                Code::AccessAccept => println!("\n✓ Authentication SUCCESSFUL!"),
                Code::AccessReject => println!("\n✗ Authentication FAILED!"),
                Code::AccessChallenge => println!("\n→ Authentication CHALLENGE!"),
                other => println!("\n? Unexpected response: {:?}", other),
            }
            for attr in response.find_all_attributes(AttributeType::ReplyMessage.as_u8()) {
                if let Ok(msg) = attr.as_string() {
                    println!("  Message: {}", msg);
                }
            }
            println!("\nResponse Details:");
            println!("  Identifier: {}", response.identifier);
            println!("  Attributes: {}", response.attributes.len());
        }
        Ok(None) => eprintln!("\n✗ Client shut down before a response arrived"),
        Err(_) => {
            eprintln!("\n✗ No response from server within 5 seconds");
            eprintln!("  Make sure a RADIUS server is running on {}", server_addr);
        }
    }

    println!("\nClient counters:");
    print!("{}", client.stats().await?);

    client.shutdown().await?;
    Ok(())
}
