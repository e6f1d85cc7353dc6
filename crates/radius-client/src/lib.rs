//! Asynchronous RADIUS client for NAS-side 802.1X deployments
//!
//! Reliability layer between an authenticator daemon and its RADIUS
//! servers: requests are retransmitted on a backoff schedule until a
//! response arrives, traffic fails over to fallback servers when the
//! active one stops answering, and responses are correlated back to the
//! code that sent the request through registered handler chains.
//!
//! # Architecture
//!
//! - All state lives on one spawned event task; [`RadiusClient`] handles
//!   talk to it over a command channel and are cheap to clone.
//! - Un-ACKed requests wait in a bounded ledger, newest first; when it is
//!   full the oldest entry is shed.
//! - Retransmission doubles its delay per attempt (3s up to a 120s
//!   ceiling, ten transmissions by default) before abandoning a request.
//! - Authentication and accounting servers are independent roles, each
//!   with its own candidate list, sockets, failover state and counters.
//! - Counters are rendered on demand in the RFC 2618/2620 client MIB
//!   `key=value` format.
//!
//! # Example
//!
//! ```no_run
//! use radius_client::{ClientConfig, MessageType, RadiusClient, ServerConfig, StationId};
//! use radius_proto::{generate_request_authenticator, Attribute, AttributeType, Code, Packet};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig {
//!     auth_servers: vec![ServerConfig {
//!         address: "192.0.2.10:1812".to_string(),
//!         secret: "shared_secret".to_string(),
//!         name: Some("primary".to_string()),
//!     }],
//!     ..ClientConfig::default()
//! };
//! let client = RadiusClient::start(config).await?;
//!
//! let id = client.next_identifier().await?;
//! let mut request = Packet::new(Code::AccessRequest, id, generate_request_authenticator());
//! request.add_attribute(Attribute::string(AttributeType::UserName.as_u8(), "alice")?);
//! client.send(request, MessageType::Auth, StationId::new([0x02, 0, 0, 0, 0, 0x01]))?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod handler;

mod ledger;
mod stats;
mod transport;

pub use client::RadiusClient;
pub use config::{ClientConfig, RetryConfig, ServerConfig};
pub use error::{ClientError, ClientResult};
pub use handler::{HandlerOutcome, ResponseHandler};
pub use ledger::{MessageType, ServerRole, StationId};
