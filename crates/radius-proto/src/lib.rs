//! RADIUS Protocol Support for NAS-Side Clients
//!
//! Wire-level RADIUS as a client uses it, per RFC 2865, 2866, and 2869:
//! packet encoding and decoding, the attribute subset an 802.1X NAS sends
//! and receives, request finalization (Message-Authenticator for
//! authentication, MD5 header digest for accounting), and response
//! authenticator verification.
//!
//! # Features
//!
//! - Packet encoding and decoding
//! - NAS-relevant RADIUS attributes (User-Name through Message-Authenticator)
//! - MD5-based password encryption
//! - Request/Response Authenticator calculation and verification
//! - HMAC-MD5 Message-Authenticator per RFC 2869
//!
//! # Example
//!
//! ```rust
//! use radius_proto::{Packet, Code, Attribute, AttributeType};
//! use radius_proto::auth::{generate_request_authenticator, encrypt_user_password};
//!
//! // Create an Access-Request packet
//! let req_auth = generate_request_authenticator();
//! let mut packet = Packet::new(Code::AccessRequest, 1, req_auth);
//!
//! // Add User-Name attribute
//! packet.add_attribute(
//!     Attribute::string(AttributeType::UserName as u8, "alice").unwrap()
//! );
//!
//! // Add encrypted User-Password
//! let encrypted_pwd = encrypt_user_password("password", b"secret", &req_auth);
//! packet.add_attribute(
//!     Attribute::new(AttributeType::UserPassword as u8, encrypted_pwd).unwrap()
//! );
//!
//! // Sign and encode to wire bytes
//! let bytes = packet.finalize(b"secret").unwrap();
//! assert!(bytes.len() >= Packet::MIN_PACKET_SIZE);
//! ```

pub mod accounting;
pub mod attributes;
pub mod auth;
pub mod message_auth;
pub mod packet;

pub use accounting::{AcctAuthentic, AcctStatusType, AcctTerminateCause};
pub use attributes::{Attribute, AttributeType};
pub use auth::{
    calculate_accounting_request_authenticator, calculate_response_authenticator,
    decrypt_user_password, encrypt_user_password, generate_request_authenticator,
    verify_response_authenticator,
};
pub use message_auth::{calculate_message_authenticator, verify_message_authenticator};
pub use packet::{Code, Packet, PacketError};
