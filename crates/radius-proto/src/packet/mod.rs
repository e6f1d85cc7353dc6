//! RADIUS packet header and framing (RFC 2865 Section 3)

mod code;
mod packet;

pub use code::Code;
pub use packet::{Packet, PacketError};
