//! Response handler chains
//!
//! Consumers of the client register handlers per server role. When a
//! response correlates with a pending request it is offered to that role's
//! handlers in registration order. A handler either consumes the response
//! or hands it back for the next handler to inspect; ownership of the
//! packet moves accordingly.

use crate::ledger::{MessageType, ServerRole};
use radius_proto::Packet;

/// What a handler did with an offered response
#[derive(Debug)]
pub enum HandlerOutcome {
    /// Response handled and finished; the packet is consumed
    Processed,
    /// Response handled; the handler kept the packet for later work
    Queued,
    /// Authenticator check failed; the packet is handed back for the next
    /// handler in the chain
    InvalidAuthenticator(Packet),
    /// Response not recognized by this handler; handed back for the next one
    Unknown(Packet),
}

/// Receives responses that matched a pending request
///
/// `request` is the original request the response correlates with and
/// `shared_secret` is the secret of the server it was sent to, so the
/// handler can verify authenticators before trusting the response.
pub trait ResponseHandler: Send {
    fn on_response(
        &mut self,
        response: Packet,
        request: &Packet,
        shared_secret: &[u8],
    ) -> HandlerOutcome;
}

impl<F> ResponseHandler for F
where
    F: FnMut(Packet, &Packet, &[u8]) -> HandlerOutcome + Send,
{
    fn on_response(
        &mut self,
        response: Packet,
        request: &Packet,
        shared_secret: &[u8],
    ) -> HandlerOutcome {
        self(response, request, shared_secret)
    }
}

/// Result of running a whole chain
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ChainResult {
    /// Some handler consumed or queued the response
    Claimed,
    /// Every handler passed; remembers whether any reported a bad
    /// authenticator along the way
    Unclaimed { invalid_authenticator: bool },
}

/// Per-role handler chains
pub(crate) struct HandlerRegistry {
    auth: Vec<Box<dyn ResponseHandler>>,
    acct: Vec<Box<dyn ResponseHandler>>,
}

impl HandlerRegistry {
    pub(crate) fn new() -> Self {
        HandlerRegistry {
            auth: Vec::new(),
            acct: Vec::new(),
        }
    }

    /// Append a handler to the chain for the role serving `message_type`
    pub(crate) fn register(&mut self, message_type: MessageType, handler: Box<dyn ResponseHandler>) {
        match message_type.class() {
            ServerRole::Auth => self.auth.push(handler),
            ServerRole::Acct => self.acct.push(handler),
        }
    }

    /// Offer a response to the role's handlers in order. The packet is
    /// dropped here if the chain runs out.
    pub(crate) fn dispatch(
        &mut self,
        role: ServerRole,
        response: Packet,
        request: &Packet,
        shared_secret: &[u8],
    ) -> ChainResult {
        let chain = match role {
            ServerRole::Auth => &mut self.auth,
            ServerRole::Acct => &mut self.acct,
        };

        let mut invalid_authenticator = false;
        let mut current = response;
        for handler in chain.iter_mut() {
            match handler.on_response(current, request, shared_secret) {
                HandlerOutcome::Processed | HandlerOutcome::Queued => return ChainResult::Claimed,
                HandlerOutcome::InvalidAuthenticator(returned) => {
                    invalid_authenticator = true;
                    current = returned;
                }
                HandlerOutcome::Unknown(returned) => current = returned,
            }
        }

        ChainResult::Unclaimed {
            invalid_authenticator,
        }
    }
}
