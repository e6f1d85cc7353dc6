//! RADIUS client MIB rendering
//!
//! Renders the per-server counters as the `key=value` lines of the RFC 2618
//! and RFC 2620 client MIBs, one block per configured server, authentication
//! servers first.

use crate::transport::RoleTransport;
use std::fmt::Write;

/// Render the MIB blocks for both roles
///
/// `pending_auth` and `pending_acct` are the ledger entry counts per role;
/// they are attributed to the active server and reported as zero for the
/// others.
pub(crate) fn render_mib(
    auth: &RoleTransport,
    acct: &RoleTransport,
    pending_auth: usize,
    pending_acct: usize,
) -> String {
    let mut out = String::new();
    for (i, server) in auth.servers().iter().enumerate() {
        let pending = if auth.is_active(i) { pending_auth } else { 0 };
        let s = &server.stats;
        let _ = writeln!(out, "radiusAuthServerIndex={}", i + 1);
        let _ = writeln!(out, "radiusAuthServerAddress={}", server.address.ip());
        let _ = writeln!(
            out,
            "radiusAuthClientServerPortNumber={}",
            server.address.port()
        );
        let _ = writeln!(out, "radiusAuthClientRoundTripTime={}", s.round_trip_time);
        let _ = writeln!(out, "radiusAuthClientAccessRequests={}", s.requests);
        let _ = writeln!(
            out,
            "radiusAuthClientAccessRetransmissions={}",
            s.retransmissions
        );
        let _ = writeln!(out, "radiusAuthClientAccessAccepts={}", s.access_accepts);
        let _ = writeln!(out, "radiusAuthClientAccessRejects={}", s.access_rejects);
        let _ = writeln!(
            out,
            "radiusAuthClientAccessChallenges={}",
            s.access_challenges
        );
        let _ = writeln!(
            out,
            "radiusAuthClientMalformedAccessResponses={}",
            s.malformed_responses
        );
        let _ = writeln!(
            out,
            "radiusAuthClientBadAuthenticators={}",
            s.bad_authenticators
        );
        let _ = writeln!(out, "radiusAuthClientTimeouts={}", s.timeouts);
        let _ = writeln!(out, "radiusAuthClientUnknownTypes={}", s.unknown_types);
        let _ = writeln!(out, "radiusAuthClientPacketsDropped={}", s.packets_dropped);
        let _ = writeln!(out, "radiusAuthClientPendingRequests={}", pending);
    }
    for (i, server) in acct.servers().iter().enumerate() {
        let pending = if acct.is_active(i) { pending_acct } else { 0 };
        let s = &server.stats;
        let _ = writeln!(out, "radiusAccServerIndex={}", i + 1);
        let _ = writeln!(out, "radiusAccServerAddress={}", server.address.ip());
        let _ = writeln!(
            out,
            "radiusAccClientServerPortNumber={}",
            server.address.port()
        );
        let _ = writeln!(out, "radiusAccClientRoundTripTime={}", s.round_trip_time);
        let _ = writeln!(out, "radiusAccClientRequests={}", s.requests);
        let _ = writeln!(out, "radiusAccClientRetransmissions={}", s.retransmissions);
        let _ = writeln!(out, "radiusAccClientResponses={}", s.responses);
        let _ = writeln!(
            out,
            "radiusAccClientMalformedResponses={}",
            s.malformed_responses
        );
        let _ = writeln!(
            out,
            "radiusAccClientBadAuthenticators={}",
            s.bad_authenticators
        );
        let _ = writeln!(out, "radiusAccClientTimeouts={}", s.timeouts);
        let _ = writeln!(out, "radiusAccClientUnknownTypes={}", s.unknown_types);
        let _ = writeln!(out, "radiusAccClientPacketsDropped={}", s.packets_dropped);
        let _ = writeln!(out, "radiusAccClientPendingRequests={}", pending);
    }
    out
}
