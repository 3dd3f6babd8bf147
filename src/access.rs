//! IP based access control, applied before any request data is read.

use std::net::IpAddr;

use crate::config::Config;

/// Decides whether `peer` may be served.
///
/// The reject set always wins. Otherwise the peer is accepted when the
/// accept set is empty or names it.
pub fn is_accepted(peer: IpAddr, cfg: &Config) -> bool {
    // IPv4 clients of a dual-stack listener show up as ::ffff:a.b.c.d
    let addr = peer.to_canonical().to_string();

    if cfg.reject.contains(&addr) {
        return false;
    }

    cfg.accept.is_empty() || cfg.accept.contains(&addr)
}
