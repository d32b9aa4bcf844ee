use std::net::IpAddr;

/// Outcome of a best-effort DNS lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved(IpAddr),
    NotFound,
}

/// Resolve `host` to its primary address.
///
/// Resolution is advisory and deliberately separate from job execution:
/// a `NotFound` never blocks dispatch, it only sharpens log lines for
/// hosts that are missing from the inventory.
pub async fn resolve(host: &str) -> Resolution {
    match tokio::net::lookup_host((host, 0u16)).await {
        Ok(mut addrs) => match addrs.next() {
            Some(addr) => Resolution::Resolved(addr.ip()),
            None => Resolution::NotFound,
        },
        Err(e) => {
            tracing::debug!(host, error = %e, "DNS lookup failed");
            Resolution::NotFound
        }
    }
}
