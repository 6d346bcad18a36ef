use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderMap,
};
use std::net::SocketAddr;

/// Shared identity for callers with no derivable address
pub const UNKNOWN_CLIENT: &str = "unknown";

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Best-effort client address: first `X-Forwarded-For` entry, then the peer
/// address, then [`UNKNOWN_CLIENT`].
///
/// Headers are caller-controlled, so this is a throttling signal only, never
/// an authentication mechanism.
pub fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    forwarded_client(headers)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Identity for an inbound request, using the connection info when the server
/// was started with it
pub fn request_identity(request: &Request) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    client_identity(request.headers(), peer)
}

fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    let chain = headers.get(FORWARDED_FOR)?.to_str().ok()?;
    let first = chain.split(',').next()?.trim();

    (!first.is_empty()).then(|| first.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::HeaderValue};

    #[test]
    fn test_first_forwarded_address_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static("1.2.3.4, 5.6.7.8"));

        let peer = Some(SocketAddr::from(([10, 0, 0, 1], 4000)));
        assert_eq!(client_identity(&headers, peer), "1.2.3.4");
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        let headers = HeaderMap::new();
        let peer = Some(SocketAddr::from(([203, 0, 113, 42], 51000)));

        assert_eq!(client_identity(&headers, peer), "203.0.113.42");
    }

    #[test]
    fn test_blank_forwarded_header_falls_back() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static(" , 5.6.7.8"));

        let peer = Some(SocketAddr::from(([192, 168, 1, 1], 80)));
        assert_eq!(client_identity(&headers, peer), "192.168.1.1");
    }

    #[test]
    fn test_non_ascii_header_degrades_to_unknown() {
        let mut headers = HeaderMap::new();
        headers.insert(
            FORWARDED_FOR,
            HeaderValue::from_bytes(b"\xff\xfe").unwrap(),
        );

        assert_eq!(client_identity(&headers, None), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_no_sources_yield_unknown() {
        assert_eq!(client_identity(&HeaderMap::new(), None), "unknown");
    }

    #[test]
    fn test_request_identity_reads_connect_info() {
        let mut request = Request::new(Body::empty());
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 9000))));

        assert_eq!(request_identity(&request), "127.0.0.1");
    }
}
