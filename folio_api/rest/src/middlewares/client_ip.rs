use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
};

use axum::{
    extract::{connect_info::MockConnectInfo, ConnectInfo, Request},
    middleware::{from_fn, Next},
    Router,
};
use tracing::{debug, error, warn};

use crate::RealIpConfig;

/// Stores the [`ClientIp`] of every request in its extensions.
pub fn add<S: Clone + Send + Sync + 'static>(
    real_ip_config: Option<Arc<RealIpConfig>>,
) -> impl FnOnce(Router<S>) -> Router<S> {
    |router| {
        router.layer(from_fn(move |mut request: Request, next: Next| {
            let client_ip = ClientIp::from_request(&request, real_ip_config.as_deref());
            request.extensions_mut().insert(client_ip);
            next.run(request)
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientIp(pub IpAddr);

impl ClientIp {
    fn from_request(request: &Request, real_ip_config: Option<&RealIpConfig>) -> Self {
        let extensions = request.extensions();
        let Some(client_ip) = extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .or_else(|| {
                extensions
                    .get::<MockConnectInfo<SocketAddr>>()
                    .map(|MockConnectInfo(addr)| addr.ip())
            })
        else {
            warn!("peer address of request is unknown");
            return Self(Ipv4Addr::UNSPECIFIED.into());
        };

        let Some(RealIpConfig { header, set_from }) = real_ip_config else {
            return Self(client_ip);
        };

        let header_value = request.headers().get(header);

        if *set_from != client_ip {
            if let Some(header_value) = header_value {
                debug!(%client_ip, ?header_value, "ignoring real ip header value from untrusted source");
            }
            return Self(client_ip);
        }

        let Some(header_value) = header_value else {
            warn!(%client_ip, "real ip header not found");
            return Self(client_ip);
        };

        // proxies may append to an existing header, the last entry is theirs
        let Some(real_ip) = header_value
            .to_str()
            .ok()
            .and_then(|value| value.rsplit(',').next())
            .and_then(|real_ip| real_ip.trim().parse().ok())
        else {
            error!(%client_ip, ?header_value, "failed to parse real ip header value");
            return Self(client_ip);
        };

        Self(real_ip)
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http};

    use super::*;

    fn request(peer: [u8; 4], real_ip: Option<&str>) -> Request {
        let mut request = http::Request::builder();
        if let Some(real_ip) = real_ip {
            request = request.header("X-Real-Ip", real_ip);
        }
        let mut request = request.body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 1234))));
        request
    }

    fn config() -> RealIpConfig {
        RealIpConfig {
            header: "X-Real-Ip".into(),
            set_from: [127, 0, 0, 1].into(),
        }
    }

    #[test]
    fn peer_address() {
        let request = request([10, 0, 0, 7], Some("1.2.3.4"));
        let ip = ClientIp::from_request(&request, None);
        assert_eq!(ip, ClientIp([10, 0, 0, 7].into()));
    }

    #[test]
    fn trusted_proxy() {
        let request = request([127, 0, 0, 1], Some("5.6.7.8, 1.2.3.4"));
        let ip = ClientIp::from_request(&request, Some(&config()));
        assert_eq!(ip, ClientIp([1, 2, 3, 4].into()));
    }

    #[test]
    fn untrusted_proxy() {
        let request = request([10, 0, 0, 7], Some("1.2.3.4"));
        let ip = ClientIp::from_request(&request, Some(&config()));
        assert_eq!(ip, ClientIp([10, 0, 0, 7].into()));
    }

    #[test]
    fn invalid_header() {
        let request = request([127, 0, 0, 1], Some("not an ip"));
        let ip = ClientIp::from_request(&request, Some(&config()));
        assert_eq!(ip, ClientIp([127, 0, 0, 1].into()));
    }

    #[test]
    fn missing_connect_info() {
        let request = Request::new(Body::empty());
        let ip = ClientIp::from_request(&request, None);
        assert_eq!(ip, ClientIp(Ipv4Addr::UNSPECIFIED.into()));
    }
}
