//! Header multimap transformation for outbound requests.
//!
//! The only rewrite the proxy performs is the Host header; everything
//! else crosses the boundary untouched, with repeated entries for the
//! same name preserved.

use hyper::header::{self, HeaderMap, HeaderValue};

/// Build the outbound header map: every inbound header except Host,
/// followed by the policy-selected Host value.
pub fn forward_headers(inbound: &HeaderMap, host: HeaderValue) -> HeaderMap {
    let mut outbound = HeaderMap::with_capacity(inbound.len() + 1);
    for (name, value) in inbound {
        if name != header::HOST {
            outbound.append(name.clone(), value.clone());
        }
    }
    outbound.insert(header::HOST, host);
    outbound
}
