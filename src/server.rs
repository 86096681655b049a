// src/server.rs

use crate::error::ServeError;
use crate::model::{OwnershipOptions, OwnershipResult};
use crate::renderer::{build_graph, render_page};
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

const HTML: &str = "text/html; charset=utf-8";
const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct OwnershipDocument<'a> {
    options: &'a OwnershipOptions,
    result: &'a OwnershipResult,
}

/// Responses rendered once at startup and shared by all connections without locking
struct GraphState {
    page: Bytes,
    ownership_json: Bytes,
    graph_json: Bytes,
}

impl GraphState {
    fn render(result: &OwnershipResult, options: &OwnershipOptions) -> Result<Self, ServeError> {
        let graph = build_graph(result)?;
        let document = OwnershipDocument { options, result };
        Ok(Self {
            page: Bytes::from(render_page(result, options, &graph)),
            ownership_json: Bytes::from(serde_json::to_vec(&document)?),
            graph_json: Bytes::from(serde_json::to_vec(&graph)?),
        })
    }
}

/// Bind `addr` (port 0 picks a free port), start serving on the current
/// tokio runtime and return the URL of the graph page. There is no shutdown
/// path: the listener lives until the process exits.
pub async fn serve_ownership(
    result: &OwnershipResult,
    options: &OwnershipOptions,
    addr: SocketAddr,
) -> Result<String, ServeError> {
    let state = Arc::new(GraphState::render(result, options)?);

    let bind_err = |source: std::io::Error| ServeError::Bind { addr, source };
    let listener = TcpListener::bind(addr).await.map_err(bind_err)?;
    let local_addr = listener.local_addr().map_err(bind_err)?;

    tokio::spawn(accept_loop(listener, state));

    let url = format!("http://{}/", local_addr);
    info!(%url, "ownership graph listening");
    Ok(url)
}

async fn accept_loop(listener: TcpListener, state: Arc<GraphState>) {
    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let state = state.clone();
                async move { Ok::<_, Infallible>(route(&req, &state)) }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Error serving connection from {}: {}", remote_addr, err);
            }
        });
    }
}

fn route<B>(req: &Request<B>, state: &GraphState) -> Response<Full<Bytes>> {
    let path = req.uri().path();
    debug!(method = %req.method(), path, "graph request");

    if req.method() != Method::GET {
        return respond(StatusCode::METHOD_NOT_ALLOWED, TEXT, Bytes::from_static(b"method not allowed\n"));
    }

    match path {
        "/" | "/index.html" => respond(StatusCode::OK, HTML, state.page.clone()),
        "/api/ownership" => respond(StatusCode::OK, JSON, state.ownership_json.clone()),
        "/api/graph" => respond(StatusCode::OK, JSON, state.graph_json.clone()),
        _ => respond(StatusCode::NOT_FOUND, TEXT, Bytes::from_static(b"not found\n")),
    }
}

fn respond(status: StatusCode, content_type: &'static str, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::three_author_result;
    use crate::model::{AuthorCluster, AuthorIdentity};
    use std::net::{Ipv4Addr, SocketAddrV4};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn loopback(port: u16) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port))
    }

    async fn start() -> SocketAddr {
        let options = OwnershipOptions {
            branch: "main".into(),
            ..Default::default()
        };
        let url = serve_ownership(&three_author_result(), &options, loopback(0))
            .await
            .expect("serve");
        url.trim_start_matches("http://")
            .trim_end_matches('/')
            .parse()
            .expect("socket address in url")
    }

    /// Status line and body of a single request
    async fn request(addr: SocketAddr, method: &str, path: &str) -> (String, String) {
        let mut stream = TcpStream::connect(addr).await.expect("connect");
        let req = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(req.as_bytes()).await.expect("send request");

        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.expect("read response");
        let (head, body) = raw.split_once("\r\n\r\n").expect("http response");
        let status = head.lines().next().unwrap_or_default().to_string();
        (status, body.to_string())
    }

    #[tokio::test]
    async fn test_serves_full_result() {
        let addr = start().await;
        let (status, body) = request(addr, "GET", "/api/ownership").await;
        assert!(status.contains("200"), "{status}");

        let doc: serde_json::Value = serde_json::from_str(&body).expect("json body");
        let result: OwnershipResult = serde_json::from_value(doc["Result"].clone()).expect("result");
        assert_eq!(result, three_author_result());
        assert_eq!(doc["Options"]["Branch"], "main");
    }

    #[tokio::test]
    async fn test_serves_page() {
        let addr = start().await;
        let (status, body) = request(addr, "GET", "/").await;
        assert!(status.contains("200"), "{status}");
        assert!(body.contains("<svg id=\"graph\""));
        assert!(body.contains("author3"));
    }

    #[tokio::test]
    async fn test_serves_graph() {
        let addr = start().await;
        let (_, body) = request(addr, "GET", "/api/graph").await;
        let graph: serde_json::Value = serde_json::from_str(&body).expect("json body");
        assert_eq!(graph["Nodes"].as_array().expect("nodes").len(), 3);
        assert_eq!(graph["Links"].as_array().expect("links").len(), 1);
        assert_eq!(graph["Nodes"][0]["AuthorName"], "author3");
    }

    #[tokio::test]
    async fn test_concurrent_requests() {
        let addr = start().await;
        let handles: Vec<_> = (0..8)
            .map(move |_| tokio::spawn(async move { request(addr, "GET", "/api/graph").await }))
            .collect();
        for handle in handles {
            let (status, _) = handle.await.expect("request task");
            assert!(status.contains("200"));
        }
    }

    #[tokio::test]
    async fn test_unknown_route_and_method() {
        let addr = start().await;
        let (status, _) = request(addr, "GET", "/nope").await;
        assert!(status.contains("404"), "{status}");
        let (status, _) = request(addr, "POST", "/").await;
        assert!(status.contains("405"), "{status}");
    }

    #[tokio::test]
    async fn test_bind_error() {
        let taken = std::net::TcpListener::bind(loopback(0)).expect("bind");
        let addr = taken.local_addr().expect("local addr");
        let err = serve_ownership(&three_author_result(), &OwnershipOptions::default(), addr)
            .await
            .unwrap_err();
        assert!(matches!(err, ServeError::Bind { .. }));
    }

    #[tokio::test]
    async fn test_inconsistent_result() {
        let mut result = three_author_result();
        result.author_clusters.push(AuthorCluster {
            authors: vec![AuthorIdentity::new("ghost", "ghost@mail.com")],
        });
        let err = serve_ownership(&result, &OwnershipOptions::default(), loopback(0))
            .await
            .unwrap_err();
        assert!(matches!(err, ServeError::Format(_)));
    }
}
