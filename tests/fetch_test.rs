mod common;

use bytes::Bytes;
use common::{count, reply, request, serve};
use fetchlet::{fetch, ErrorKind, Fetch, FetchConfig, FetchContext, FetchState, NetError};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use futures::StreamExt;
use std::io::Write;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[tokio::test]
async fn test_simple_data() {
    let (addr, seen) = serve(|_| reply("200 OK", &[], b"abc")).await;

    let body = fetch(&format!("http://{}/simple/data", addr))
        .text()
        .await
        .unwrap();
    assert_eq!(body, "abc");

    let req = request(&seen, 0);
    assert!(req.starts_with("get /simple/data http/1.1"));
    assert!(req.contains(&format!("host: {}", addr)));
    assert!(req.contains(&format!("accept-encoding: {}", fetchlet::ACCEPT_ENCODING)));
}

#[tokio::test]
async fn test_post_data() {
    let (addr, seen) = serve(|_| reply("200 OK", &[], b"abc")).await;

    let mut f = fetch(&format!("http://{}/simple/data", addr));
    f.method("POST").send("123");
    assert_eq!(f.text().await.unwrap(), "abc");

    let req = request(&seen, 0);
    assert!(req.starts_with("post /simple/data http/1.1"));
    assert!(req.contains("content-length: 3"));
    assert!(req.ends_with("\r\n\r\n123"));
}

#[tokio::test]
async fn test_host_and_path() {
    let (addr, seen) = serve(|_| reply("200 OK", &[], b"abc")).await;

    let mut f = Fetch::default();
    f.host(addr.to_string()).path("/simple/data?x=1");
    assert_eq!(f.bytes().await.unwrap(), Bytes::from_static(b"abc"));
    assert!(request(&seen, 0).starts_with("get /simple/data?x=1 http/1.1"));
}

#[tokio::test]
async fn test_custom_headers() {
    let (addr, seen) = serve(|_| reply("200 OK", &[], b"abc")).await;

    let mut f = fetch(&format!("http://{}/simple/data", addr));
    f.header("Authorization", "1234")
        .set("X-Custom", "one")
        .set("x-custom", "two")
        .user_agent("fetchlet-test");
    f.text().await.unwrap();

    let req = request(&seen, 0);
    assert!(req.contains("authorization: 1234"));
    assert!(req.contains("x-custom: two"));
    assert!(!req.contains("x-custom: one"));
    assert!(req.contains("user-agent: fetchlet-test"));
}

#[tokio::test]
async fn test_multiple_headers() {
    let (addr, seen) = serve(|_| reply("200 OK", &[], b"abc")).await;

    let mut f = fetch(&format!("http://{}/simple/data", addr));
    f.headers([("Authorization", "1234"), ("X-Custom", "custom value")]);
    assert_eq!(f.text().await.unwrap(), "abc");

    let req = request(&seen, 0);
    assert!(req.contains("authorization: 1234"));
    assert!(req.contains("x-custom: custom value"));
}

#[tokio::test]
async fn test_basic_auth_from_url() {
    let (addr, seen) = serve(|_| reply("200 OK", &[], b"")).await;

    fetch(&format!("http://user:pass@{}/", addr))
        .bytes()
        .await
        .unwrap();
    assert!(request(&seen, 0).contains("authorization: basic dxnlcjpwyxnz"));
}

#[tokio::test]
async fn test_secure_setter_targets_https() {
    let mut f = Fetch::manual();
    f.url("http://example.com/simple/data").secure(true);
    assert_eq!(
        f.spec().effective_url().unwrap().as_str(),
        "https://example.com/simple/data"
    );
}

#[tokio::test]
async fn test_response_head_before_body() {
    let (addr, _) = serve(|_| reply("200 OK", &[("X-Test", "yes")], b"abc")).await;

    let mut f = fetch(&format!("http://{}/data", addr));
    let head = f.response().await.unwrap();
    assert_eq!(head.status(), http::StatusCode::OK);
    assert_eq!(head.header("x-test"), Some("yes"));
    assert_eq!(head.url(), format!("http://{}/data", addr));

    assert_eq!(f.text().await.unwrap(), "abc");
    assert_eq!(f.state(), FetchState::Closed);
    // Resolves once; later calls return the same head.
    assert_eq!(f.response().await.unwrap().status(), http::StatusCode::OK);
}

#[tokio::test]
async fn test_http_error() {
    let (addr, _) = serve(|_| reply("404 Not Found", &[], b"No such file")).await;

    let mut f = fetch(&format!("http://{}/simple/data", addr));
    let err = f.next().await.unwrap().unwrap_err();
    assert_eq!(err.to_string(), "HTTP Error: 404");
    assert_eq!(err.status(), Some(404));
    assert!(f.next().await.is_none());
    assert!(f.response().await.is_none());
    assert_eq!(f.state(), FetchState::Failed);
}

#[tokio::test]
async fn test_unzip_response() {
    let body = gzip(b"This is compressed response!");
    let (addr, _) =
        serve(move |_| reply("200 OK", &[("Content-Encoding", "gzip")], &body)).await;

    let text = fetch(&format!("http://{}/simple/data", addr))
        .text()
        .await
        .unwrap();
    assert_eq!(text, "This is compressed response!");
}

#[tokio::test]
async fn test_x_gzip_and_deflate() {
    let gz = gzip(b"gz");
    let (gz_addr, _) =
        serve(move |_| reply("200 OK", &[("Content-Encoding", "x-gzip")], &gz)).await;
    assert_eq!(fetch(&format!("http://{}/", gz_addr)).text().await.unwrap(), "gz");

    let zl = deflate(b"zlib");
    let (zl_addr, _) =
        serve(move |_| reply("200 OK", &[("Content-Encoding", "deflate")], &zl)).await;
    assert_eq!(fetch(&format!("http://{}/", zl_addr)).text().await.unwrap(), "zlib");
}

#[cfg(feature = "brotli")]
#[tokio::test]
async fn test_brotli_response() {
    let mut compressed = Vec::new();
    {
        let mut writer = brotli::CompressorWriter::new(&mut compressed, 4096, 5, 22);
        writer.write_all(b"brotli body").unwrap();
    }
    let (addr, _) =
        serve(move |_| reply("200 OK", &[("Content-Encoding", "br")], &compressed)).await;

    assert_eq!(fetch(&format!("http://{}/", addr)).text().await.unwrap(), "brotli body");
}

#[tokio::test]
async fn test_inflate_disabled_keeps_raw_bytes() {
    let body = gzip(b"raw");
    let expected = body.clone();
    let (addr, _) =
        serve(move |_| reply("200 OK", &[("Content-Encoding", "gzip")], &body)).await;

    let mut f = fetch(&format!("http://{}/", addr));
    f.inflate(false);
    assert_eq!(f.bytes().await.unwrap().to_vec(), expected);
}

#[tokio::test]
async fn test_empty_gzip_body_fails() {
    let (addr, _) = serve(|_| reply("200 OK", &[("Content-Encoding", "gzip")], b"")).await;

    let err = fetch(&format!("http://{}/", addr)).bytes().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn test_abort_before_start() {
    let (addr, seen) = serve(|_| reply("200 OK", &[], b"abc")).await;

    let mut f = fetch(&format!("http://{}/", addr));
    f.abort();
    assert!(f.next().await.is_none());
    assert_eq!(f.state(), FetchState::Aborted);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(count(&seen), 0);
}

#[tokio::test]
async fn test_abort_mid_stream() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            common::read_request(&mut socket).await;
            let head = "HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\n";
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(b"first").await;
            // Hold the rest back until the client gives up.
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    });

    let mut f = fetch(&format!("http://{}/slow", addr));
    let first = f.next().await.unwrap().unwrap();
    assert_eq!(first, Bytes::from_static(b"first"));

    f.abort().abort();
    let err = f.next().await.unwrap().unwrap_err();
    assert_eq!(err, NetError::ConnectionReset);
    assert!(err.is_transport());
    assert!(f.next().await.is_none());
    assert_eq!(f.state(), FetchState::Aborted);
}

#[tokio::test]
async fn test_manual_start() {
    let (addr, seen) = serve(|_| reply("200 OK", &[], b"abc")).await;

    let mut f = Fetch::manual();
    f.url(&format!("http://{}/", addr));
    assert!(!f.is_started());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(count(&seen), 0);

    f.run().run();
    assert_eq!(f.text().await.unwrap(), "abc");
    assert_eq!(count(&seen), 1);
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = fetch(&format!("http://127.0.0.1:{}/", port))
        .bytes()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_context_user_agent() {
    let (addr, seen) = serve(|_| reply("200 OK", &[], b"")).await;

    let context = FetchContext::with_config(FetchConfig {
        user_agent: Some("fetchlet/0.1".to_string()),
        channel_capacity: 1,
        ..FetchConfig::default()
    });
    let mut f = Fetch::with_context(context);
    f.url(&format!("http://{}/", addr));
    f.bytes().await.unwrap();
    assert!(request(&seen, 0).contains("user-agent: fetchlet/0.1"));
}

#[cfg(feature = "json")]
#[tokio::test]
async fn test_json_body() {
    #[derive(serde::Deserialize)]
    struct Reply {
        name: String,
        count: u32,
    }

    let (addr, _) = serve(|_| reply("200 OK", &[], br#"{"name":"abc","count":3}"#)).await;
    let parsed: Reply = fetch(&format!("http://{}/", addr)).json().await.unwrap();
    assert_eq!(parsed.name, "abc");
    assert_eq!(parsed.count, 3);

    let (bad, _) = serve(|_| reply("200 OK", &[], b"not json")).await;
    let err = fetch(&format!("http://{}/", bad))
        .json::<Reply>()
        .await
        .err()
        .unwrap();
    assert_eq!(err, NetError::JsonParseError);
}
