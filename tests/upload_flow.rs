//! End-to-end upload and preview flows against a running server.

use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;

use instant_preview::config::ServerConfig;
use instant_preview::http::HttpServer;
use instant_preview::site::store::SiteStore;

/// Spawn the server on a loopback port backed by throwaway directories.
async fn start_server() -> (SocketAddr, Arc<SiteStore>, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.storage.data_dir = tmp.path().join("data");
    config.storage.premium_data_dir = tmp.path().join("data-premium");
    config.admin.password = "hunter2".to_string();
    std::fs::create_dir_all(&config.storage.data_dir).unwrap();
    std::fs::create_dir_all(&config.storage.premium_data_dir).unwrap();

    let store = Arc::new(SiteStore::new());
    let listener = tokio::net::TcpListener::bind(&config.listener.bind_address)
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(Arc::new(config), store.clone());
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    (addr, store, tmp)
}

/// The upload endpoint answers with an absolute https URL; rewrite it to
/// point at the test listener.
fn preview_url(addr: SocketAddr, upload_response: &str) -> String {
    let path = upload_response
        .trim()
        .strip_prefix("https://")
        .map(|rest| &rest[rest.find('/').unwrap()..])
        .unwrap();
    format!("http://{}{}", addr, path)
}

fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zw = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        zw.start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        zw.write_all(bytes).unwrap();
    }
    zw.finish().unwrap().into_inner()
}

#[tokio::test]
async fn test_raw_upload_round_trip() {
    let (addr, _store, _tmp) = start_server().await;
    let client = reqwest::Client::new();

    let body = b"hello from the preview test".to_vec();
    let resp = client
        .post(format!("http://{}/hello.txt", addr))
        .body(body.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let url = resp.text().await.unwrap();
    assert!(url.contains("/p/"), "unexpected upload response: {url}");
    assert!(url.ends_with("/hello.txt"));

    let fetched = client
        .get(preview_url(addr, &url))
        .send()
        .await
        .unwrap();
    assert_eq!(fetched.status(), 200);
    assert_eq!(fetched.bytes().await.unwrap().as_ref(), body.as_slice());
}

#[tokio::test]
async fn test_multipart_folder_upload_serves_index_at_root() {
    let (addr, _store, _tmp) = start_server().await;
    let client = reqwest::Client::new();

    let form = reqwest::multipart::Form::new()
        .part(
            "myproj/index.html",
            reqwest::multipart::Part::bytes(b"<html>home</html>".to_vec()),
        )
        .part(
            "myproj/css/main.css",
            reqwest::multipart::Part::bytes(b"body{}".to_vec()),
        );
    let resp = client
        .post(format!("http://{}/upload", addr))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let url = resp.text().await.unwrap();
    // multi-file uploads get the site root URL
    assert!(url.ends_with('/'), "expected root URL, got: {url}");

    let root = client
        .get(preview_url(addr, &url))
        .send()
        .await
        .unwrap();
    assert_eq!(root.status(), 200);
    assert_eq!(root.text().await.unwrap(), "<html>home</html>");

    // dragged-folder prefix is trimmed
    let css = client
        .get(format!("{}css/main.css", preview_url(addr, &url)))
        .send()
        .await
        .unwrap();
    assert_eq!(css.status(), 200);

    let dir = client
        .get(format!("{}_dir", preview_url(addr, &url)))
        .send()
        .await
        .unwrap();
    assert_eq!(dir.status(), 200);
    let listing = dir.text().await.unwrap();
    assert!(listing.contains("index.html"));
    assert!(listing.contains("css/main.css"));
}

#[tokio::test]
async fn test_zip_upload_hosted_without_top_folder() {
    let (addr, _store, _tmp) = start_server().await;
    let client = reqwest::Client::new();

    let body = zip_bytes(&[
        ("site/index.html", b"<html>zipped</html>"),
        ("site/about.html", b"<html>about</html>"),
    ]);
    let resp = client
        .post(format!("http://{}/upload", addr))
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let url = resp.text().await.unwrap();

    let root = client
        .get(preview_url(addr, &url))
        .send()
        .await
        .unwrap();
    assert_eq!(root.text().await.unwrap(), "<html>zipped</html>");

    // clean URLs: /about serves about.html
    let about = client
        .get(format!("{}about", preview_url(addr, &url)))
        .send()
        .await
        .unwrap();
    assert_eq!(about.status(), 200);
    assert_eq!(about.text().await.unwrap(), "<html>about</html>");
}

#[tokio::test]
async fn test_spa_toggle_changes_fallback() {
    let (addr, _store, _tmp) = start_server().await;
    let client = reqwest::Client::new();

    let form = reqwest::multipart::Form::new()
        .part(
            "index.html",
            reqwest::multipart::Part::bytes(b"<html>shell</html>".to_vec()),
        )
        .part(
            "app.js",
            reqwest::multipart::Part::bytes(b"console.log(1)".to_vec()),
        );
    let url = client
        .post(format!("http://{}/upload", addr))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let root = preview_url(addr, &url);

    // not an SPA yet: unmatched path is a 404 listing
    let miss = client
        .get(format!("{}some/route", root))
        .send()
        .await
        .unwrap();
    assert_eq!(miss.status(), 404);

    // toggle redirects to the listing page
    let toggled = client.get(format!("{}_spa", root)).send().await.unwrap();
    assert_eq!(toggled.status(), 200);
    assert!(toggled.url().path().ends_with("_dir"));

    // now the app shell answers any unmatched path
    let hit = client
        .get(format!("{}some/route", root))
        .send()
        .await
        .unwrap();
    assert_eq!(hit.status(), 200);
    assert_eq!(hit.text().await.unwrap(), "<html>shell</html>");
}

#[tokio::test]
async fn test_bare_site_url_redirects_with_slash() {
    let (addr, _store, _tmp) = start_server().await;
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let url = client
        .post(format!("http://{}/a.txt", addr))
        .body("x")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let file_url = preview_url(addr, &url);
    let bare = file_url.trim_end_matches("/a.txt").to_string();

    let resp = client.get(&bare).send().await.unwrap();
    assert!(resp.status().is_redirection());
    let location = resp.headers()["location"].to_str().unwrap();
    assert!(location.ends_with('/'));
}

#[tokio::test]
async fn test_ping_and_reporting_endpoints() {
    let (addr, _store, _tmp) = start_server().await;
    let client = reqwest::Client::new();

    let pong = client
        .get(format!("http://{}/ping", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(pong.text().await.unwrap(), "pong");

    let url = client
        .post(format!("http://{}/report.txt", addr))
        .body("1234567890")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let token = url.split("/p/").nth(1).unwrap().split('/').next().unwrap();

    let summary: serde_json::Value = client
        .get(format!("http://{}/api/summary.json", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["SitesCount"], 1);
    assert_eq!(summary["SitesSize"], 10);
    assert_eq!(summary["SitesSizeStr"], "10 B");

    let info: serde_json::Value = client
        .get(format!("http://{}/api/site-info.json?name={}", addr, token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info["IsSPA"], false);
    assert_eq!(info["Files"][0]["Path"], "report.txt");
    assert_eq!(info["Files"][0]["Size"], 10);
}

#[tokio::test]
async fn test_sites_endpoints_require_password() {
    let (addr, _store, _tmp) = start_server().await;
    let client = reqwest::Client::new();

    for path in ["/api/sites.json", "/sites"] {
        let denied = client
            .get(format!("http://{}{}", addr, path))
            .send()
            .await
            .unwrap();
        assert_eq!(denied.status(), 404);

        let denied = client
            .get(format!("http://{}{}?pwd=wrong", addr, path))
            .send()
            .await
            .unwrap();
        assert_eq!(denied.status(), 404);

        let allowed = client
            .get(format!("http://{}{}?pwd=hunter2", addr, path))
            .send()
            .await
            .unwrap();
        assert_eq!(allowed.status(), 200);
    }
}

#[tokio::test]
async fn test_concurrent_uploads_all_resolvable() {
    let (addr, _store, _tmp) = start_server().await;
    let client = reqwest::Client::new();

    let mut handles = Vec::new();
    for i in 0..8 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let body = format!("payload number {}", i);
            let url = client
                .post(format!("http://{}/file-{}.txt", addr, i))
                .body(body.clone())
                .send()
                .await
                .unwrap()
                .text()
                .await
                .unwrap();
            (url, body)
        }));
    }

    for handle in handles {
        let (url, body) = handle.await.unwrap();
        let fetched = client
            .get(preview_url(addr, &url))
            .send()
            .await
            .unwrap();
        assert_eq!(fetched.status(), 200);
        assert_eq!(fetched.text().await.unwrap(), body);
    }
}

#[tokio::test]
async fn test_oversize_upload_rejected() {
    let (addr, store, _tmp) = start_server().await;
    let client = reqwest::Client::new();

    let body = vec![0u8; 21 * 1024 * 1024];
    // the server may answer 400 or abort the connection mid-body; either
    // way nothing is ingested
    match client
        .post(format!("http://{}/big.bin", addr))
        .body(body)
        .send()
        .await
    {
        Ok(resp) => assert_eq!(resp.status(), 400),
        Err(_) => {}
    }
    assert_eq!(store.stats().0, 0);
}
