#![allow(dead_code)]

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html; charset=utf-8"))
        .mount(server)
        .await;
}

/// A four-page site: `/` links to `/a` and `/b` (missing, 404) plus an
/// off-site link; `/a` links to `/c` and back home.
pub async fn small_site() -> MockServer {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body><h1>Home</h1>
            <a href="/a">A page</a>
            <a href="/b">B page</a>
            <a href="/a#details">A again</a>
            <a href="https://elsewhere.test/x">Elsewhere</a>
        </body></html>"#,
    )
    .await;
    mount_page(
        &server,
        "/a",
        r#"<html><body><p>Alpha page</p><a href="/c">C</a><a href="/">Home</a></body></html>"#,
    )
    .await;
    mount_page(&server, "/c", "<html><body><p>Charlie page</p></body></html>").await;
    server
}

pub fn page_url(server: &MockServer, route: &str) -> String {
    format!("{}{}", server.uri(), route)
}
