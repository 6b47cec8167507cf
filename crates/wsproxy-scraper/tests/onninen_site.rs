//! Integration tests for the Onninen adapter against a local `wiremock` server.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use wsproxy_core::CookieJar;
use wsproxy_scraper::sites::onninen::{self, OnninenPage};
use wsproxy_scraper::{OnninenSite, SignInOutcome, SiteAuth, SiteClient};

/// Exact match on the raw header value. `matchers::header` splits values on
/// commas, which breaks `Accept`-style lists.
fn raw_header(
    name: &'static str,
    value: &'static str,
) -> impl Fn(&Request) -> bool + Send + Sync {
    move |request: &Request| {
        request.headers.get(name).map(|v| v.as_bytes()) == Some(value.as_bytes())
    }
}

fn test_site(server: &MockServer) -> OnninenSite {
    let client = SiteClient::new(&server.uri(), onninen::HEADER_PROFILE, 5, "wsproxy-test/0.1")
        .expect("failed to build test SiteClient");
    OnninenSite::new(client)
}

async fn mount_home(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "ONN_SID=s1; path=/")
                .set_body_string("<html></html>"),
        )
        .mount(server)
        .await;
}

async fn mount_userinfo(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"name": "Jan Kowalski", "email": "jan@firma.pl", "loggedin": true},
            "currentCustomer": {"idEx": 771203, "nameShort": "ELEKTRO-JAN"}
        })))
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sign_in_without_second_factor_reads_userinfo() {
    let server = MockServer::start().await;
    mount_home(&server).await;
    mount_userinfo(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(header("cookie", "ONN_SID=s1"))
        .and(body_json(json!({"userName": "jan", "password": "tajne"})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "ONN_AUTH=t1; path=/")
                .set_body_json(json!({"status": "ok"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut jar = CookieJar::new();
    let outcome = test_site(&server).sign_in(&mut jar, "jan", "tajne").await.unwrap();

    let SignInOutcome::Authenticated(account) = outcome else {
        panic!("expected Authenticated, got {outcome:?}");
    };
    assert_eq!(account.client_id.as_deref(), Some("771203"));
    assert_eq!(account.name.as_deref(), Some("Jan Kowalski"));
    assert_eq!(jar.get("ONN_AUTH"), Some("t1"));
}

#[tokio::test]
async fn sign_in_with_sms_step_needs_code() {
    let server = MockServer::start().await;
    mount_home(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code2falength": 6,
            "secondwait": 120
        })))
        .mount(&server)
        .await;

    let outcome = test_site(&server)
        .sign_in(&mut CookieJar::new(), "jan", "tajne")
        .await
        .unwrap();
    assert_eq!(
        outcome,
        SignInOutcome::NeedsCode {
            message: "Kod SMS został wysłany na Twój numer telefonu".to_string()
        }
    );
}

#[tokio::test]
async fn sign_in_error_is_rejected() {
    let server = MockServer::start().await;
    mount_home(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errors": ["Błędne hasło"]})))
        .mount(&server)
        .await;

    let outcome = test_site(&server)
        .sign_in(&mut CookieJar::new(), "jan", "zle")
        .await
        .unwrap();
    assert_eq!(
        outcome,
        SignInOutcome::Rejected {
            message: "Błędne hasło".to_string()
        }
    );
}

#[tokio::test]
async fn submit_code_replays_with_remember_workstation() {
    let server = MockServer::start().await;
    mount_userinfo(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(header("cookie", "ONN_SID=s1"))
        .and(body_json(json!({"code2Fa": "123456", "rememberWorkstation": true, "step": 1})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "ONN_WS=remember; path=/")
                .set_body_json(json!({"status": "ok"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut jar = CookieJar::from_header_value("ONN_SID=s1");
    let outcome = test_site(&server).submit_code(&mut jar, "123456").await.unwrap();

    assert!(matches!(outcome, SignInOutcome::Authenticated(_)), "got {outcome:?}");
    assert_eq!(jar.get("ONN_WS"), Some("remember"));
}

#[tokio::test]
async fn wrong_code_asks_again() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "code"})))
        .mount(&server)
        .await;

    let outcome = test_site(&server)
        .submit_code(&mut CookieJar::new(), "000000")
        .await
        .unwrap();
    assert_eq!(
        outcome,
        SignInOutcome::NeedsCode {
            message: "Nieprawidłowy kod. Spróbuj ponownie.".to_string()
        }
    );
}

#[tokio::test]
async fn resend_posts_send_again_flag() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({"sendAgainType": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"secondwait": 120})))
        .expect(1)
        .mount(&server)
        .await;

    let message = test_site(&server).resend_code(&mut CookieJar::new()).await.unwrap();
    assert_eq!(message, "Kod SMS wysłany ponownie");
}

#[tokio::test]
async fn probe_reports_logged_out_user() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/userinfo"))
        .and(query_param("query", "user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": {"loggedin": false}})))
        .mount(&server)
        .await;

    let account = test_site(&server).probe(&mut CookieJar::new()).await.unwrap();
    assert!(account.is_none());
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[tokio::test]
async fn categories_are_built_into_a_tree() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/groups"))
        .and(query_param("grouptype", "categories"))
        .and(raw_header("accept", "application/json, text/plain, */*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Kable i przewody", "slug": "Kable-i-przewody"},
            {"id": 2, "name": "Przewody instalacyjne", "slug": "Kable-i-przewody/Przewody-instalacyjne", "parentId": 1}
        ])))
        .mount(&server)
        .await;

    let tree = test_site(&server).categories(&mut CookieJar::new()).await.unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].subcategories[0].name, "Przewody instalacyjne");
}

#[tokio::test]
async fn products_query_category_path_with_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("query", "/Kable-i-przewody/Przewody-instalacyjne"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"title": "Przewody instalacyjne", "items": [
                {"id": 7, "slug": "ydy", "name": "YDY 3x2,5",
                 "price": {"items": [{"quantity": 1, "pricecatalog": 5.8}]}}
            ]}],
            "total": 30,
            "lastpage": 2
        })))
        .mount(&server)
        .await;

    let site = test_site(&server);
    let page = site
        .products("/Kable-i-przewody/Przewody-instalacyjne", 2, &mut CookieJar::new())
        .await
        .unwrap();

    assert_eq!(page.products.len(), 1);
    assert_eq!(page.products[0].url, format!("{}/product/ydy", server.uri()));
    assert_eq!(page.products[0].price_catalog, Some(5.8));
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.total_products, 30);
}

#[tokio::test]
async fn browse_product_slug_reads_card() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/card"))
        .and(query_param("slug", "przewod-ydy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "card": {"id": 7, "name": "Przewód YDY", "categories": [{"name": "Kable"}]}
        })))
        .mount(&server)
        .await;

    let page = test_site(&server)
        .browse("/product/przewod-ydy", &mut CookieJar::new())
        .await
        .unwrap();

    let OnninenPage::Product { product } = page else {
        panic!("expected a product, got {page:?}");
    };
    assert_eq!(product.product.name, "Przewód YDY");
    assert_eq!(product.product.slug, "przewod-ydy");
    assert_eq!(product.breadcrumb, "Kable");
}

#[tokio::test]
async fn search_error_status_surfaces() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = test_site(&server)
        .search("kabel", 1, &mut CookieJar::new())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(502));
}
