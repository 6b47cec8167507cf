//! Integration tests for the Ramirent adapter against a local `wiremock` server.

use serde_json::json;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wsproxy_core::CookieJar;
use wsproxy_scraper::sites::ramirent::{self, RamirentPage};
use wsproxy_scraper::{RamirentSite, SignInOutcome, SiteAuth, SiteClient};

fn test_site(server: &MockServer) -> RamirentSite {
    let client = SiteClient::new(&server.uri(), ramirent::HEADER_PROFILE, 5, "wsproxy-test/0.1")
        .expect("failed to build test SiteClient");
    RamirentSite::new(client)
}

const GROUP_PAGE: &str = r#"<html><body>
<h1>Zagęszczarka gruntu 90 kg</h1>
<div class="p-equipments-item" data-group_id="5512" data-jsLoad="/ajax/equipmentDetail/5512">
  <div class="description">Lekka zagęszczarka do gruntów niespoistych.</div>
</div>
</body></html>"#;

const DETAIL_FRAGMENT: &str = r#"<div class="summary">
  <span id="jsPriceSumTax" data-price="184.50">184,50 zł</span>
  <span id="jsPriceSumNet" data-price="150.00">150,00 zł netto</span>
  <span class="font-bold text-light">/ Dzień</span>
  <span class="jsPlaceStatus">Dostępny</span>
</div>"#;

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sign_in_posts_form_and_reads_client_from_init() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "PHPSESSID=abc; path=/")
                .set_body_string("<html></html>"),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/konto"))
        .and(query_param("basket", "1"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .and(body_string(
            "account_login=jan%40firma.pl&account_password=tajne&account_mode=login",
        ))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "/konto")
                .insert_header("set-cookie", "auth=1; path=/; HttpOnly"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ajax/init"))
        .and(query_param("xhr", "true"))
        .and(header("cookie", "PHPSESSID=abc; auth=1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "account": {"client_id": 48213, "client_login": "jan@firma.pl"}
        })))
        .mount(&server)
        .await;

    let site = test_site(&server);
    let mut jar = CookieJar::new();
    let outcome = site.sign_in(&mut jar, "jan@firma.pl", "tajne").await.unwrap();

    let SignInOutcome::Authenticated(account) = outcome else {
        panic!("expected Authenticated, got {outcome:?}");
    };
    assert_eq!(account.client_id.as_deref(), Some("48213"));
    assert_eq!(account.email.as_deref(), Some("jan@firma.pl"));
    assert_eq!(jar.get("auth"), Some("1"));
}

#[tokio::test]
async fn sign_in_without_client_id_is_rejected_even_if_home_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/konto"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>zły login</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ajax/init"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"account": {"client_id": null}})))
        .mount(&server)
        .await;

    let site = test_site(&server);
    let outcome = site.sign_in(&mut CookieJar::new(), "jan", "zle").await.unwrap();

    assert!(
        matches!(
            &outcome,
            SignInOutcome::Rejected { message } if message.contains("niepoprawne dane logowania")
        ),
        "got {outcome:?}"
    );
}

#[tokio::test]
async fn probe_treats_html_init_as_no_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ajax/init"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let site = test_site(&server);
    let account = site.probe(&mut CookieJar::from_header_value("PHPSESSID=old")).await.unwrap();
    assert!(account.is_none());
}

#[tokio::test]
async fn second_factor_is_unsupported() {
    let server = MockServer::start().await;
    let site = test_site(&server);

    let err = site.submit_code(&mut CookieJar::new(), "123456").await.unwrap_err();
    assert!(matches!(err, wsproxy_scraper::ScraperError::Unsupported { .. }), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[tokio::test]
async fn categories_fall_back_to_known_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wynajem"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>nowy layout</body></html>"),
        )
        .mount(&server)
        .await;

    let categories = test_site(&server).categories(&mut CookieJar::new()).await.unwrap();
    assert_eq!(categories.len(), 8);
    assert_eq!(categories[2].slug, "/wynajem/wg-produktu/podnosniki");
}

#[tokio::test]
async fn product_merges_detail_fragment_and_related_groups() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wynajem/zageszczarki"))
        .respond_with(ResponseTemplate::new(200).set_body_string(GROUP_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ajax/equipmentDetail/5512"))
        .and(query_param("xhr", "true"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DETAIL_FRAGMENT))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ajax/groupsConnections/5512"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<a href="/wynajem/stopy"><span class="c-product-card__title">Stopy fundamentowe</span></a>"#,
        ))
        .mount(&server)
        .await;

    let group = test_site(&server)
        .product("wynajem/zageszczarki", &mut CookieJar::new())
        .await
        .unwrap();

    assert_eq!(group.title, "Zagęszczarka gruntu 90 kg");
    assert_eq!(group.price_brutto, Some(184.5));
    assert_eq!(group.price_netto, Some(150.0));
    assert_eq!(group.price_unit.as_deref(), Some("Dzień"));
    assert_eq!(group.available, "Dostępny");
    assert!(!group.contact_only);
    assert_eq!(group.related.len(), 1);
    assert_eq!(group.related[0].name, "Stopy fundamentowe");
}

#[tokio::test]
async fn product_survives_failed_enrichment() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wynajem/zageszczarki"))
        .respond_with(ResponseTemplate::new(200).set_body_string(GROUP_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ajax/equipmentDetail/5512"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ajax/groupsConnections/5512"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let group = test_site(&server)
        .product("/wynajem/zageszczarki", &mut CookieJar::new())
        .await
        .unwrap();

    assert_eq!(group.group_id, "5512");
    assert!(group.contact_only);
    assert!(group.related.is_empty());
}

#[tokio::test]
async fn browse_category_path_lists_tiles() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wynajem/wg-produktu/podnosniki"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<h1>Podnośniki</h1>
            <a class="p-equipments-list-box" href="/wynajem/podnosniki-nozycowe">
              <span class="p-equipments-list-box__title">Podnośniki nożycowe</span>
            </a>"#,
        ))
        .mount(&server)
        .await;

    let page = test_site(&server)
        .browse("/wynajem/wg-produktu/podnosniki", &mut CookieJar::new())
        .await
        .unwrap();

    let RamirentPage::Category { title, items } = page else {
        panic!("expected a category page, got {page:?}");
    };
    assert_eq!(title, "Podnośniki");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].slug, "/wynajem/podnosniki-nozycowe");
}

#[tokio::test]
async fn search_uses_json_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wyszukiwarka"))
        .and(query_param("str", "młot"))
        .and(query_param("xhr", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"name": "Młot wyburzeniowy", "href": "/wynajem/mloty", "breadcrumb": "Lekki sprzęt"}]
        })))
        .mount(&server)
        .await;

    let items = test_site(&server).search("młot", &mut CookieJar::new()).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Młot wyburzeniowy");
    assert_eq!(items[0].breadcrumb.as_deref(), Some("Lekki sprzęt"));
}

#[tokio::test]
async fn search_falls_back_to_results_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wyszukiwarka"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<a class="p-equipments-list-box" href="/wynajem/mloty">
              <span class="p-equipments-list-box__title">Młoty</span></a>"#,
        ))
        .mount(&server)
        .await;

    let items = test_site(&server).search("młot", &mut CookieJar::new()).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].slug, "/wynajem/mloty");
}
