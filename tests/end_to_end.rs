use std::net::SocketAddr;
use std::time::Duration;

use aspen_guide::auth::{Authenticator, SharedPassword, TokenSigner};
use aspen_guide::client::{
    AdminConsole, ApiRequest, Content, FormError, HttpTransport, Link, ListingPage, MemoryStorage, Session,
    Transport,
};
use aspen_guide::entity::EntityKind;
use aspen_guide::store::SqliteStore;
use aspen_guide::{AppState, CancelToken, routes, serve_with_shutdown};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const PASSWORD: &str = "correct horse";

async fn spawn_server() -> (SocketAddr, oneshot::Sender<()>, JoinHandle<()>) {
    let store = SqliteStore::in_memory().await.unwrap();
    store.ensure_schema().await.unwrap();
    let auth = Authenticator::new(
        SharedPassword::new(PASSWORD),
        TokenSigner::new(b"end-to-end secret".to_vec(), Duration::from_secs(300)),
    );
    let app = routes::app(AppState::new(store, auth));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        serve_with_shutdown(listener, app, async {
            let _ = stopped.await;
        })
        .await
        .unwrap();
    });
    (addr, stop, server)
}

fn transport(addr: SocketAddr) -> HttpTransport {
    HttpTransport::new(&format!("http://{addr}/")).unwrap()
}

#[tokio::test]
async fn admin_creates_a_restaurant_that_the_listing_shows() {
    let (addr, stop, server) = spawn_server().await;

    let mut console = AdminConsole::new(transport(addr), Session::restore(MemoryStorage::default()));

    let form = console.form_mut(EntityKind::Restaurant);
    form.set("name", "Cafe X");
    form.set("description", "Good coffee");
    form.set("location", "Aspen");
    form.set("url", "https://example.com");
    assert_eq!(console.submit(EntityKind::Restaurant).await, Err(FormError::NotLoggedIn));

    console.login(PASSWORD).await.unwrap();
    let id = console.submit(EntityKind::Restaurant).await.unwrap();
    assert!(id > 0);
    assert_eq!(console.form(EntityKind::Restaurant).notice(), Some("Restaurant created"));
    assert_eq!(console.form(EntityKind::Restaurant).value("name"), Some(""));

    let mut page = ListingPage::new();
    page.load(&transport(addr), &CancelToken::new()).await;
    let [restaurants, activities, ads] = page.sections();
    assert_eq!(
        restaurants.content,
        Content::Links(vec![Link { href: format!("/eat/{id}"), label: "Cafe X".into() }])
    );
    assert_eq!(activities.content, Content::Message("No activities found.".into()));
    assert_eq!(ads.content, Content::Message("No advertisements found.".into()));

    let detail = reqwest::get(format!("http://{addr}/eat/{id}")).await.unwrap();
    assert_eq!(detail.status().as_u16(), 200);
    let html = detail.text().await.unwrap();
    assert!(html.contains("Cafe X"));
    assert!(html.contains("https://example.com"));

    let missing = reqwest::get(format!("http://{addr}/eat/{}", id + 100)).await.unwrap();
    assert_eq!(missing.status().as_u16(), 404);

    stop.send(()).unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn api_rejects_unauthenticated_and_unknown_requests() {
    let (addr, stop, server) = spawn_server().await;
    let http = transport(addr);
    let cancel = CancelToken::new();

    let body = br#"{"title":"Ski sale","description":"Half off"}"#.to_vec();
    let unauthenticated = http.send(ApiRequest::post_json("/api/advertisements", body.clone()), &cancel).await.unwrap();
    assert_eq!(unauthenticated.status, 401);

    let forged = http
        .send(ApiRequest::post_json("/api/advertisements", body).bearer("not.a.token"), &cancel)
        .await
        .unwrap();
    assert_eq!(forged.status, 401);

    let listed = http.send(ApiRequest::get("/api/advertisements"), &cancel).await.unwrap();
    assert_eq!(listed.status, 200);
    assert_eq!(listed.body, b"[]");

    let unknown = http.send(ApiRequest::get("/nowhere"), &cancel).await.unwrap();
    assert_eq!(unknown.status, 404);

    let health = http.send(ApiRequest::get("/readyz"), &cancel).await.unwrap();
    assert_eq!(health.status, 200);

    stop.send(()).unwrap();
    server.await.unwrap();
}
