//! The HTTP backend against the reference router, over a loopback client.

use hostlink_core::{BackendFacade, BackendService, FacadeError, Filter, ServiceError, Session};
use hostlink_http::{HttpBackend, HttpRequest, LoopbackClient, LoopbackServer, Method};
use hostlink_server::Router;
use hostlink_testkit::{
    row, TestBackend, OPEN_TABLE, PRIVATE_BUCKET, PUBLIC_BUCKET, TEST_PUBLIC_KEY, TEST_URL,
};
use serde_json::{json, Map};
use std::sync::Arc;

fn service_error(err: FacadeError) -> ServiceError {
    err.as_service().cloned().expect("expected a service error")
}

#[tokio::test]
async fn auth_failures_keep_service_status() {
    let backend = TestBackend::new();
    let facade = backend.http_facade();

    facade
        .sign_up("ann@example.com", "secret1", Map::new())
        .await
        .unwrap();
    facade.sign_out().await.unwrap();

    let err = service_error(
        facade
            .sign_up("ann@example.com", "secret2", Map::new())
            .await
            .unwrap_err(),
    );
    assert_eq!(err.status, Some(422));
    assert_eq!(err.message, "User already registered");
    assert_eq!(err.code.as_deref(), Some("user_already_exists"));

    let err = service_error(facade.sign_in("ann@example.com", "nope!!").await.unwrap_err());
    assert_eq!(err.status, Some(400));
    assert_eq!(err.message, "Invalid login credentials");

    let err = service_error(facade.sign_up("bob@example.com", "abc", Map::new()).await.unwrap_err());
    assert_eq!(err.status, Some(422));
}

#[tokio::test]
async fn table_and_storage_failures_keep_service_status() {
    let backend = TestBackend::new();
    let facade = backend.http_facade();

    let err = service_error(facade.select_all("missing").await.unwrap_err());
    assert_eq!(err.status, Some(404));
    assert_eq!(err.code.as_deref(), Some("42P01"));

    facade.upload(PUBLIC_BUCKET, "a.txt", &b"one"[..]).await.unwrap();
    let err = service_error(facade.upload(PUBLIC_BUCKET, "a.txt", &b"two"[..]).await.unwrap_err());
    assert_eq!(err.status, Some(409));

    let err = service_error(facade.download(PUBLIC_BUCKET, "b.txt").await.unwrap_err());
    assert_eq!((err.status, err.message.as_str()), (Some(404), "Object not found"));

    let err = service_error(facade.download(PRIVATE_BUCKET, "a.txt").await.unwrap_err());
    assert_eq!(err.status, Some(400));
}

#[tokio::test]
async fn rows_round_trip_with_filters() {
    let backend = TestBackend::new();
    let facade = backend.http_facade();

    facade
        .insert_many(
            OPEN_TABLE,
            vec![
                row(json!({"city": "Austin", "beds": 3, "pool": true})),
                row(json!({"city": "Dallas", "beds": 2, "pool": false})),
            ],
        )
        .await
        .unwrap();

    let rows = facade
        .select_where(OPEN_TABLE, "city", &[Filter::eq("beds", 3), Filter::eq("pool", true)])
        .await
        .unwrap();
    assert_eq!(rows, vec![row(json!({"city": "Austin"}))]);

    let removed = facade
        .delete_where(OPEN_TABLE, &[Filter::eq("city", "Dallas")])
        .await
        .unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(backend.service.tables().row_count(OPEN_TABLE), Some(1));
}

#[tokio::test]
async fn refresh_rotates_tokens() {
    let backend = TestBackend::new();
    let facade = backend.http_facade();

    let first = signed_in_session(&facade).await;
    let refreshed = facade.refresh_session().await.unwrap();
    assert_ne!(refreshed.refresh_token, first.refresh_token);
    assert_eq!(refreshed.user.id, first.user.id);

    let http = backend.http_backend();
    let err = http.refresh_session(&first.refresh_token).await.unwrap_err();
    assert_eq!(err.status, Some(400));
}

#[tokio::test]
async fn revoked_token_is_rejected() {
    let backend = TestBackend::new();
    let facade = backend.http_facade();

    let session = signed_in_session(&facade).await;
    facade.sign_out().await.unwrap();

    let http = backend.http_backend();
    let err = http.get_user(&session.access_token).await.unwrap_err();
    assert_eq!(err.status, Some(401));
}

#[tokio::test]
async fn public_url_is_served_without_a_key() {
    let backend = TestBackend::new();
    let facade = backend.http_facade();
    facade
        .upload(PUBLIC_BUCKET, "photos/front door.jpg", &b"jpeg"[..])
        .await
        .unwrap();

    let url = facade.get_public_url(PUBLIC_BUCKET, "photos/front door.jpg");
    let router = Router::new(Arc::clone(&backend.service));
    let response = router.handle(&HttpRequest::new(Method::Get, url));
    assert_eq!(response.status, 200);
    assert_eq!(&response.body[..], b"jpeg");

    facade
        .upload(PRIVATE_BUCKET, "x", &b"secret"[..])
        .await
        .unwrap_err();
    let private = facade.get_public_url(PRIVATE_BUCKET, "x");
    assert_eq!(router.handle(&HttpRequest::new(Method::Get, private)).status, 404);
}

#[tokio::test]
async fn both_backends_refuse_the_same_object_paths() {
    let backend = TestBackend::new();
    let direct = backend.facade();
    let http = backend.http_facade();

    for path in ["a/../b.txt", "a//b.txt", "./b.txt", "x/../../../../auth/v1/user"] {
        let upload_err = |r: Result<_, FacadeError>| service_error(r.unwrap_err());
        let over_http = upload_err(http.upload(PUBLIC_BUCKET, path, &b"x"[..]).await);
        let in_process = upload_err(direct.upload(PUBLIC_BUCKET, path, &b"x"[..]).await);
        assert_eq!(over_http, in_process, "{path}");
        assert_eq!(over_http.status, Some(400), "{path}");
        assert_eq!(over_http.code.as_deref(), Some("InvalidKey"), "{path}");

        let over_http = service_error(http.download(PUBLIC_BUCKET, path).await.unwrap_err());
        let in_process = service_error(direct.download(PUBLIC_BUCKET, path).await.unwrap_err());
        assert_eq!(over_http, in_process, "{path}");
    }
    assert_eq!(backend.service.buckets().object_count(PUBLIC_BUCKET), Some(0));

    let stored = http.upload(PUBLIC_BUCKET, "a/b.txt", &b"ok"[..]).await.unwrap();
    assert_eq!(stored.key, "listings/a/b.txt");
    assert_eq!(&direct.download(PUBLIC_BUCKET, "/a/b.txt").await.unwrap()[..], b"ok");
}

#[tokio::test]
async fn wrong_public_key_is_unauthorized() {
    let backend = TestBackend::new();
    let router = Router::new(Arc::clone(&backend.service));
    let http = HttpBackend::new(TEST_URL, "not-the-key", LoopbackClient::new(router));

    let err = http.select(None, OPEN_TABLE, "*", &[]).await.unwrap_err();
    assert_eq!(err.status, Some(401));
    assert_eq!(err.message, "Invalid API key");

    let keyless = Router::new(Arc::clone(&backend.service))
        .handle(&HttpRequest::new(Method::Get, format!("{TEST_URL}/rest/v1/{OPEN_TABLE}")));
    assert_eq!(keyless.status, 401);

    let keyed = Router::new(Arc::clone(&backend.service)).handle(
        &HttpRequest::new(Method::Get, format!("{TEST_URL}/rest/v1/{OPEN_TABLE}"))
            .header("apikey", TEST_PUBLIC_KEY),
    );
    assert_eq!(keyed.status, 200);
}

async fn signed_in_session<S: BackendService>(facade: &BackendFacade<S>) -> Session {
    facade
        .sign_up("ann@example.com", "secret1", Map::new())
        .await
        .unwrap()
        .session
        .expect("autoconfirm issues a session")
}
