//! Runs the real router on an ephemeral port and drives it through the
//! client library.

use std::time::Duration;

use mediashelf::{
    app::build_app,
    client::{
        library::filter_by_type, ApiClient, ClientError, MediaAsset, Session, Uploader,
    },
    media::dto::ResourceType,
    state::AppState,
};

async fn spawn_server() -> (String, AppState) {
    let state = AppState::fake().await;
    let app = build_app(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), state)
}

fn http() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

#[tokio::test]
async fn signup_login_and_session() {
    let (base, _state) = spawn_server().await;
    let api = ApiClient::new(http(), &base);
    let mut session = Session::new();

    let created = api
        .signup("alice", "alice@example.com", "Secret123!")
        .await
        .unwrap();
    assert_eq!(created.user.id, 1);
    assert_eq!(created.user.username, "alice");
    session.apply_signup(created);
    assert!(session.is_new_signup());

    session.logout();
    assert!(!session.is_authenticated());

    let logged_in = api.login("alice@example.com", "Secret123!").await.unwrap();
    assert_eq!(logged_in.user.email, "alice@example.com");
    let token = logged_in.token.clone().unwrap();
    session.apply_login(logged_in);
    assert_eq!(session.profile_greeting(), "Welcome back, alice!");
    assert_eq!(session.user().unwrap().password, "********");

    let me = api.me(&token).await.unwrap();
    assert_eq!(me.id, 1);

    let wrong = api.login("alice@example.com", "wrong").await.unwrap_err();
    let ghost = api.login("ghost@example.com", "Secret123!").await.unwrap_err();
    match (wrong, ghost) {
        (ClientError::Auth(a), ClientError::Auth(b)) => assert_eq!(a, b),
        other => panic!("unexpected {other:?}"),
    }

    let dup = api
        .signup("alice2", "alice@example.com", "Other!")
        .await
        .unwrap_err();
    assert!(matches!(dup, ClientError::Conflict(_)));
}

#[tokio::test]
async fn upload_through_server_then_list() {
    let (base, state) = spawn_server().await;
    let api = ApiClient::new(http(), &base);

    assert!(api.list_media().await.unwrap().is_empty());

    let uploader = Uploader::server(api.clone(), state.config.max_upload_bytes);
    let uploaded = uploader
        .upload(
            MediaAsset::new(vec![9u8; 64]).with_file_name("clip.mp4"),
            None,
        )
        .await
        .unwrap();
    assert!(reqwest::Url::parse(&uploaded.secure_url).is_ok());
    assert_eq!(uploaded.bytes, 64);

    let listed = api.list_media().await.unwrap();
    assert_eq!(listed, vec![uploaded]);
    assert_eq!(filter_by_type(&listed, ResourceType::Video).len(), 1);
    assert!(filter_by_type(&listed, ResourceType::Image).is_empty());
}

#[tokio::test]
async fn oversized_upload_is_refused_client_side_and_server_side() {
    let (base, state) = spawn_server().await;
    let api = ApiClient::new(http(), &base);
    let limit = state.config.max_upload_bytes;

    let strict = Uploader::server(api.clone(), limit);
    let err = strict
        .upload(MediaAsset::new(vec![0u8; limit + 1]), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::TooLarge { .. }));

    // A lenient client still cannot get past the server's own cap.
    let lenient = Uploader::server(api.clone(), limit * 4);
    let err = lenient
        .upload(MediaAsset::new(vec![0u8; limit + 1]), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Upload { status: 413, .. }));

    assert!(api.list_media().await.unwrap().is_empty());
}

#[tokio::test]
async fn local_storage_serves_uploaded_bytes() {
    use std::sync::Arc;

    use mediashelf::{
        config::{AppConfig, StorageConfig},
        storage::{LocalStorage, StorageClient},
    };

    let dir = tempfile::tempdir().unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let fake = AppState::fake().await;
    let config = Arc::new(AppConfig {
        storage: StorageConfig::Local {
            media_dir: dir.path().to_path_buf(),
            public_base_url: base.clone(),
        },
        ..(*fake.config).clone()
    });
    let storage = Arc::new(LocalStorage::new(dir.path(), &base).await.unwrap()) as Arc<dyn StorageClient>;
    let state = AppState::from_parts(fake.db.clone(), config, storage);

    let app = build_app(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let api = ApiClient::new(http(), &base);
    let uploader = Uploader::server(api.clone(), state.config.max_upload_bytes);
    let uploaded = uploader
        .upload(
            MediaAsset::new(b"PNGDATA".to_vec()).with_mime("image/png"),
            None,
        )
        .await
        .unwrap();
    assert!(uploaded.secure_url.starts_with(&format!("{}/media/", base)));
    assert_eq!(uploaded.resource_type, ResourceType::Image);

    let fetched = http()
        .get(&uploaded.secure_url)
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    assert_eq!(&fetched[..], b"PNGDATA");
}

#[tokio::test]
async fn direct_cloudinary_upload_shows_up_in_listing() {
    use mediashelf::config::CloudinaryConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let cloud = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/demo/video/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "public_id": "v1",
            "secure_url": "https://res.cloudinary.com/demo/video/upload/v1.mp4",
            "resource_type": "video",
            "format": "mp4",
            "bytes": 3,
            "duration": 1.5
        })))
        .expect(1)
        .mount(&cloud)
        .await;

    let (base, _state) = spawn_server().await;
    let api = ApiClient::new(http(), &base);
    let signed_up = api
        .signup("carol", "carol@example.com", "Secret123!")
        .await
        .unwrap();

    let uploader = Uploader::cloudinary(
        api.clone(),
        Some(CloudinaryConfig {
            cloud_name: "demo".into(),
            upload_preset: "preset".into(),
            api_base: cloud.uri(),
        }),
        1024,
    )
    .unwrap();
    let uploaded = uploader
        .upload(MediaAsset::new(vec![1u8, 2, 3]), signed_up.token.as_deref())
        .await
        .unwrap();
    assert_eq!(uploaded.public_id, "v1");

    let listed = api.list_media().await.unwrap();
    assert_eq!(listed, vec![uploaded]);
    assert_eq!(listed[0].duration, Some(1.5));
}
