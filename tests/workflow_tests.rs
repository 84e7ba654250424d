/// End-to-end workflows through the HTTP router
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use civicfix::{
    account::{NewAccount, RoleFlags},
    config::{
        AuthConfig, BootstrapConfig, LoggingConfig, ModerationConfig, RateLimitConfig,
        ServiceConfig, StorageConfig,
    },
    db,
    server::build_router,
    AppContext, ServerConfig,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "civicfix-test-boundary";
const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x02\0\0\0";

struct TestApp {
    ctx: AppContext,
    router: Router,
    _dir: TempDir,
}

fn config_for(dir: &TempDir) -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            hostname: "localhost".to_string(),
            port: 8000,
            version: "test".to_string(),
            photo_upload_limit: 1024 * 1024,
        },
        storage: StorageConfig {
            data_directory: dir.path().to_path_buf(),
            database: ":memory:".into(),
            photo_directory: dir.path().join("photos"),
        },
        authentication: AuthConfig {
            secret_key: "integration-secret-key-0123456789abcdef".to_string(),
            session_ttl_hours: 24,
        },
        moderation: ModerationConfig {
            default_ban_days: 7,
            ban_sweep_interval_secs: 900,
        },
        rate_limit: RateLimitConfig { enabled: false },
        logging: LoggingConfig {
            level: "info".to_string(),
        },
        bootstrap: BootstrapConfig {
            superuser_username: Some("admin".to_string()),
            superuser_email: Some("admin@example.com".to_string()),
            superuser_password: Some("admin-password".to_string()),
        },
    }
}

async fn setup() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&dir);

    let pool = db::connect_in_memory().await.unwrap();
    db::run_migrations(&pool).await.unwrap();

    let ctx = AppContext::with_pool(config, pool);
    ctx.account_manager
        .ensure_superuser(&ctx.config.bootstrap)
        .await
        .unwrap();

    TestApp {
        router: build_router(ctx.clone()),
        ctx,
        _dir: dir,
    }
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post_json(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn register(&self, username: &str) {
        let (status, body) = self
            .post_json(
                "/register/",
                None,
                json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "phone": "",
                    "password1": "correct-horse",
                    "password2": "correct-horse",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .post_json(
                "/login/",
                None,
                json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["token"].as_str().unwrap().to_string()
    }

    async fn citizen(&self, username: &str) -> String {
        self.register(username).await;
        self.login(username, "correct-horse").await
    }

    async fn admin(&self) -> String {
        self.login("admin", "admin-password").await
    }

    async fn report(&self, token: &str, title: &str, photo: Option<&[u8]>) -> (StatusCode, Value) {
        let mut body = Vec::new();
        for (name, value) in [
            ("title", title),
            ("description", "Water everywhere"),
            ("location", "Main St & 3rd Ave"),
            ("latitude", "40.7128"),
            ("longitude", ""),
        ] {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        if let Some(data) = photo {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"leak.png\"\r\nContent-Type: image/png\r\n\r\n",
                    BOUNDARY
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let req = Request::builder()
            .method("POST")
            .uri("/report-issue/")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }

    async fn report_issue(&self, token: &str, title: &str) -> i64 {
        let (status, body) = self.report(token, title, None).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["issue"]["id"].as_i64().unwrap()
    }

    async fn create_department(&self, admin: &str, name: &str) -> i64 {
        let (status, body) = self
            .post_json("/superadmin/departments/", Some(admin), json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["department"]["id"].as_i64().unwrap()
    }

    /// Resolver account that belongs to `department_id`
    async fn resolver_in(&self, admin: &str, department_id: i64, username: &str) -> String {
        let (status, body) = self
            .post_json(
                &format!("/superadmin/departments/{}/", department_id),
                Some(admin),
                json!({
                    "action": "create_user",
                    "username": username,
                    "password": "resolver-pass",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        self.login(username, "resolver-pass").await
    }

    async fn issue_status(&self, issue_id: i64) -> String {
        let (status, body) = self.get(&format!("/issues/{}/", issue_id), None).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["issue"]["status"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_and_unknown_route() {
    let app = setup().await;

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.get("/no-such-page/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn test_registration_rejects_mismatched_passwords_and_duplicates() {
    let app = setup().await;
    app.register("alice").await;

    let (status, _) = app
        .post_json(
            "/register/",
            None,
            json!({
                "username": "alice",
                "email": "alice2@example.com",
                "password1": "correct-horse",
                "password2": "correct-horse",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post_json(
            "/register/",
            None,
            json!({
                "username": "bob",
                "email": "bob@example.com",
                "password1": "correct-horse",
                "password2": "battery-staple",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_sets_cookie_that_authenticates() {
    let app = setup().await;
    app.register("alice").await;

    let req = Request::builder()
        .method("POST")
        .uri("/login/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "username": "alice", "password": "correct-horse" }).to_string(),
        ))
        .unwrap();
    let response = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("civicfix_session="));

    let req = Request::builder()
        .uri("/dashboard/")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["total_count"], 0);
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let app = setup().await;
    app.register("alice").await;

    let (status, body) = app
        .post_json(
            "/login/",
            None,
            json!({ "username": "alice", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Invalid username or password."));
}

#[tokio::test]
async fn test_report_requires_citizen() {
    let app = setup().await;

    let (status, _) = app.report("not-a-token", "Pothole", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let admin = app.admin().await;
    let (status, _) = app.report(&admin, "Pothole", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_report_with_photo_is_served_back() {
    let app = setup().await;
    let alice = app.citizen("alice").await;

    let (status, body) = app.report(&alice, "Leaking hydrant", Some(PNG_BYTES)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["issue"]["status"], "reported");
    assert_eq!(body["issue"]["latitude"], 40.7128);
    assert!(body["issue"]["longitude"].is_null());

    let key = body["issue"]["photo"].as_str().unwrap().to_string();
    assert!(key.ends_with(".png"));

    let req = Request::builder()
        .uri(format!("/photos/{}", key))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], PNG_BYTES);
}

#[tokio::test]
async fn test_report_rejects_non_image_photo() {
    let app = setup().await;
    let alice = app.citizen("alice").await;

    let (status, _) = app
        .report(&alice, "Broken light", Some(b"definitely not an image"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, dashboard) = app.get("/dashboard/", Some(&alice)).await;
    assert_eq!(dashboard["total_count"], 0);
}

#[tokio::test]
async fn test_report_rejects_oversized_photo() {
    let app = setup().await;
    let alice = app.citizen("alice").await;

    // Within the request body limit, over the photo size limit
    let mut photo = PNG_BYTES.to_vec();
    photo.resize(app.ctx.photos.max_size() + 1, 0);

    let (status, body) = app.report(&alice, "Huge photo", Some(&photo)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (_, dashboard) = app.get("/dashboard/", Some(&alice)).await;
    assert_eq!(dashboard["total_count"], 0);
}

#[tokio::test]
async fn test_issue_list_filters_by_status() {
    let app = setup().await;
    let admin = app.admin().await;
    let alice = app.citizen("alice").await;
    let roads = app.create_department(&admin, "Roads").await;

    let first = app.report_issue(&alice, "Pothole").await;
    app.report_issue(&alice, "Graffiti").await;

    let (status, _) = app
        .post_json(
            &format!("/superadmin/assign-department/{}/", first),
            Some(&admin),
            json!({ "department_id": roads }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/issues/", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["issues"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Graffiti", "Pothole"]);

    let (_, body) = app.get("/issues/?status=acknowledged", Some(&alice)).await;
    assert_eq!(body["issues"].as_array().unwrap().len(), 1);
    assert_eq!(body["issues"][0]["department_name"], "Roads");
    assert_eq!(body["selected_status"], "acknowledged");

    let (status, _) = app.get("/issues/?status=closed", Some(&alice)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_assignment_requires_department_selection() {
    let app = setup().await;
    let admin = app.admin().await;
    let alice = app.citizen("alice").await;
    let issue = app.report_issue(&alice, "Pothole").await;

    let (status, body) = app
        .post_json(
            &format!("/superadmin/assign-department/{}/", issue),
            Some(&admin),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Please select a department."));
    assert_eq!(app.issue_status(issue).await, "reported");

    let (status, _) = app
        .post_json(
            &format!("/superadmin/assign-department/{}/", issue),
            Some(&alice),
            json!({ "department_id": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_resolver_status_update_flow() {
    let app = setup().await;
    let admin = app.admin().await;
    let alice = app.citizen("alice").await;
    let roads = app.create_department(&admin, "Roads").await;
    let parks = app.create_department(&admin, "Parks").await;
    let road_crew = app.resolver_in(&admin, roads, "roadcrew").await;
    let park_crew = app.resolver_in(&admin, parks, "parkcrew").await;

    let issue = app.report_issue(&alice, "Pothole").await;
    app.post_json(
        &format!("/superadmin/assign-department/{}/", issue),
        Some(&admin),
        json!({ "department_id": roads }),
    )
    .await;
    assert_eq!(app.issue_status(issue).await, "acknowledged");

    // Another department's resolver is redirected without a change
    let path = format!("/update-issue-status/{}/", issue);
    let req = Request::builder()
        .method("POST")
        .uri(&path)
        .header(header::AUTHORIZATION, format!("Bearer {}", park_crew))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "status": "resolved" }).to_string()))
        .unwrap();
    let response = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/department/");
    assert_eq!(app.issue_status(issue).await, "acknowledged");

    // Statuses a resolver may not set are ignored
    let req = Request::builder()
        .method("POST")
        .uri(&path)
        .header(header::AUTHORIZATION, format!("Bearer {}", road_crew))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "status": "reported" }).to_string()))
        .unwrap();
    let response = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.issue_status(issue).await, "acknowledged");

    let req = Request::builder()
        .method("POST")
        .uri(&path)
        .header(header::AUTHORIZATION, format!("Bearer {}", road_crew))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "status": "in_progress" }).to_string()))
        .unwrap();
    let response = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.issue_status(issue).await, "in_progress");

    let (status, body) = app.get("/department/", Some(&road_crew)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["departments"][0]["name"], "Roads");
    assert_eq!(body["issues"].as_array().unwrap().len(), 1);

    let (_, body) = app.get("/department/", Some(&park_crew)).await;
    assert!(body["issues"].as_array().unwrap().is_empty());

    // Citizens cannot update statuses at all
    let (status, _) = app
        .post_json(&path, Some(&alice), json!({ "status": "resolved" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_vote_toggle() {
    let app = setup().await;
    let alice = app.citizen("alice").await;
    let bob = app.citizen("bob").await;
    let issue = app.report_issue(&alice, "Pothole").await;
    let path = format!("/vote/{}/", issue);

    let (status, body) = app.post_json(&path, Some(&bob), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "voted": true, "vote_count": 1 }));

    let (_, body) = app.post_json(&path, Some(&alice), json!({})).await;
    assert_eq!(body["vote_count"], 2);

    let (_, body) = app.post_json(&path, Some(&bob), json!({})).await;
    assert_eq!(body, json!({ "success": true, "voted": false, "vote_count": 1 }));

    let (_, body) = app.get(&format!("/issues/{}/", issue), Some(&alice)).await;
    assert_eq!(body["issue"]["vote_count"], 1);
    assert_eq!(body["issue"]["user_has_voted"], true);

    let (status, body) = app.post_json("/vote/9999/", Some(&bob), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "success": false, "error": "Issue not found" }));
}

#[tokio::test]
async fn test_comment_thread() {
    let app = setup().await;
    let alice = app.citizen("alice").await;
    let bob = app.citizen("bob").await;
    let issue = app.report_issue(&alice, "Pothole").await;

    let (status, body) = app
        .post_json(
            &format!("/issues/{}/comment/", issue),
            Some(&bob),
            json!({ "content": "Same on my street" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let parent = body["comment"]["id"].as_i64().unwrap();

    let (status, _) = app
        .post_json(
            &format!("/issues/{}/comment/{}/", issue, parent),
            Some(&alice),
            json!({ "content": "Thanks for confirming" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .post_json(
            &format!("/issues/{}/comment/", issue),
            Some(&bob),
            json!({ "content": "   " }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get(&format!("/issues/{}/", issue), None).await;
    let comments = body["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["username"], "bob");
    assert_eq!(comments[0]["replies"][0]["content"], "Thanks for confirming");
}

#[tokio::test]
async fn test_fake_issue_removal_bans_reporter() {
    let app = setup().await;
    let admin = app.admin().await;
    let alice = app.citizen("alice").await;
    let issue = app.report_issue(&alice, "Alien landing").await;

    let (status, body) = app
        .post_json(&format!("/issues/{}/delete_fake/", issue), Some(&alice), json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{}", body);

    let (status, body) = app
        .post_json(&format!("/issues/{}/delete_fake/", issue), Some(&admin), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(
        body["message"],
        "Issue deleted and user alice has been banned for 7 days."
    );

    let (status, _) = app.get(&format!("/issues/{}/", issue), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The live session is cut off, logout still works
    let (status, body) = app.get("/dashboard/", Some(&alice)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "AccountBanned");

    let (status, _) = app.get("/logout/", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post_json(
            "/login/",
            None,
            json!({ "username": "alice", "password": "correct-horse" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("more days for reporting a fake issue."));

    let (_, body) = app.get("/superadmin/audit/", Some(&admin)).await;
    assert_eq!(body["entries"][0]["action"], "issue.delete_fake");
}

#[tokio::test]
async fn test_moderator_ban_and_unban() {
    let app = setup().await;
    let admin = app.admin().await;
    let alice = app.citizen("alice").await;
    let alice_id = app
        .ctx
        .account_manager
        .get_user_by_username("alice")
        .await
        .unwrap()
        .unwrap()
        .id;

    let (status, _) = app.get("/manage-users/", Some(&alice)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post_json(&format!("/ban-user/{}/", alice_id), Some(&admin), json!({ "days": 0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post_json(
            &format!("/ban-user/{}/", alice_id),
            Some(&admin),
            json!({ "days": 1_000_000_000i64 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, _) = app.get("/dashboard/", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post_json(&format!("/ban-user/{}/", alice_id), Some(&admin), json!({ "days": 3 }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (status, _) = app.get("/dashboard/", Some(&alice)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post_json(&format!("/unban-user/{}/", alice_id), Some(&admin), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/dashboard/", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/manage-users/", Some(&admin)).await;
    assert_eq!(body["citizens"][0]["username"], "alice");
    assert_eq!(body["citizens"][0]["is_banned"], false);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = setup().await;
    let alice = app.citizen("alice").await;

    let (status, _) = app.get("/logout/", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/dashboard/", Some(&alice)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_department_admin_cannot_manage_two_departments() {
    let app = setup().await;
    let admin = app.admin().await;
    let roads = app.create_department(&admin, "Roads").await;
    let parks = app.create_department(&admin, "Parks").await;

    let (status, _) = app
        .post_json("/superadmin/departments/", Some(&admin), json!({ "name": "Roads" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let lead = app
        .ctx
        .account_manager
        .create_account(NewAccount {
            username: "lead".to_string(),
            email: "lead@example.com".to_string(),
            phone: None,
            password: "lead-password".to_string(),
            roles: RoleFlags::resolver(),
        })
        .await
        .unwrap();

    let (status, body) = app
        .post_json(
            &format!("/superadmin/departments/{}/", roads),
            Some(&admin),
            json!({ "action": "assign_admin", "admin_user_id": lead.id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["admin"]["username"], "lead");

    let (status, _) = app
        .post_json(
            &format!("/superadmin/departments/{}/", parks),
            Some(&admin),
            json!({ "action": "assign_admin", "admin_user_id": lead.id }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app.get("/superadmin/departments/", Some(&admin)).await;
    let names: Vec<&str> = body["departments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Parks", "Roads"]);
}

#[tokio::test]
async fn test_home_and_reports() {
    let app = setup().await;
    let admin = app.admin().await;
    let alice = app.citizen("alice").await;
    let roads = app.create_department(&admin, "Roads").await;

    let first = app.report_issue(&alice, "Pothole").await;
    app.report_issue(&alice, "Graffiti").await;
    app.post_json(
        &format!("/superadmin/assign-department/{}/", first),
        Some(&admin),
        json!({ "department_id": roads }),
    )
    .await;

    let (status, body) = app.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_issues"], 2);
    assert_eq!(body["resolved_issues"], 0);
    assert_eq!(body["total_departments"], 1);
    assert_eq!(body["recent_issues"].as_array().unwrap().len(), 2);

    let (status, _) = app.get("/reports/", Some(&alice)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get("/reports/", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status_counts"].as_array().unwrap().len(), 4);
    assert_eq!(body["top_departments"][0]["name"], "Roads");
    assert_eq!(body["top_citizens"][0]["name"], "alice");
    assert_eq!(body["top_citizens"][0]["count"], 2);
}
