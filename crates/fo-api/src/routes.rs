//! API routes

use axum::{
    extract::State,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde::Serialize;

use crate::extractors::AppState;
use crate::handlers::{
    activity, attachments, auth, clients, dashboard, employees, leave, lookups, notifications, resources, roles,
    templates, users, work_orders,
};

/// Create the complete API router
pub fn router() -> Router<AppState> {
    Router::new().nest("/api/v1", api_v1_router())
}

fn api_v1_router() -> Router<AppState> {
    Router::new()
        .route("/", get(api_root))
        .nest("/auth", auth_router())
        .nest("/work-orders", work_orders_router())
        .nest("/clients", clients_router())
        .nest("/materials", materials_router())
        .nest("/employees", employees_router())
        .nest("/leave-requests", leave_router())
        .nest("/resources", resources_router())
        .nest("/users", users_router())
        .nest("/roles", roles_router())
        .route("/permissions", get(roles::list_permissions))
        .nest("/lookups", lookups_router())
        .nest("/document-templates", templates_router())
        .nest("/attachments", attachments_router())
        .nest("/notifications", notifications_router())
        .nest("/activity-logs", activity_router())
        .route("/dashboard/summary", get(dashboard::summary))
}

fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/change-password", post(auth::change_password))
}

fn work_orders_router() -> Router<AppState> {
    Router::new()
        .route("/", get(work_orders::list_work_orders).post(work_orders::create_work_order))
        .route(
            "/:id",
            get(work_orders::get_work_order)
                .patch(work_orders::update_work_order)
                .delete(work_orders::delete_work_order),
        )
        .route("/:id/status", post(work_orders::change_status))
        .route("/:id/progress", patch(work_orders::update_progress))
        .route("/:id/assign", post(work_orders::assign))
        .route(
            "/:id/resources",
            get(work_orders::list_resources).post(work_orders::assign_resource),
        )
        .route(
            "/:id/resources/:assignment_id/release",
            post(work_orders::release_resource),
        )
}

fn clients_router() -> Router<AppState> {
    Router::new()
        .route("/", get(clients::list_clients).post(clients::create_client))
        .route(
            "/:id",
            get(clients::get_client)
                .patch(clients::update_client)
                .delete(clients::delete_client),
        )
        .route("/:id/contacts", get(clients::list_contacts).post(clients::create_contact))
        .route(
            "/:id/contacts/:contact_id",
            patch(clients::update_contact).delete(clients::delete_contact),
        )
        .route(
            "/:id/materials",
            get(clients::list_materials).post(clients::create_material),
        )
}

fn materials_router() -> Router<AppState> {
    Router::new().route(
        "/:id",
        get(clients::get_material)
            .patch(clients::update_material)
            .delete(clients::delete_material),
    )
}

fn employees_router() -> Router<AppState> {
    Router::new()
        .route("/", get(employees::list_employees).post(employees::create_employee))
        .route(
            "/:id",
            get(employees::get_employee)
                .patch(employees::update_employee)
                .delete(employees::delete_employee),
        )
        .route("/:id/terminate", post(employees::terminate_employee))
}

fn leave_router() -> Router<AppState> {
    Router::new()
        .route("/", get(leave::list_leave_requests).post(leave::submit_leave_request))
        .route("/:id", get(leave::get_leave_request))
        .route("/:id/approve", post(leave::approve_leave_request))
        .route("/:id/reject", post(leave::reject_leave_request))
        .route("/:id/cancel", post(leave::cancel_leave_request))
}

fn resources_router() -> Router<AppState> {
    Router::new()
        .route("/", get(resources::list_resources).post(resources::create_resource))
        .route(
            "/:id",
            get(resources::get_resource)
                .patch(resources::update_resource)
                .delete(resources::delete_resource),
        )
        .route("/:id/status", post(resources::set_resource_status))
}

fn users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route(
            "/:id",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::deactivate_user),
        )
        .route("/:id/roles", put(users::set_user_roles))
}

fn roles_router() -> Router<AppState> {
    Router::new()
        .route("/", get(roles::list_roles).post(roles::create_role))
        .route(
            "/:id",
            get(roles::get_role).patch(roles::update_role).delete(roles::delete_role),
        )
}

fn lookups_router() -> Router<AppState> {
    Router::new()
        .route("/:kind", get(lookups::list_lookups).post(lookups::create_lookup))
        .route(
            "/:kind/:id",
            patch(lookups::update_lookup).delete(lookups::delete_lookup),
        )
}

fn templates_router() -> Router<AppState> {
    Router::new()
        .route("/", get(templates::list_templates).post(templates::create_template))
        .route(
            "/:id",
            get(templates::get_template)
                .patch(templates::update_template)
                .delete(templates::delete_template),
        )
        .route("/:id/render", post(templates::render_template))
}

// The first segment is a container type for listing and uploading and an
// attachment id everywhere else; the router needs one name for both.
fn attachments_router() -> Router<AppState> {
    Router::new()
        .route(
            "/:target/:container_id",
            get(attachments::list_attachments).post(attachments::upload_attachment),
        )
        .route("/:target/content", get(attachments::download_attachment))
        .route("/:target", delete(attachments::delete_attachment))
}

fn notifications_router() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::list_notifications))
        .route("/unread-count", get(notifications::unread_count))
        .route("/read-all", post(notifications::mark_all_read))
        .route("/stream", get(notifications::stream))
        .route("/:id/read", post(notifications::mark_read))
}

fn activity_router() -> Router<AppState> {
    Router::new()
        .route("/", get(activity::list_activity))
        .route("/client-errors", post(activity::report_client_error))
}

async fn api_root(State(state): State<AppState>) -> Json<ApiRoot> {
    Json(ApiRoot {
        type_name: "Root",
        instance_name: state.config.instance.app_title.clone(),
        core_version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRoot {
    #[serde(rename = "_type")]
    type_name: &'static str,
    instance_name: String,
    core_version: &'static str,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use fo_attachments::MemoryStorage;
    use fo_core::config::AppConfig;
    use fo_db::Stores;
    use fo_services::{AdminAccount, Seeder};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    const PASSWORD: &str = "s3cret-pass";

    async fn app() -> Router {
        app_with(AppConfig::default()).await
    }

    async fn app_with(config: AppConfig) -> Router {
        let stores = Stores::memory();
        let seeder = Seeder::new(stores.clone());
        seeder.run().await.unwrap();
        seeder
            .create_admin(AdminAccount {
                username: "admin".into(),
                email: "admin@example.com".into(),
                password: PASSWORD.into(),
            })
            .await
            .unwrap();

        let state = AppState::new(config, stores, Arc::new(MemoryStorage::new()));
        router().with_state(state)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn login(app: &Router) -> String {
        login_as(app, "admin", PASSWORD).await
    }

    async fn login_as(app: &Router, username: &str, password: &str) -> String {
        let (status, body) = send(
            app,
            json_request(
                "POST",
                "/api/v1/auth/login",
                None,
                json!({ "username": username, "password": password }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["accessToken"].as_str().unwrap().to_string()
    }

    const BOUNDARY: &str = "fieldops-boundary";

    fn multipart_request(uri: &str, token: &str, file_name: &str, content: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: text/plain\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn create_work_order(app: &Router, token: &str) -> i64 {
        let (status, client) = send(
            app,
            json_request("POST", "/api/v1/clients", Some(token), json!({ "code": "acme", "name": "Acme Ltd" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, order) = send(
            app,
            json_request(
                "POST",
                "/api/v1/work-orders",
                Some(token),
                json!({ "title": "Replace pump", "clientId": client["id"] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        order["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_root_is_public() {
        let app = app().await;
        let (status, body) = send(&app, get_request("/api/v1", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["_type"], "Root");
        assert_eq!(body["instanceName"], "FieldOps");
    }

    #[tokio::test]
    async fn test_login_and_me() {
        let app = app().await;
        let token = login(&app).await;

        let (status, body) = send(&app, get_request("/api/v1/auth/me", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "admin");
        assert_eq!(body["isAdmin"], true);
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let app = app().await;
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/auth/login",
                None,
                json!({ "username": "admin", "password": "wrong-pass1" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["_type"], "Error");
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let app = app().await;
        let (status, body) = send(&app, get_request("/api/v1/clients", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["errorIdentifier"]
            .as_str()
            .unwrap()
            .starts_with("urn:fieldops:api:v1:errors:"));
    }

    #[tokio::test]
    async fn test_client_create_and_duplicate_code() {
        let app = app().await;
        let token = login(&app).await;
        let client = json!({ "code": "acme", "name": "Acme Ltd" });

        let (status, body) = send(&app, json_request("POST", "/api/v1/clients", Some(&token), client.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["code"], "ACME");

        let (status, body) = send(&app, json_request("POST", "/api/v1/clients", Some(&token), client)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["errors"]["code"].is_array());

        let (status, body) = send(&app, get_request("/api/v1/clients", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
    }

    #[tokio::test]
    async fn test_unknown_record_is_not_found() {
        let app = app().await;
        let token = login(&app).await;
        let (status, body) = send(&app, get_request("/api/v1/work-orders/9999", Some(&token))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["_type"], "Error");
    }

    #[tokio::test]
    async fn test_unknown_lookup_kind_is_not_found() {
        let app = app().await;
        let token = login(&app).await;
        let (status, _) = send(&app, get_request("/api/v1/lookups/colours", Some(&token))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, get_request("/api/v1/lookups/leave_status", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(4));
    }

    #[tokio::test]
    async fn test_client_error_report_is_accepted() {
        let app = app().await;
        let token = login(&app).await;
        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/activity-logs/client-errors",
                Some(&token),
                json!({ "message": "TypeError: x is undefined", "url": "/work-orders" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (status, body) = send(
            &app,
            get_request("/api/v1/activity-logs?entityType=Client", Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["_type"], "Collection");
    }

    #[tokio::test]
    async fn test_deactivated_user_token_stops_working() {
        let app = app().await;
        let admin = login(&app).await;

        let (status, created) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/users",
                Some(&admin),
                json!({
                    "username": "jtech",
                    "email": "jtech@example.com",
                    "firstName": "Jo",
                    "lastName": "Technician",
                    "password": "field-tech-9",
                    "roles": ["Manager"]
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let token = login_as(&app, "jtech", "field-tech-9").await;

        let (status, _) = send(&app, get_request("/api/v1/auth/me", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);

        let uri = format!("/api/v1/users/{}", created["id"]);
        let (status, _) = send(&app, json_request("DELETE", &uri, Some(&admin), Value::Null)).await;
        assert!(status.is_success());

        let (status, body) = send(&app, get_request("/api/v1/auth/me", Some(&token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["_type"], "Error");
        let (status, _) = send(
            &app,
            json_request("POST", "/api/v1/clients", Some(&token), json!({ "code": "late", "name": "Too Late" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_duplicate_material_code() {
        let app = app().await;
        let token = login(&app).await;
        let (_, client) = send(
            &app,
            json_request("POST", "/api/v1/clients", Some(&token), json!({ "code": "acme", "name": "Acme Ltd" })),
        )
        .await;
        let uri = format!("/api/v1/clients/{}/materials", client["id"]);
        let material = json!({ "code": "cem-01", "name": "Cement", "unit": "kg" });

        let (status, body) = send(&app, json_request("POST", &uri, Some(&token), material.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["code"], "CEM-01");

        let (status, body) = send(&app, json_request("POST", &uri, Some(&token), material)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["errors"]["code"].is_array());
    }

    #[tokio::test]
    async fn test_patch_null_clears_and_missing_keeps() {
        let app = app().await;
        let token = login(&app).await;
        let (status, client) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/clients",
                Some(&token),
                json!({ "code": "acme", "name": "Acme Ltd", "phone": "+31 20 555 0100" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let uri = format!("/api/v1/clients/{}", client["id"]);

        let (status, body) = send(&app, json_request("PATCH", &uri, Some(&token), json!({ "name": "Acme Group" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Acme Group");
        assert_eq!(body["phone"], "+31 20 555 0100");

        let (status, body) = send(&app, json_request("PATCH", &uri, Some(&token), json!({ "phone": null }))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["phone"].is_null());
        assert_eq!(body["name"], "Acme Group");
    }

    #[tokio::test]
    async fn test_attachment_upload_download_delete() {
        let app = app().await;
        let token = login(&app).await;
        let order_id = create_work_order(&app, &token).await;

        let uri = format!("/api/v1/attachments/work_order/{}", order_id);
        let (status, attachment) = send(&app, multipart_request(&uri, &token, "notes.txt", b"site notes")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(attachment["fileName"], "notes.txt");
        assert_eq!(attachment["size"], 10);

        let (status, listed) = send(&app, get_request(&uri, Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().map(Vec::len), Some(1));

        let content_uri = format!("/api/v1/attachments/{}/content", attachment["id"]);
        let response = app
            .clone()
            .oneshot(get_request(&content_uri, Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("notes.txt"));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"site notes");

        let delete_uri = format!("/api/v1/attachments/{}", attachment["id"]);
        let (status, _) = send(&app, json_request("DELETE", &delete_uri, Some(&token), Value::Null)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, get_request(&content_uri, Some(&token))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let mut config = AppConfig::default();
        config.storage.max_file_size = 8;
        let app = app_with(config).await;
        let token = login(&app).await;
        let order_id = create_work_order(&app, &token).await;

        let uri = format!("/api/v1/attachments/work_order/{}", order_id);
        let (status, body) = send(&app, multipart_request(&uri, &token, "big.txt", b"more than eight bytes")).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["_type"], "Error");

        let (_, listed) = send(&app, get_request(&uri, Some(&token))).await;
        assert_eq!(listed.as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn test_executable_upload_is_rejected() {
        let app = app().await;
        let token = login(&app).await;
        let order_id = create_work_order(&app, &token).await;

        let uri = format!("/api/v1/attachments/work_order/{}", order_id);
        let (status, body) = send(&app, multipart_request(&uri, &token, "setup.exe", b"MZ")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["errors"]["contentType"].is_array());
    }

    #[tokio::test]
    async fn test_notification_stream_requires_token_and_upgrade() {
        let app = app().await;
        let upgrade = |uri: &str| {
            Request::builder()
                .uri(uri)
                .header(header::CONNECTION, "upgrade")
                .header(header::UPGRADE, "websocket")
                .header(header::SEC_WEBSOCKET_VERSION, "13")
                .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==")
                .body(Body::empty())
                .unwrap()
        };

        let (status, _) = send(&app, upgrade("/api/v1/notifications/stream")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, upgrade("/api/v1/notifications/stream?access_token=not-a-jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // A plain GET with a valid token is refused by the upgrade, not by auth
        let token = login(&app).await;
        let response = app
            .clone()
            .oneshot(get_request("/api/v1/notifications/stream", Some(&token)))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
        assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
