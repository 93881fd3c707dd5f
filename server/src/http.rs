use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{self, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
};
use axum_extra::extract::WithRejection;
use platform_api::{ApiError, ApiResponse, ApiResult, FieldIssue};
use platform_db::DbPool;
use products_hr::{EmployeeInput, EmployeeRecord, HrError, repository, search};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<AppConfig>,
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "employee server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    let cors = cors_layer(&state.config.cors_allowed_origins);
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/employees", get(list_employees).post(create_employee))
        .route("/employees/search", get(search_employees))
        .route(
            "/employees/department/{department}",
            get(employees_by_department),
        )
        .route("/employees/position/{position}", get(employees_by_position))
        .route(
            "/employees/{id}",
            get(get_employee).put(update_employee).delete(delete_employee),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

type JsonBody<T> = WithRejection<Json<T>, ApiError>;
type IdPath = WithRejection<Path<i32>, ApiError>;

#[derive(Debug, Deserialize)]
struct ListQuery {
    skip: Option<u64>,
    limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    keyword: String,
}

async fn create_employee(
    State(state): State<AppState>,
    WithRejection(Json(input), _): JsonBody<EmployeeInput>,
) -> ApiResult<(StatusCode, ApiResponse<EmployeeRecord>)> {
    let model = repository::create(&state.pool, input)
        .await
        .map_err(hr_error)?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Employee created successfully", model.into()),
    ))
}

async fn list_employees(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, ApiError>,
) -> ApiResult<ApiResponse<Vec<EmployeeRecord>>> {
    let skip = query.skip.unwrap_or(0);
    let limit = query.limit.unwrap_or(state.config.default_page_limit);
    let models = repository::list(&state.pool, skip, limit)
        .await
        .map_err(hr_error)?;
    Ok(ApiResponse::ok(
        "Employees retrieved successfully",
        records(models),
    ))
}

async fn get_employee(
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<ApiResponse<EmployeeRecord>> {
    let model = repository::get(&state.pool, id).await.map_err(hr_error)?;
    Ok(ApiResponse::ok(
        "Employee retrieved successfully",
        model.into(),
    ))
}

async fn update_employee(
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
    WithRejection(Json(input), _): JsonBody<EmployeeInput>,
) -> ApiResult<ApiResponse<EmployeeRecord>> {
    let model = repository::update(&state.pool, id, input)
        .await
        .map_err(hr_error)?;
    Ok(ApiResponse::ok("Employee updated successfully", model.into()))
}

async fn delete_employee(
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
) -> ApiResult<ApiResponse<()>> {
    repository::delete(&state.pool, id)
        .await
        .map_err(hr_error)?;
    Ok(ApiResponse::message("Employee deleted successfully"))
}

async fn search_employees(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<SearchQuery>, ApiError>,
) -> ApiResult<ApiResponse<Vec<EmployeeRecord>>> {
    let models = search::search_by_keyword(&state.pool, &query.keyword)
        .await
        .map_err(hr_error)?;
    Ok(ApiResponse::ok("Search completed successfully", records(models)))
}

async fn employees_by_department(
    State(state): State<AppState>,
    WithRejection(Path(department), _): WithRejection<Path<String>, ApiError>,
) -> ApiResult<ApiResponse<Vec<EmployeeRecord>>> {
    let models = search::find_by_department(&state.pool, &department)
        .await
        .map_err(hr_error)?;
    Ok(ApiResponse::ok(
        format!("Employees in {department} retrieved successfully"),
        records(models),
    ))
}

async fn employees_by_position(
    State(state): State<AppState>,
    WithRejection(Path(position), _): WithRejection<Path<String>, ApiError>,
) -> ApiResult<ApiResponse<Vec<EmployeeRecord>>> {
    let models = search::find_by_position(&state.pool, &position)
        .await
        .map_err(hr_error)?;
    Ok(ApiResponse::ok(
        format!("Employees with position {position} retrieved successfully"),
        records(models),
    ))
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "message": "Employee Management API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = state.pool.ping().await.is_ok();
    Json(HealthResponse {
        ok: db_ok,
        db_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    db_ok: bool,
    version: &'static str,
}

fn records<M: Into<EmployeeRecord>>(models: Vec<M>) -> Vec<EmployeeRecord> {
    models.into_iter().map(Into::into).collect()
}

fn hr_error(err: HrError) -> ApiError {
    let message = err.to_string();
    match err {
        HrError::Validation(errors) => ApiError::validation(
            errors
                .errors()
                .iter()
                .map(|err| FieldIssue::new(err.field.as_str(), err.message.clone()))
                .collect(),
        ),
        HrError::DuplicateEmail => ApiError::BadRequest(message),
        HrError::NotFound => ApiError::NotFound(message),
        HrError::Db(db_err) => ApiError::internal(db_err),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use migration::{Migrator, MigratorTrait};
    use platform_db::DatabaseSettings;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn test_router() -> Router {
        let settings = DatabaseSettings::new("sqlite::memory:");
        let pool = platform_db::connect(&settings).await.unwrap();
        Migrator::up(&pool, None).await.unwrap();
        let state = AppState {
            pool,
            config: Arc::new(AppConfig::for_database(settings)),
        };
        build_router(state)
    }

    async fn send(
        router: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn employee(first_name: &str, email: &str) -> Value {
        json!({
            "first_name": first_name,
            "last_name": "User",
            "email": email,
            "phone": "9876543210",
            "department": "Engineering",
            "position": "Software Engineer",
            "salary": 50000,
            "hire_date": "2024-01-15"
        })
    }

    async fn create(router: &Router, body: Value) -> (StatusCode, Value) {
        send(router, Method::POST, "/employees", Some(body)).await
    }

    #[tokio::test]
    async fn root_reports_service_name() {
        let router = test_router().await;
        let (status, body) = send(&router, Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Employee Management API");
    }

    #[tokio::test]
    async fn health_checks_the_database() {
        let router = test_router().await;
        let (status, body) = send(&router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["db_ok"], true);
    }

    #[tokio::test]
    async fn create_returns_201_with_record() {
        let router = test_router().await;
        let (status, body) = create(&router, employee("Test", "test@example.com")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Employee created successfully");
        let data = &body["data"];
        assert!(data["id"].as_i64().is_some());
        assert_eq!(data["email"], "test@example.com");
        assert_eq!(data["hire_date"], "2024-01-15");
        assert_eq!(data["salary"], 50000.0);
        assert!(data["created_at"].is_string());
        assert_eq!(data["updated_at"], Value::Null);
    }

    #[tokio::test]
    async fn invalid_fields_return_422_with_field_errors() {
        let router = test_router().await;
        let cases = [
            ("email", json!("notanemail")),
            ("phone", json!("123")),
            ("first_name", json!("A")),
            ("first_name", json!("string")),
            ("department", json!("string")),
            ("position", json!("string")),
            ("salary", json!(-1000)),
        ];
        for (index, (field, value)) in cases.into_iter().enumerate() {
            let mut body = employee("Test", &format!("case{index}@example.com"));
            body[field] = value;
            let (status, response) = create(&router, body).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{field}");
            assert_eq!(response["success"], false);
            assert_eq!(response["errors"][0]["field"], field);
        }
    }

    #[tokio::test]
    async fn malformed_json_uses_the_envelope() {
        let router = test_router().await;
        let mut body = employee("Test", "typed@example.com");
        body["salary"] = json!("lots");
        let (status, response) = create(&router, body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response["success"], false);
        assert_eq!(response["data"], Value::Null);
    }

    #[tokio::test]
    async fn duplicate_email_returns_400() {
        let router = test_router().await;
        let (status, _) = create(&router, employee("First", "same@example.com")).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = create(&router, employee("Second", "same@example.com")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Email already registered");
    }

    #[tokio::test]
    async fn duplicate_names_are_allowed() {
        let router = test_router().await;
        let (first, _) = create(&router, employee("Rajesh", "rajesh.one@example.com")).await;
        let (second, _) = create(&router, employee("Rajesh", "rajesh.two@example.com")).await;
        assert_eq!(first, StatusCode::CREATED);
        assert_eq!(second, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn get_list_update_delete_round_trip() {
        let router = test_router().await;
        let (_, created) = create(&router, employee("UpdateTest", "update@example.com")).await;
        let id = created["data"]["id"].as_i64().unwrap();
        let uri = format!("/employees/{id}");

        let (status, body) = send(&router, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["first_name"], "UpdateTest");

        let (status, body) = send(&router, Method::GET, "/employees?skip=0&limit=100", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (status, body) = send(
            &router,
            Method::PUT,
            &uri,
            Some(json!({"position": "Senior Developer", "salary": 80000})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["position"], "Senior Developer");
        assert_eq!(body["data"]["salary"], 80000.0);
        assert_eq!(body["data"]["department"], "Engineering");
        assert!(body["data"]["updated_at"].is_string());

        let (status, body) = send(&router, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Employee deleted successfully");

        let (status, _) = send(&router, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn oversized_paging_bounds_still_list() {
        let router = test_router().await;
        create(&router, employee("Paging", "paging@example.com")).await;
        let max = u64::MAX;

        let (status, body) =
            send(&router, Method::GET, &format!("/employees?limit={max}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (status, body) = send(
            &router,
            Method::GET,
            &format!("/employees?skip={max}&limit={max}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_employee_returns_404_everywhere() {
        let router = test_router().await;
        let (status, body) = send(&router, Method::GET, "/employees/99999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Employee not found");
        let (status, _) = send(
            &router,
            Method::PUT,
            "/employees/99999",
            Some(json!({"position": "Lead"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&router, Method::DELETE, "/employees/99999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_numeric_id_is_rejected() {
        let router = test_router().await;
        let (status, body) = send(&router, Method::GET, "/employees/abc", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn update_with_taken_email_returns_400() {
        let router = test_router().await;
        create(&router, employee("Taken", "taken@example.com")).await;
        let (_, other) = create(&router, employee("Other", "other@example.com")).await;
        let id = other["data"]["id"].as_i64().unwrap();
        let (status, _) = send(
            &router,
            Method::PUT,
            &format!("/employees/{id}"),
            Some(json!({"email": "taken@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn search_and_filters() {
        let router = test_router().await;
        create(&router, employee("Zyxwvut", "search@example.com")).await;
        let mut qa = employee("Quinn", "quinn@example.com");
        qa["department"] = json!("QA");
        qa["position"] = json!("Tester");
        create(&router, qa).await;

        let (status, body) =
            send(&router, Method::GET, "/employees/search?keyword=ZYXW", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Search completed successfully");
        let hits = body["data"].as_array().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["first_name"], "Zyxwvut");

        let (status, _) = send(&router, Method::GET, "/employees/search", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) =
            send(&router, Method::GET, "/employees/department/QA", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Employees in QA retrieved successfully");
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (_, body) = send(&router, Method::GET, "/employees/department/Sales", None).await;
        assert!(body["data"].as_array().unwrap().is_empty());

        let (_, body) = send(&router, Method::GET, "/employees/position/Tester", None).await;
        assert_eq!(body["data"][0]["email"], "quinn@example.com");
    }
}
