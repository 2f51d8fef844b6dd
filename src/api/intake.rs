use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;

use crate::{
    error::Result,
    intake::{
        ClientInfo, ContactOutcome, ContactService, ContactStore, Registration, SignUpOutcome,
        SupabaseAuth,
    },
    state::AppState,
};

/// 配置联系表单与预注册路由。
///
/// - `POST /contact`：使用给定的联系表单服务
/// - `POST /pre-register`
pub fn setup_route<S>(contacts: Arc<ContactService<S>>) -> Router<AppState>
where
    S: ContactStore + 'static,
{
    Router::new()
        .route("/pre-register", post(pre_register))
        .merge(
            Router::new()
                .route("/contact", post(contact::<S>))
                .with_state::<AppState>(contacts),
        )
}

/// 联系表单
///
/// 受理返回 201，命中蜜罐返回 200 且不写入。
async fn contact<S: ContactStore>(
    State(service): State<Arc<ContactService<S>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let client = ClientInfo::from_headers(&headers);

    let resp = match service.submit(&client, &body).await? {
        ContactOutcome::Dropped => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        ContactOutcome::Accepted { remaining } => {
            let mut resp = (
                StatusCode::CREATED,
                Json(json!({ "ok": true, "message": "お問い合わせを受け付けました。" })),
            )
                .into_response();
            resp.headers_mut()
                .insert("x-ratelimit-remaining", HeaderValue::from(remaining));
            resp
        }
    };
    Ok(resp)
}

/// 预注册
///
/// 账号已存在时同样返回 `{ok: true}`，不泄露账号是否存在。
async fn pre_register(
    State(registration): State<Arc<Registration<SupabaseAuth>>>,
    body: Bytes,
) -> Result<Response> {
    let resp = match registration.register(&body).await? {
        SignUpOutcome::AlreadyExists => {
            (StatusCode::OK, Json(json!({ "ok": true }))).into_response()
        }
        SignUpOutcome::Created { user_id } => (
            StatusCode::CREATED,
            Json(json!({ "ok": true, "userId": user_id })),
        )
            .into_response(),
    };
    Ok(resp)
}
