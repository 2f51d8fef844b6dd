mod intake;
mod pages;
mod revalidate;
mod syndication;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::{
    cms::SanityClient,
    error::Result,
    intake::{ContactService, ContactStore},
    loader::Loader,
    state::AppState,
};

/// 处理函数使用的请求级数据入口
pub type PageLoader = Loader<SanityClient>;

/// 设置应用的路由。
///
/// 页面数据、联系表单与缓存失效接口挂在 `/api` 下，订阅源等挂在根路径。
pub fn setup_route(state: AppState) -> Router {
    let contacts = state.contacts().clone();
    setup_route_with_contacts(state, contacts)
}

/// 与 [`setup_route`] 相同，但联系表单写入给定的服务
pub fn setup_route_with_contacts<S>(state: AppState, contacts: Arc<ContactService<S>>) -> Router
where
    S: ContactStore + 'static,
{
    Router::new()
        .nest(
            "/api",
            pages::setup_route()
                .merge(intake::setup_route(contacts))
                .merge(revalidate::setup_route()),
        )
        .merge(syndication::setup_route())
        .with_state(state)
}

/// 启动 HTTP 服务，并使用给定的路由处理请求。
#[instrument(name = "http server", skip_all, fields(listen = %listen))]
pub async fn run_server_with_router(router: Router, listen: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen).await?;

    tracing::info!("listening on {listen}");

    axum::serve(listener, router).await?;
    Ok(())
}

/// 启动 HTTP 服务，自动设置路由和中间件。
///
/// 1. 生成路由
/// 2. 添加日志和追踪中间件
/// 3. 启动服务器
pub async fn run_server(state: AppState) -> Result<()> {
    let listen = state.config().listen.clone();
    let router = setup_route(state);
    let router = add_middlewares(router);
    run_server_with_router(router, &listen).await
}

/// 为路由添加中间件，包括请求追踪和失败日志记录。
fn add_middlewares(router: Router) -> Router {
    fn log_failure(
        err: tower_http::classify::ServerErrorsFailureClass,
        _latency: std::time::Duration,
        _span: &tracing::Span,
    ) {
        tracing::error!(error = %err, "request failed");
    }

    router.layer(
        TraceLayer::new_for_http()
            .on_failure(log_failure)
            .on_request(|_req: &_, _span: &tracing::Span| {}),
    )
}
