use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{budgets, categories, expenses, receipts, reports, tags, user};
use engine::{Engine, ReceiptPipeline};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub pipeline: ReceiptPipeline,
    pub db: DatabaseConnection,
}

async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(auth_header) = auth_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Username.eq(auth_header.username()))
        .filter(user::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/expenses", get(expenses::list).post(expenses::create))
        .route(
            "/expenses/{id}",
            get(expenses::get_detail)
                .put(expenses::update)
                .delete(expenses::remove),
        )
        .route("/categories", get(categories::list).post(categories::create))
        .route("/categories/{id}", delete(categories::remove))
        .route("/tags", get(tags::list).post(tags::create))
        .route("/tags/{id}", delete(tags::remove))
        .route("/budgets", get(budgets::statuses).post(budgets::upsert))
        .route("/budgets/{id}", delete(budgets::remove))
        .route("/receipts", get(receipts::list).post(receipts::register))
        .route("/receipts/{id}", get(receipts::get_detail))
        .route("/receipts/{id}/extract", post(receipts::extract))
        .route("/receipts/{id}/commit", post(receipts::commit))
        .route("/reports", get(reports::get_report))
        .route("/reports/export", get(reports::export_csv))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(engine: Arc<Engine>, pipeline: ReceiptPipeline, db: DatabaseConnection) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, pipeline, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Arc<Engine>,
    pipeline: ReceiptPipeline,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine,
        pipeline,
        db,
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Arc<Engine>,
    pipeline: ReceiptPipeline,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, pipeline, db, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
