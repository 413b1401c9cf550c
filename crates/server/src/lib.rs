//! Session gateway: WebSocket termination, routing, and fan-out.
//!
//! Each connection authenticates with a bearer token before anything
//! else, then multiplexes channel subscriptions over one socket. Game
//! and chat traffic is routed onto table actor inboxes tagged with the
//! authenticated identity; actor broadcasts come back through per-table
//! fanout tasks that apply view masks per recipient.
//!
//! ## Modules
//!
//! - [`session`] — Session registry, channels, rate limiting
//! - [`fanout`] — Per-table broadcast resolution and masking
//! - [`ws`] — The WebSocket handler itself

pub mod fanout;
pub mod session;
pub mod ws;

use actix_cors::Cors;
use actix_web::App;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::HttpServer;
use actix_web::Responder;
use actix_web::middleware::Logger;
use actix_web::web;
use rvb_auth::Claims;
use rvb_auth::Verifier;
use rvb_core::TableId;
use rvb_database::Store;
use rvb_gameroom::Bankroll;
use rvb_gameroom::TableConfig;
use rvb_hosting::Floor;
use session::Sessions;
use std::sync::Arc;

/// Chips granted to unseen players by the in-process dev wallet.
const DEV_BANKROLL: rvb_core::Chips = 1_000_000;

/// Shared state behind every route.
pub struct AppState {
    pub floor: Arc<Floor>,
    pub sessions: Arc<Sessions>,
    pub verifier: Arc<Verifier>,
}

async fn health() -> impl Responder {
    HttpResponse::Ok().body("ok")
}

#[derive(serde::Deserialize)]
struct ListQuery {
    filter: Option<String>,
}

async fn list_tables(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> impl Responder {
    let tables = state.floor.list(query.filter.as_deref()).await;
    HttpResponse::Ok().json(tables)
}

#[derive(serde::Serialize)]
struct Created {
    id: TableId,
}

async fn create_table(
    req: HttpRequest,
    state: web::Data<AppState>,
    config: web::Json<TableConfig>,
) -> actix_web::Result<HttpResponse> {
    let claims = bearer(&req, &state.verifier)?;
    let (id, outbound) = state
        .floor
        .create(config.into_inner())
        .await
        .map_err(actix_web::error::ErrorBadRequest)?;
    fanout::spawn(id, outbound, state.sessions.clone(), state.floor.clone());
    log::info!("[gateway] {} opened table {}", claims.player(), id);
    Ok(HttpResponse::Ok().json(Created { id }))
}

#[derive(serde::Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum AdminRequest {
    Pause,
    Resume,
    Kick { player_id: rvb_core::PlayerId },
}

/// Admin surface for a running table, behind the admin role claim.
async fn admin_table(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<uuid::Uuid>,
    body: web::Json<AdminRequest>,
) -> actix_web::Result<HttpResponse> {
    let claims = bearer(&req, &state.verifier)?;
    if !claims.is_admin() {
        return Err(actix_web::error::ErrorForbidden("admin role required"));
    }
    let id = TableId::from(path.into_inner());
    let Some(handle) = state.floor.handle(id).await else {
        return Err(actix_web::error::ErrorNotFound("no such table"));
    };
    let command = match body.into_inner() {
        AdminRequest::Pause => rvb_gameroom::AdminCommand::Pause,
        AdminRequest::Resume => rvb_gameroom::AdminCommand::Resume,
        AdminRequest::Kick { player_id } => rvb_gameroom::AdminCommand::Kick(player_id),
    };
    handle
        .send(rvb_gameroom::Message::Admin(command))
        .map_err(|_| actix_web::error::ErrorServiceUnavailable("table is busy, retry"))?;
    Ok(HttpResponse::Ok().finish())
}

/// Decodes the `Authorization: Bearer` header or answers 401.
fn bearer(req: &HttpRequest, verifier: &Verifier) -> actix_web::Result<Claims> {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| actix_web::error::ErrorUnauthorized("missing authorization header"))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| actix_web::error::ErrorUnauthorized("invalid authorization format"))?;
    verifier
        .verify(token)
        .map_err(|_| actix_web::error::ErrorUnauthorized("invalid token"))
}

/// Boots the gateway: rehydrates persisted tables, wires their fanout,
/// and serves HTTP + WebSocket on `bind`.
pub async fn run(bind: &str, store: Arc<dyn Store>) -> std::io::Result<()> {
    let verifier = Arc::new(Verifier::from_env().map_err(std::io::Error::other)?);
    let wallet = Arc::new(Bankroll::new(DEV_BANKROLL));
    let floor = Arc::new(Floor::new(store, wallet));
    let sessions = Arc::new(Sessions::default());
    let revived = floor
        .rehydrate()
        .await
        .map_err(std::io::Error::other)?;
    for (id, outbound) in revived {
        fanout::spawn(id, outbound, sessions.clone(), floor.clone());
    }
    let state = web::Data::new(AppState {
        floor,
        sessions,
        verifier,
    });
    log::info!("starting gateway on {}", bind);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%r %s %Ts"))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header(),
            )
            .app_data(state.clone())
            .route("/health", web::get().to(health))
            .route("/tables", web::get().to(list_tables))
            .route("/tables", web::post().to(create_table))
            .route("/tables/{id}/admin", web::post().to(admin_table))
            .route("/ws", web::get().to(ws::endpoint))
    })
    .bind(bind)?
    .run()
    .await
}
