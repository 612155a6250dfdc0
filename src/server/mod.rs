//! HTTP surface and WebSocket upgrade.
//!
//! Three read-only JSON endpoints over short-lived room locks, plus
//! the `/ws` upgrade that bridges a socket to the dispatch layer. The
//! handshake may carry `?session=` to resume a disconnected session.

mod ws;

use crate::dispatch::World;
use crate::events::GameSummary;
use crate::events::PlayerPublic;
use crate::now_ms;
use crate::state::RoomId;
use crate::state::SessionId;
use crate::MAX_SEATED;
use actix_cors::Cors;
use actix_web::App;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::HttpServer;
use actix_web::Responder;
use actix_web::middleware::Logger;
use actix_web::web;
use serde::Serialize;
use std::sync::Arc;

pub struct Server;

impl Server {
    pub async fn run(world: Arc<World>) -> Result<(), std::io::Error> {
        let bind = world.config().bind.clone();
        let origins = world.config().cors_origins.clone();
        let state = web::Data::new(world);
        log::info!("listening on {}", bind);
        HttpServer::new(move || {
            let cors = match origins.as_slice() {
                [] => Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header(),
                origins => origins
                    .iter()
                    .fold(Cors::default(), |cors, origin| {
                        cors.allowed_origin(origin)
                    })
                    .allow_any_method()
                    .allow_any_header(),
            };
            App::new()
                .wrap(Logger::new("%r %s %Ts"))
                .wrap(cors)
                .app_data(state.clone())
                .route("/api/rooms", web::get().to(rooms))
                .route("/api/rooms/{room_id}", web::get().to(room_detail))
                .route("/api/health", web::get().to(health))
                .route("/ws", web::get().to(socket))
        })
        .workers(4)
        .bind(bind)?
        .run()
        .await
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomListing {
    room_id: RoomId,
    display_name: String,
    player_count: usize,
    spectator_count: usize,
    max_players: usize,
    game_status: crate::state::RoomStatus,
    can_join: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomDetail {
    #[serde(flatten)]
    listing: RoomListing,
    players: Vec<PlayerPublic>,
    spectators: Vec<PlayerPublic>,
    host_settings: crate::state::HostSettings,
    game_state: Option<GameSummary>,
}

async fn rooms(world: web::Data<Arc<World>>) -> impl Responder {
    let mut listings = Vec::new();
    for cell in world.rooms().values() {
        let cell = cell.lock().await;
        listings.push(listing(&cell.state));
    }
    listings.sort_by(|a: &RoomListing, b| a.room_id.as_str().cmp(b.room_id.as_str()));
    HttpResponse::Ok().json(listings)
}

async fn room_detail(world: web::Data<Arc<World>>, path: web::Path<String>) -> impl Responder {
    let id = RoomId::from(path.into_inner());
    match world.rooms().get(&id) {
        Some(cell) => {
            let cell = cell.lock().await;
            let rs = &cell.state;
            HttpResponse::Ok().json(RoomDetail {
                listing: listing(rs),
                players: rs
                    .room
                    .seated()
                    .iter()
                    .filter_map(|id| rs.players.get(id))
                    .map(PlayerPublic::from)
                    .collect(),
                spectators: rs
                    .room
                    .spectators()
                    .iter()
                    .filter_map(|id| rs.players.get(id))
                    .map(PlayerPublic::from)
                    .collect(),
                host_settings: rs.room.settings().clone(),
                game_state: rs
                    .game
                    .as_ref()
                    .filter(|g| !g.is_completed())
                    .map(GameSummary::from),
            })
        }
        None => HttpResponse::NotFound().json(serde_json::json!({
            "error": "room_not_found",
            "message": "no such room",
        })),
    }
}

async fn health(world: web::Data<Arc<World>>) -> impl Responder {
    let mut players = 0;
    let mut active_games = 0;
    for cell in world.rooms().values() {
        let cell = cell.lock().await;
        players += cell.state.players.len();
        if cell
            .state
            .game
            .as_ref()
            .map(|g| !g.is_completed())
            .unwrap_or(false)
        {
            active_games += 1;
        }
    }
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "uptimeMs": now_ms().saturating_sub(world.started_at()),
        "rooms": world.rooms().len(),
        "players": players,
        "sessions": world.session_count().await,
        "activeGames": active_games,
    }))
}

async fn socket(
    world: web::Data<Arc<World>>,
    query: web::Query<std::collections::HashMap<String, String>>,
    body: web::Payload,
    req: HttpRequest,
) -> impl Responder {
    let resume: Option<SessionId> = query.get("session").and_then(|s| SessionId::parse(s));
    match actix_ws::handle(&req, body) {
        Ok((response, session, stream)) => {
            let world = Arc::clone(world.get_ref());
            actix_web::rt::spawn(ws::bridge(world, session, stream, resume));
            response.map_into_left_body()
        }
        Err(e) => HttpResponse::InternalServerError()
            .body(e.to_string())
            .map_into_right_body(),
    }
}

fn listing(rs: &crate::state::RoomState) -> RoomListing {
    RoomListing {
        room_id: rs.room.id().clone(),
        display_name: rs.room.display_name().to_string(),
        player_count: rs.room.seated().len(),
        spectator_count: rs.room.spectators().len(),
        max_players: MAX_SEATED,
        game_status: rs.room.status(),
        can_join: !rs.room.is_full() && !rs.room.is_playing(),
    }
}
