//! Demo host: JSON API over an in-memory store, kept in sync through the change feed.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default. Override with env: HOST, PORT.
//! Engine settings come from GROUP_COUNT, QUALIFIERS_PER_GROUP, GROUP_PARTITION.
//!
//! Every store write produces change events. They are pushed through a channel to a
//! background task which folds them into the in-memory tournament list and then lets the
//! progression engine generate the next stage or declare a winner.

use actix_web::{
    delete, get, post, put,
    web::{Data, Json, Path},
    App, HttpResponse, HttpServer, Responder,
};
use chrono::NaiveDate;
use pingpong_tournament::{
    apply_change, find_tournament, group_standings, maybe_advance, record_result, standings,
    start, ChangeEvent, EngineConfig, MatchResult, MemoryStore, Player, PlayerId,
    RatingCalculator, Store, StoreError, Tournament, TournamentError, TournamentFormat,
};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{RwLock, RwLockWriteGuard};
use tokio::sync::mpsc::{self, UnboundedSender};
use uuid::Uuid;

/// Store plus the realtime view derived from its change feed.
#[derive(Default)]
struct Host {
    store: MemoryStore,
    /// In-memory tournaments, only ever changed by applying change events.
    tournaments: Vec<Tournament>,
    players: HashMap<PlayerId, Player>,
}

struct AppContext {
    host: RwLock<Host>,
    feed: UnboundedSender<ChangeEvent>,
    config: EngineConfig,
    ratings: Elo,
}

type AppState = Data<AppContext>;

/// Standard Elo update.
struct Elo {
    k_factor: f64,
}

impl RatingCalculator for Elo {
    fn compute_new_ratings(&self, rating_a: i32, rating_b: i32, a_won: bool) -> (i32, i32) {
        let expected_a = 1.0 / (1.0 + 10f64.powf(f64::from(rating_b - rating_a) / 400.0));
        let score_a = if a_won { 1.0 } else { 0.0 };
        let delta = (self.k_factor * (score_a - expected_a)).round() as i32;
        (rating_a + delta, rating_b - delta)
    }
}

#[derive(serde::Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
struct AddPlayerBody {
    name: String,
}

#[derive(Deserialize)]
struct CreateTournamentBody {
    name: String,
    #[serde(default = "today")]
    date: NaiveDate,
    format: TournamentFormat,
    participants: Vec<PlayerId>,
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Path segment: tournament id (e.g. /api/tournaments/{id})
#[derive(Deserialize)]
struct TournamentPath {
    id: String,
}

/// Path segments: tournament id and match id.
#[derive(Deserialize)]
struct MatchPath {
    id: String,
    match_id: String,
}

fn lock(state: &AppState) -> Result<RwLockWriteGuard<'_, Host>, HttpResponse> {
    state
        .host
        .write()
        .map_err(|_| HttpResponse::InternalServerError().body("lock error"))
}

fn tournament_error(e: &TournamentError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string() });
    match e {
        TournamentError::TournamentNotFound(_) | TournamentError::MatchNotFound(_) => {
            HttpResponse::NotFound().json(body)
        }
        TournamentError::InvalidMatchState { .. } => HttpResponse::Conflict().json(body),
        _ => HttpResponse::BadRequest().json(body),
    }
}

fn store_error(e: &StoreError) -> HttpResponse {
    match e {
        StoreError::Tournament(e) => tournament_error(e),
        StoreError::DuplicateTournament(_) => {
            HttpResponse::Conflict().json(serde_json::json!({ "error": e.to_string() }))
        }
        StoreError::Corrupt(_) => {
            HttpResponse::InternalServerError().json(serde_json::json!({ "error": e.to_string() }))
        }
    }
}

/// Hand every pending store change to the feed task.
fn publish(state: &AppState, host: &mut Host) {
    for event in host.store.drain_changes() {
        if state.feed.send(event).is_err() {
            log::error!("change feed closed, event dropped");
        }
    }
}

fn event_tournament_id(event: &ChangeEvent) -> Option<String> {
    match event {
        ChangeEvent::Tournament(c) => c
            .new_record
            .as_ref()
            .and_then(|r| r.id.clone())
            .or_else(|| c.old_record.as_ref().and_then(|r| r.id.clone())),
        ChangeEvent::TournamentMatch(c) => c
            .new_record
            .as_ref()
            .and_then(|r| r.tournament_id.clone())
            .or_else(|| c.old_record.as_ref().and_then(|r| r.tournament_id.clone())),
    }
}

/// Apply one feed event, then progress every touched tournament until the store has
/// nothing more to say.
fn sync(host: &mut Host, event: ChangeEvent, config: &EngineConfig) {
    let mut queue = VecDeque::from([event]);
    let mut touched = BTreeSet::new();
    loop {
        while let Some(event) = queue.pop_front() {
            if let Some(id) = event_tournament_id(&event) {
                touched.insert(id);
            }
            apply_change(&mut host.tournaments, event);
        }
        for id in std::mem::take(&mut touched) {
            progress(host, &id, config);
        }
        queue.extend(host.store.drain_changes());
        if queue.is_empty() {
            break;
        }
    }
}

fn progress(host: &mut Host, tournament_id: &str, config: &EngineConfig) {
    let Ok(tournament) = find_tournament(&host.tournaments, tournament_id) else {
        return;
    };
    let advance = match maybe_advance(tournament, config) {
        Ok(a) => a,
        Err(e) => {
            log::warn!("tournament {} cannot advance: {}", tournament_id, e);
            return;
        }
    };
    if !advance.new_matches.is_empty() {
        if let Err(e) = host.store.insert_matches(tournament_id, advance.new_matches) {
            log::error!("storing next stage of {} failed: {}", tournament_id, e);
        }
    } else if let Some(winner) = advance.winner_ready {
        if let Err(e) = host.store.set_tournament_winner(tournament_id, &winner) {
            log::error!("declaring winner of {} failed: {}", tournament_id, e);
        }
    }
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "pingpong-tournament",
    })
}

#[get("/api/players")]
async fn api_list_players(state: AppState) -> HttpResponse {
    let g = match lock(&state) {
        Ok(g) => g,
        Err(resp) => return resp,
    };
    let mut players: Vec<&Player> = g.players.values().collect();
    players.sort_by(|a, b| a.name.cmp(&b.name));
    HttpResponse::Ok().json(players)
}

#[post("/api/players")]
async fn api_add_player(state: AppState, body: Json<AddPlayerBody>) -> HttpResponse {
    let name = body.name.trim();
    if name.is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({ "error": "Name required" }));
    }
    let mut g = match lock(&state) {
        Ok(g) => g,
        Err(resp) => return resp,
    };
    let player = Player::new(Uuid::new_v4().to_string(), name);
    g.players.insert(player.id.clone(), player.clone());
    HttpResponse::Ok().json(player)
}

/// Tournaments as currently known from the change feed.
#[get("/api/tournaments")]
async fn api_list_tournaments(state: AppState) -> HttpResponse {
    match lock(&state) {
        Ok(g) => HttpResponse::Ok().json(&g.tournaments),
        Err(resp) => resp,
    }
}

#[post("/api/tournaments")]
async fn api_create_tournament(state: AppState, body: Json<CreateTournamentBody>) -> HttpResponse {
    let body = body.into_inner();
    let mut g = match lock(&state) {
        Ok(g) => g,
        Err(resp) => return resp,
    };
    let tournament = Tournament::new(body.name, body.date, body.format, body.participants);
    match g.store.insert_tournament(&tournament) {
        Ok(t) => {
            publish(&state, &mut g);
            HttpResponse::Ok().json(t)
        }
        Err(e) => store_error(&e),
    }
}

#[get("/api/tournaments/{id}")]
async fn api_get_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let g = match lock(&state) {
        Ok(g) => g,
        Err(resp) => return resp,
    };
    match find_tournament(&g.tournaments, &path.id) {
        Ok(t) => HttpResponse::Ok().json(t),
        Err(e) => tournament_error(&e),
    }
}

#[delete("/api/tournaments/{id}")]
async fn api_delete_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let mut g = match lock(&state) {
        Ok(g) => g,
        Err(resp) => return resp,
    };
    match g.store.delete_tournament(&path.id) {
        Ok(()) => {
            publish(&state, &mut g);
            HttpResponse::NoContent().finish()
        }
        Err(e) => store_error(&e),
    }
}

/// Start the tournament (Upcoming -> Active, round 1 generated).
#[post("/api/tournaments/{id}/start")]
async fn api_start_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let mut g = match lock(&state) {
        Ok(g) => g,
        Err(resp) => return resp,
    };
    let mut t = match find_tournament(&g.tournaments, &path.id) {
        Ok(t) => t.clone(),
        Err(e) => return tournament_error(&e),
    };
    let matches = match start(&mut t, &state.config) {
        Ok(m) => m,
        Err(e) => return tournament_error(&e),
    };
    let stored = g
        .store
        .update_tournament(&t)
        .and_then(|_| g.store.insert_matches(&t.id, matches));
    publish(&state, &mut g);
    match stored {
        Ok(matches) => HttpResponse::Ok().json(Tournament { matches, ..t }),
        Err(e) => store_error(&e),
    }
}

/// Record a match result. The winner moves on as soon as the store confirms.
#[put("/api/tournaments/{id}/matches/{match_id}/result")]
async fn api_record_result(
    state: AppState,
    path: Path<MatchPath>,
    body: Json<MatchResult>,
) -> HttpResponse {
    let mut g = match lock(&state) {
        Ok(g) => g,
        Err(resp) => return resp,
    };
    let mut t = match find_tournament(&g.tournaments, &path.id) {
        Ok(t) => t.clone(),
        Err(e) => return tournament_error(&e),
    };
    let changed = match record_result(&mut t, &path.match_id, &body) {
        Ok(c) => c,
        Err(e) => return tournament_error(&e),
    };
    let Some((recorded, seated)) = changed.split_first() else {
        return HttpResponse::InternalServerError().finish();
    };
    let Some(winner) = recorded.winner.clone() else {
        return HttpResponse::InternalServerError().finish();
    };

    let stored = match g.store.update_match_result(&recorded.id, &body, &winner) {
        Ok(m) => m,
        Err(e) => return store_error(&e),
    };
    // Only the winner's slot is written; the store keeps whatever else is seated there.
    for m in seated {
        let Some(slot) = m.slot_of(&winner) else {
            continue;
        };
        if let Err(e) = g.store.seat_player(&m.id, slot, &winner) {
            log::error!("seating {} in match {} failed: {}", winner, m.id, e);
        }
    }
    if let (Some(winner), Some(loser)) = (stored.winner.clone(), stored.loser().cloned()) {
        apply_ratings(&mut g, &state.ratings, &winner, &loser);
    }
    publish(&state, &mut g);
    HttpResponse::Ok().json(stored)
}

fn apply_ratings(host: &mut Host, ratings: &Elo, winner: &str, loser: &str) {
    let (Some(w), Some(l)) = (host.players.get(winner), host.players.get(loser)) else {
        return;
    };
    let (new_w, new_l) = ratings.compute_new_ratings(w.elo_rating, l.elo_rating, true);
    if let Some(p) = host.players.get_mut(winner) {
        p.set_rating(new_w);
    }
    if let Some(p) = host.players.get_mut(loser) {
        p.set_rating(new_l);
    }
}

#[get("/api/tournaments/{id}/standings")]
async fn api_standings(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let g = match lock(&state) {
        Ok(g) => g,
        Err(resp) => return resp,
    };
    let t = match find_tournament(&g.tournaments, &path.id) {
        Ok(t) => t,
        Err(e) => return tournament_error(&e),
    };
    let overall = standings(&t.participants, &t.matches);
    let groups = match t.format {
        TournamentFormat::Group => {
            let group_stage: Vec<_> = t.matches.iter().filter(|m| m.round == 1).cloned().collect();
            group_standings(&t.participants, &group_stage)
        }
        _ => Default::default(),
    };
    HttpResponse::Ok().json(serde_json::json!({ "overall": overall, "groups": groups }))
}

/// Accept a change event from an external feed.
#[post("/api/feed")]
async fn api_feed(state: AppState, body: Json<ChangeEvent>) -> HttpResponse {
    match state.feed.send(body.into_inner()) {
        Ok(()) => HttpResponse::Accepted().finish(),
        Err(_) => HttpResponse::ServiceUnavailable().finish(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let host = std::env::var("HOST").unwrap_or_else(|_| default_host());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or_else(default_port);
    let bind = (host.as_str(), port);
    let config = EngineConfig::from_env();
    log::info!("Starting server at http://{}:{} ({:?})", bind.0, bind.1, config);

    let (tx, mut rx) = mpsc::unbounded_channel::<ChangeEvent>();
    let state = Data::new(AppContext {
        host: RwLock::new(Host::default()),
        feed: tx,
        config,
        ratings: Elo { k_factor: 32.0 },
    });

    // Background task: the change-feed subscriber.
    let state_feed = state.clone();
    actix_web::rt::spawn(async move {
        while let Some(event) = rx.recv().await {
            let mut g = match state_feed.host.write() {
                Ok(guard) => guard,
                Err(_) => continue,
            };
            sync(&mut g, event, &state_feed.config);
        }
        log::info!("change feed closed");
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(api_health)
            .service(api_list_players)
            .service(api_add_player)
            .service(api_list_tournaments)
            .service(api_create_tournament)
            .service(api_get_tournament)
            .service(api_delete_tournament)
            .service(api_start_tournament)
            .service(api_record_result)
            .service(api_standings)
            .service(api_feed)
    })
    .bind(bind)?
    .run()
    .await
}
