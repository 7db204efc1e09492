//! HTTP request handlers and DTOs for the start surface.
//!
//! Rate limiting and authentication happen upstream; these handlers only
//! validate shapes and bounds, call the engine or lobby controller, and
//! translate typed rejections into status codes.
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::web;
use qz_core::ID;
use qz_core::Tier;
use qz_core::Unique;
use qz_engine::Engine;
use qz_engine::StartError;
use qz_lobby::LobbyController;
use qz_lobby::LobbyError;
use qz_store::UserProfile;
use serde::Deserialize;
use serde_json::json;

/// The host-facing capacity bound; the lobby state machine narrows it
/// further.
const API_MAX_PLAYERS: usize = 20;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartDuelRequest {
    pub user_ids: Vec<ID<UserProfile>>,
    #[serde(default)]
    pub bot_count: usize,
    pub tier: Option<String>,
    pub duration_minutes: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartFastestFingerRequest {
    pub user_ids: Vec<ID<UserProfile>>,
    #[serde(default)]
    pub bot_count: usize,
    pub duration_minutes: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPracticeRequest {
    pub user_id: ID<UserProfile>,
    pub tier: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub num_questions: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTimeAttackRequest {
    pub user_id: ID<UserProfile>,
    pub tier: Option<String>,
    pub duration_minutes: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLobbyRequest {
    pub host_id: ID<UserProfile>,
    pub difficulty: String,
    pub duration_minutes: u32,
    pub max_players: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyMemberRequest {
    pub user_id: ID<UserProfile>,
    pub room_code: String,
}

fn parse_tier(tier: &Option<String>) -> Result<Option<Tier>, HttpResponse> {
    match tier {
        None => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|e: String| HttpResponse::BadRequest().body(e)),
    }
}

fn start_failure(e: StartError) -> HttpResponse {
    match e {
        StartError::EmptyPool => HttpResponse::Conflict().body(e.to_string()),
        StartError::UnknownUser | StartError::UnknownSession => {
            HttpResponse::NotFound().body(e.to_string())
        }
        StartError::Store(_) | StartError::Live(_) => {
            log::error!("start failed: {}", e);
            HttpResponse::InternalServerError().body("internal error")
        }
    }
}

fn lobby_failure(e: LobbyError) -> HttpResponse {
    match e {
        LobbyError::UnknownCode => HttpResponse::NotFound().body(e.to_string()),
        LobbyError::InvalidDuration(_) | LobbyError::InvalidCapacity(_) => {
            HttpResponse::BadRequest().body(e.to_string())
        }
        LobbyError::Closed
        | LobbyError::Full
        | LobbyError::Duplicate
        | LobbyError::NotHost
        | LobbyError::TooFewPlayers
        | LobbyError::NoCountdown
        | LobbyError::NotSeated => HttpResponse::Conflict().body(e.to_string()),
        LobbyError::Store(_) | LobbyError::Jobs(_) => {
            log::error!("lobby operation failed: {}", e);
            HttpResponse::InternalServerError().body("internal error")
        }
    }
}

pub async fn start_duel(
    engine: web::Data<Engine>,
    body: web::Json<StartDuelRequest>,
) -> impl Responder {
    let tier = match parse_tier(&body.tier) {
        Ok(tier) => tier,
        Err(response) => return response,
    };
    match engine
        .into_inner()
        .start_quick_duel(&body.user_ids, body.bot_count, tier, body.duration_minutes)
        .await
    {
        Ok(session) => HttpResponse::Ok().json(json!({ "sessionId": session })),
        Err(e) => start_failure(e),
    }
}

pub async fn start_fastest_finger(
    engine: web::Data<Engine>,
    body: web::Json<StartFastestFingerRequest>,
) -> impl Responder {
    match engine
        .into_inner()
        .start_fastest_finger(&body.user_ids, body.bot_count, body.duration_minutes)
        .await
    {
        Ok(session) => HttpResponse::Ok().json(json!({ "sessionId": session })),
        Err(e) => start_failure(e),
    }
}

pub async fn start_practice(
    engine: web::Data<Engine>,
    body: web::Json<StartPracticeRequest>,
) -> impl Responder {
    let tier = match parse_tier(&body.tier) {
        Ok(tier) => tier,
        Err(response) => return response,
    };
    if body.num_questions == 0 {
        return HttpResponse::BadRequest().body("numQuestions must be positive");
    }
    let body = body.into_inner();
    match engine
        .into_inner()
        .start_practice(body.user_id, tier, body.categories, body.num_questions)
        .await
    {
        Ok(session) => HttpResponse::Ok().json(json!({ "sessionId": session })),
        Err(e) => start_failure(e),
    }
}

pub async fn start_time_attack(
    engine: web::Data<Engine>,
    body: web::Json<StartTimeAttackRequest>,
) -> impl Responder {
    let tier = match parse_tier(&body.tier) {
        Ok(tier) => tier,
        Err(response) => return response,
    };
    match engine
        .into_inner()
        .start_time_attack(body.user_id, tier, body.duration_minutes)
        .await
    {
        Ok(session) => HttpResponse::Ok().json(json!({ "sessionId": session })),
        Err(e) => start_failure(e),
    }
}

pub async fn create_lobby(
    lobby: web::Data<LobbyController>,
    body: web::Json<CreateLobbyRequest>,
) -> impl Responder {
    let tier: Tier = match body.difficulty.parse() {
        Ok(tier) => tier,
        Err(e) => return HttpResponse::BadRequest().body(e),
    };
    if !(2..=API_MAX_PLAYERS).contains(&body.max_players) {
        return HttpResponse::BadRequest().body("maxPlayers out of range");
    }
    match lobby
        .create_lobby(body.host_id, tier, body.duration_minutes, body.max_players)
        .await
    {
        Ok(session) => HttpResponse::Ok().json(json!({
            "sessionId": session.id(),
            "roomCode": session.room_code(),
        })),
        Err(e) => lobby_failure(e),
    }
}

pub async fn join_lobby(
    lobby: web::Data<LobbyController>,
    body: web::Json<LobbyMemberRequest>,
) -> impl Responder {
    match lobby.join(body.user_id, &body.room_code).await {
        Ok(session) => HttpResponse::Ok().json(json!({ "sessionId": session.id() })),
        Err(e) => lobby_failure(e),
    }
}

pub async fn leave_lobby(
    lobby: web::Data<LobbyController>,
    body: web::Json<LobbyMemberRequest>,
) -> impl Responder {
    match lobby.leave(body.user_id, &body.room_code).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "status": "left" })),
        Err(e) => lobby_failure(e),
    }
}

pub async fn initiate_countdown(
    lobby: web::Data<LobbyController>,
    body: web::Json<LobbyMemberRequest>,
) -> impl Responder {
    match lobby.initiate_countdown(body.user_id, &body.room_code).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "status": "countdown_started" })),
        Err(e) => lobby_failure(e),
    }
}

pub async fn cancel_countdown(
    lobby: web::Data<LobbyController>,
    body: web::Json<LobbyMemberRequest>,
) -> impl Responder {
    match lobby.cancel_countdown(body.user_id, &body.room_code).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "status": "countdown_cancelled" })),
        Err(e) => lobby_failure(e),
    }
}
