//! Unified backend server.
//!
//! One worker process runs:
//!
//! - the actix-web start surface (practice, time attack, duels, lobbies)
//! - the two timer-queue dispatchers (game timers, lobby countdowns)
//! - the inbound router pumping gateway client events into the engine
//!
//! ## Submodules
//!
//! - [`handlers`] — HTTP request handlers and DTOs
//! - [`router`] — Inbound [`qz_bus::ClientMessage`] dispatch

pub mod handlers;
pub mod router;

use actix_cors::Cors;
use actix_web::App;
use actix_web::HttpResponse;
use actix_web::HttpServer;
use actix_web::Responder;
use actix_web::middleware::Logger;
use actix_web::web;
use qz_bus::EventBus;
use qz_bus::Inbox;
use qz_content::QuestionRepo;
use qz_core::Config;
use qz_engine::Engine;
use qz_engine::GameTimerHandler;
use qz_engine::Services;
use qz_lobby::CountdownHandler;
use qz_lobby::LobbyController;
use qz_lobby::PlatformBackend;
use qz_live::LiveStore;
use qz_store::SessionStore;
use qz_timers::Dispatcher;
use qz_timers::GAME_TIMERS;
use qz_timers::LOBBY_COUNTDOWN_JOBS;
use qz_timers::Timers;
use std::sync::Arc;

async fn health(client: web::Data<Arc<tokio_postgres::Client>>) -> impl Responder {
    match client
        .execute("SELECT 1", &[])
        .await
        .inspect_err(|e| log::error!("health check failed: {}", e))
    {
        Ok(_) => HttpResponse::Ok().body("ok"),
        Err(_) => HttpResponse::ServiceUnavailable().body("database unavailable"),
    }
}

#[rustfmt::skip]
pub async fn run() -> Result<(), std::io::Error> {
    let cfg = Config::from_env();
    let db = qz_store::db().await;
    qz_store::migrate(&db).await.expect("schema migrations apply");
    qz_content::migrate(&db).await.expect("content migrations apply");
    let redis = qz_live::redis().await;

    let store = SessionStore::new(db.clone());
    let live = LiveStore::new(redis.clone());
    let timers = Timers::new(redis.clone());
    let bus = EventBus::new(redis.clone());
    let content = QuestionRepo::new(db.clone());

    let engine = Engine::new(Services {
        cfg,
        store: store.clone(),
        live: live.clone(),
        timers: timers.clone(),
        bus: bus.clone(),
        content,
    });
    let lobby = LobbyController::new(
        cfg,
        Arc::new(PlatformBackend::new(store, timers.clone(), bus, engine.clone())),
    );

    Dispatcher::spawn(timers.clone(), GAME_TIMERS, Arc::new(GameTimerHandler(engine.clone())));
    Dispatcher::spawn(timers, LOBBY_COUNTDOWN_JOBS, Arc::new(CountdownHandler(lobby.clone())));

    let (inbound_tx, inbound_rx) = tokio::sync::mpsc::unbounded_channel();
    let subscriber = redis::Client::open(
        std::env::var("QZ_REDIS_URL").expect("QZ_REDIS_URL must be set").as_str(),
    )
    .expect("redis url invalid");
    Inbox::spawn(subscriber, inbound_tx)
        .await
        .expect("inbound subscription");
    router::spawn(engine.clone(), lobby.clone(), inbound_rx);

    let engine = web::Data::from(engine);
    let lobby = web::Data::from(lobby);
    let client = web::Data::new(db);
    log::info!("starting unified server");
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%r %s %Ts"))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header(),
            )
            .app_data(engine.clone())
            .app_data(lobby.clone())
            .app_data(client.clone())
            .route("/health", web::get().to(health))
            .service(
                web::scope("/game")
                    .route("/duel/start", web::post().to(handlers::start_duel))
                    .route("/fastest-finger/start", web::post().to(handlers::start_fastest_finger))
                    .route("/practice/start", web::post().to(handlers::start_practice))
                    .route("/time-attack/start", web::post().to(handlers::start_time_attack)),
            )
            .service(
                web::scope("/lobby")
                    .route("/create", web::post().to(handlers::create_lobby))
                    .route("/join", web::post().to(handlers::join_lobby))
                    .route("/leave", web::post().to(handlers::leave_lobby))
                    .route("/countdown/start", web::post().to(handlers::initiate_countdown))
                    .route("/countdown/cancel", web::post().to(handlers::cancel_countdown)),
            )
    })
    .workers(6)
    .bind(std::env::var("BIND_ADDR").expect("BIND_ADDR must be set"))?
    .run()
    .await
}
