//! Orchestration worker binary.
//!
//! Runs the HTTP start surface, the timer-queue dispatchers, and the
//! inbound gateway event router in one process.

#[tokio::main]
async fn main() {
    qz_core::init();
    qz_server::run().await.unwrap();
}
