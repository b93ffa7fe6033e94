/// digit-lens studio
///
/// Serves the CNN walkthrough page and one live channel per browser tab.
/// Served by a synchronous tiny_http server; the page itself is plain
/// HTML/JS with no framework.
///
/// Run with:
///   cargo run --bin studio --release
/// Then open http://127.0.0.1:3000
///
/// Endpoints:
///   GET  /                 the application page
///   GET  /assets/*         its script and stylesheet
///   GET  /channel          SSE stream; the first event names the session
///   POST /channel/{id}     JSON command into that session

mod state;
mod render;
mod routes;
mod handlers;
mod util;

use std::process;
use std::sync::Arc;

use clap::Parser;
use tiny_http::Server;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use digit_lens::chat::service_from_config;
use digit_lens::{ChatResponder, LayerRegistry, Pacing, ServerConfig, SessionRegistry, SessionServices};

use state::StudioState;

#[derive(Parser, Debug)]
#[command(name = "studio")]
#[command(about = "Watch a CNN read your handwriting, one layer at a time")]
struct Args {
    /// Host to bind to (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Animation speed: normal, fast or none (overrides DEMO_PACING)
    #[arg(long)]
    pacing: Option<String>,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = ServerConfig::from_env().unwrap_or_else(|e| {
        error!("invalid configuration: {}", e);
        process::exit(2);
    });
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(name) = args.pacing {
        config.pacing = Pacing::from_name(&name).unwrap_or_else(|| {
            error!("unknown pacing {:?} (expected normal, fast or none)", name);
            process::exit(2);
        });
    }

    let addr = config.bind_addr();
    let server = Server::http(&addr).unwrap_or_else(|e| {
        error!("failed to bind {}: {}", addr, e);
        process::exit(1);
    });

    let responder = ChatResponder::new(service_from_config(&config.chat));
    let services = SessionServices::mock(LayerRegistry::standard(), config.pacing, responder);
    let shared_state = Arc::new(StudioState::new(SessionRegistry::new(services), config));

    info!("digit-lens studio listening on http://{}", addr);

    // One thread per request: SSE channels block for the whole session and
    // chat posts block until the completion service answers.
    for request in server.incoming_requests() {
        let state_clone = shared_state.clone();
        std::thread::spawn(move || {
            routes::dispatch(request, state_clone);
        });
    }
}
