//! iTZS auth service entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Pick storage backends (Redis if `REDIS_URL` is set, in-process otherwise)
//! 3. Start the expired-challenge sweeper
//! 4. Build router with API routes, CORS and security headers
//! 5. Start Axum server
//!
//! Also supports wallet-side subcommands:
//! - `keygen` prints a fresh Stellar keypair
//! - `sign <secret_seed> <challenge>` prints the base64 signature to submit

use itzs::{
    auth::{verify, SystemClock},
    cleanup,
    config::Config,
    routes,
    state::AppState,
};
use std::sync::Arc;

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  itzs [serve]");
    eprintln!("  itzs keygen");
    eprintln!("  itzs sign <secret_seed> <challenge>");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  itzs keygen");
    eprintln!("  itzs sign SB... 'itzs-auth:...:1700000000000'");
}

fn keygen() {
    let signing_key = verify::generate_keypair();
    println!(
        "Public key:  {}",
        verify::encode_public_key(&signing_key.verifying_key())
    );
    println!("Secret seed: {}", verify::encode_secret_seed(&signing_key).as_str());
}

fn sign(secret_seed: &str, challenge: &str) -> Result<String, verify::KeyError> {
    let signing_key = verify::parse_secret_seed(secret_seed)?;
    Ok(verify::sign_challenge(&signing_key, challenge))
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        None | Some("serve") => {}
        Some("keygen") => {
            keygen();
            return;
        }
        Some("sign") => {
            if args.len() != 4 {
                print_usage();
                std::process::exit(1);
            }
            match sign(&args[2], &args[3]) {
                Ok(signature) => println!("{}", signature),
                Err(e) => {
                    eprintln!("Error signing challenge: {}", e);
                    std::process::exit(1);
                }
            }
            return;
        }
        Some(_) => {
            print_usage();
            std::process::exit(1);
        }
    }

    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config from environment
    let config = Config::from_env().expect("Failed to load config");
    tracing::info!(config = ?config, "Starting itzs on {}", config.bind_addr);

    let clock = Arc::new(SystemClock);
    let state = match config.redis_url.clone() {
        Some(redis_url) => {
            let redis_client = redis::Client::open(redis_url).expect("Invalid Redis URL");

            // Verify Redis connection
            redis_client
                .get_multiplexed_async_connection()
                .await
                .expect("Failed to connect to Redis");
            tracing::info!("Using Redis challenge store and account directory");

            AppState::with_redis(config.clone(), redis_client, clock)
        }
        None => {
            tracing::info!(
                capacity = config.max_outstanding_challenges,
                "Using in-process challenge store and account directory"
            );
            AppState::in_memory(config.clone(), clock)
        }
    };

    let settings = state.authenticator.settings();
    tracing::info!(
        ttl_secs = settings.ttl.num_seconds(),
        prefix = %settings.prefix,
        "Challenge settings"
    );

    tokio::spawn(cleanup::run_sweep_loop(
        state.authenticator.clone(),
        config.sweep_interval(),
    ));

    let app = routes::app(state);

    // Bind to configured address
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
