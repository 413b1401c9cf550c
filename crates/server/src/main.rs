use clap::Parser;
use rvb_database::Memory;
use rvb_database::Postgres;
use rvb_database::Store;
use std::sync::Arc;

/// Authoritative multi-table no-limit hold'em server.
#[derive(Parser)]
#[command(name = "riverboat")]
struct Args {
    /// Address for the HTTP/WebSocket gateway.
    #[arg(long, default_value = "127.0.0.1:8080", env = "BIND_ADDR")]
    bind: String,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    rvb_core::init_logs();
    let args = Args::parse();
    let store: Arc<dyn Store> = match std::env::var("DB_URL") {
        Ok(_) => {
            let client = rvb_database::db().await;
            Arc::new(
                Postgres::new(client)
                    .await
                    .map_err(std::io::Error::other)?,
            )
        }
        Err(_) => {
            log::warn!("DB_URL not set, checkpoints are in-memory only");
            Arc::new(Memory::default())
        }
    };
    rvb_server::run(&args.bind, store).await
}
