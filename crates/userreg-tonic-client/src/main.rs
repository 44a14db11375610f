#![doc = include_str!("../README.md")]

mod client;

use clap::Parser;
use client::config::{Call, CliArgs, ClientConfig};
use client::service::handler::UserClient;
use client::streaming::StreamDriver;
use client::telemetry::init_telemetry;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use userreg_tonic_core::types::ResponseEnvelope;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ClientConfig::try_from(args)?;

    let providers = init_telemetry()?;
    log_startup_info(&config);

    let driver = StreamDriver::new(config.driver.clone());
    let cancel = driver.cancellation_token();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let res = run(&config, &driver, cancel).await;
    if let Err(_e) = &res {
        #[cfg(feature = "tracing")]
        tracing::error!("Call failed: {_e}");
    }

    providers.shutdown();
    res?;
    Ok(())
}

async fn run(
    config: &ClientConfig,
    driver: &StreamDriver,
    cancel: CancellationToken,
) -> userreg_tonic_core::Result<()> {
    let mut client = UserClient::connect(config).await?;
    let mut records = config.records.clone();

    match config.call {
        Call::Unary => {
            let record = records.swap_remove(0);
            let reply = client.add_user(record).await?;
            println!("{reply:?}");
        }
        Call::ServerStream => {
            let record = records.swap_remove(0);
            client
                .add_user_verbose(
                    record,
                    |resp: &ResponseEnvelope| {
                        println!("Status: {}", resp.status);
                        println!("User: {:?}", resp.user);
                    },
                    cancel,
                )
                .await?;
        }
        Call::ClientStream => {
            let users = client
                .add_users(
                    records,
                    config.driver.send_interval,
                    config.driver.outbound_buffer_size,
                    cancel,
                )
                .await?;
            println!("{users:?}");
        }
        Call::Bidi => {
            let duplex = client.open_user_stream(config.driver.outbound_buffer_size);
            driver
                .drive(duplex, records, |resp: &ResponseEnvelope| {
                    println!(
                        "Receiving user {} with status: {}",
                        resp.user_name(),
                        resp.status
                    );
                })
                .await?;
        }
    }

    Ok(())
}

fn log_startup_info(_config: &ClientConfig) {
    if cfg!(debug_assertions) {
        #[cfg(feature = "tracing")]
        tracing::info!("Starting {:?} call with full config: {:#?}", _config.call, _config);
    } else {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting {:?} call against {} with {} records",
            _config.call,
            _config.server_addr,
            _config.records.len()
        );
    }
}

async fn cancel_on_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received SIGTERM signal");
        },
    }

    cancel.cancel();
}
