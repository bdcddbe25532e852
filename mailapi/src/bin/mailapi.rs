use anyhow::Context;
use mailapi::{MailConfig, MailService, SmtpMailer};
use mailrpc_core::ObservabilityConfig;
use mailrpc_server::{JsonCodec, RpcServer};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::oneshot;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match MailConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let mailer = SmtpMailer::from_config(&config).context("building smtp transport")?;
    let service = MailService::new(mailer, &config.from, &config.to, &config.subject);

    let server = RpcServer::builder()
        .bind(config.bind_address)
        .with_observability(
            ObservabilityConfig::new("mailapi").with_version(env!("CARGO_PKG_VERSION")),
        )
        .codec("application/json", Arc::new(JsonCodec))
        .service(Arc::new(service), "Service")
        .build()
        .context("building server")?;

    let mut interrupt = signal(SignalKind::interrupt()).context("installing SIGINT handler")?;
    let mut terminate = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut serving = tokio::spawn(server.run_until(async move {
        let _ = stop_rx.await;
    }));

    let cause = tokio::select! {
        _ = interrupt.recv() => "interrupt".to_string(),
        _ = terminate.recv() => "terminated".to_string(),
        served = &mut serving => {
            return match served.context("server task panicked")? {
                Ok(()) => {
                    println!("exit server stopped");
                    Ok(())
                }
                Err(e) => {
                    println!("exit {}", e);
                    std::process::exit(1);
                }
            };
        }
    };

    let _ = stop_tx.send(());
    serving
        .await
        .context("server task panicked")?
        .context("draining server")?;
    println!("exit {}", cause);
    Ok(())
}
