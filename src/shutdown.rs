use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Cancel a token on the first SIGTERM or SIGINT.
///
/// The token is shared by the HTTP server and the stats reporter. Once it
/// fires, the server stops accepting requests and drains in-flight ones;
/// only then does `main` call `Dispatcher::shutdown`, so handlers still
/// waiting on a job get its result rather than a dropped channel.
pub fn install_shutdown_handler() -> std::io::Result<CancellationToken> {
    let sigterm = signal(SignalKind::terminate())?;
    let sigint = signal(SignalKind::interrupt())?;

    let token = CancellationToken::new();
    let cancel = token.clone();

    tokio::spawn(async move {
        let received = first_signal(sigterm, sigint).await;
        tracing::info!(signal = received, "Stopping HTTP server, then worker pool");
        cancel.cancel();
    });

    Ok(token)
}

async fn first_signal(mut sigterm: Signal, mut sigint: Signal) -> &'static str {
    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    }
}
