// ABOUTME: Minimal SMSC accepting binds and submissions from any ESME on one port
// ABOUTME: Each connection gets its own ServerSession; receivers are sent a greeting deliver_sm after binding

use argh::FromArgs;
use smpp_session::connection::Connection;
use smpp_session::service::SessionRunner;
use smpp_session::session::{Dispatched, MessageOptions, ServerSession};
use std::error::Error;
use tokio::net::TcpListener;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Dummy SMSC for exercising ESMEs locally
#[derive(FromArgs)]
struct CliArgs {
    /// log at debug level
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the address to listen on (default: 127.0.0.1:2775)
    #[argh(option, short = 'l')]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let level = if cli_args.debugging {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let addr = cli_args
        .listen
        .unwrap_or_else(|| "127.0.0.1:2775".to_owned());
    let listener = TcpListener::bind(&addr).await?;
    info!("listening on {}", addr);

    loop {
        let (socket, peer) = listener.accept().await?;
        info!("accepted {}", peer);

        tokio::spawn(async move {
            let mut runner = SessionRunner::new(Connection::new(socket), ServerSession::new());
            let mut events = runner.subscribe();
            let handle = runner.handle();
            let session = tokio::spawn(runner.run());

            while let Some(event) = events.recv().await {
                if let Dispatched::Bound(state) = event {
                    if state.is_receiving() {
                        let greeting = handle
                            .call(|smsc, sink| {
                                smsc.deliver_sm(
                                    "welcome",
                                    "SMSC",
                                    "",
                                    "bound",
                                    &MessageOptions::new(),
                                    sink,
                                )
                            })
                            .await;
                        if let Err(err) = greeting {
                            error!("greeting {} failed: {}", peer, err);
                        }
                    }
                }
            }

            match session.await {
                Ok(Ok(())) => info!("{} disconnected", peer),
                Ok(Err(err)) => error!("{} session failed: {}", peer, err),
                Err(err) => error!("{} session task failed: {}", peer, err),
            }
        });
    }
}
