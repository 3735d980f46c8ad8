// ABOUTME: Binds to an SMSC and sends one message, concatenated when it does not fit a single short message
// ABOUTME: Waits for every part to be acknowledged, then unbinds

use argh::FromArgs;
use smpp_session::connection::Connection;
use smpp_session::datatypes::BindType;
use smpp_session::service::SessionRunner;
use smpp_session::session::{Dispatched, MessageOptions, SessionConfig, Transmitter};
use std::error::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Send a possibly long SMS through an SMSC
#[derive(FromArgs)]
struct CliArgs {
    /// log at debug level
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the system id
    #[argh(option)]
    system_id: String,

    /// the password
    #[argh(option)]
    password: Option<String>,

    /// the hostname or IP address of the SMSC (default: localhost)
    #[argh(option)]
    host: Option<String>,

    /// the port to use when connecting to the SMSC (default: 2775)
    #[argh(option, short = 'p')]
    port: Option<u32>,

    /// bind as transceiver instead of transmitter
    #[argh(switch)]
    transceiver: bool,

    /// data_coding of the message, e.g. 8 for UCS2
    #[argh(option)]
    data_coding: Option<u8>,

    /// the message to send
    #[argh(option, short = 'm')]
    message: String,

    /// the recipient telephone number
    #[argh(option, short = 't')]
    to: String,

    /// the telephone number that the message will be from
    #[argh(option, short = 'f')]
    from: String,
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

    let host = cli_args.host.unwrap_or_else(|| "localhost".to_owned());
    let port = cli_args.port.unwrap_or(2775);

    let mut config = SessionConfig::builder(cli_args.system_id);
    if let Some(password) = cli_args.password {
        config = config.password(password);
    }
    let bind_type = if cli_args.transceiver {
        BindType::Transceiver
    } else {
        BindType::Transmitter
    };
    let esme = Transmitter::new(config.build()?).with_bind_type(bind_type);

    let connection = Connection::connect(&format!("{host}:{port}")).await?;
    let mut runner = SessionRunner::new(connection, esme);
    let mut events = runner.subscribe();
    let handle = runner.handle();
    let session = tokio::spawn(runner.run());

    handle.call(|esme, sink| esme.send_bind(sink)).await?;
    match events.recv().await {
        Some(Dispatched::Bound(state)) => tracing::info!("bound as {:?}", state),
        other => return Err(format!("bind failed: {other:?}").into()),
    }

    let mut options = MessageOptions::new();
    if let Some(data_coding) = cli_args.data_coding {
        options = options.data_coding(data_coding);
    }
    let body = cli_args.message.into_bytes();
    let parts = handle
        .call(|esme, sink| {
            esme.send_message(1u64, &cli_args.from, &cli_args.to, &body, &options, sink)
        })
        .await?;
    tracing::info!("submitted {} part(s)", parts.len());

    let mut outstanding = parts.len();
    while outstanding > 0 {
        match events.recv().await {
            Some(Dispatched::Acknowledged(ack)) => {
                tracing::info!("{:?}", ack);
                outstanding -= 1;
            }
            Some(other) => tracing::debug!("{:?}", other),
            None => break,
        }
    }

    handle.unbind().await?;
    session.await??;
    Ok(())
}
