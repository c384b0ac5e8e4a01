// host-sim/src/main.rs
// Host Simulator - main.rs
//
// Manual driver for the console bridge wire contract. Connects to the
// guest's embed endpoint with a configurable Origin header, logs every
// received frame verbatim, and sends envelopes built from prompt commands.

mod driver;

use common::envelope::Envelope;
use common::{setup_tracing, Config};
use driver::{parse_command, Command, HostDriver, HELP};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tungstenite::http::Request;
use url::Url;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_tracing();

    let config = Config::from_env();
    let guest_url = Url::parse(&config.host_sim.guest_url)?;
    tracing::info!(
        "Connecting to {} as origin {}",
        guest_url,
        config.host_sim.origin
    );

    // The Origin header is what the guest records as this host's origin.
    let request = Request::builder()
        .uri(guest_url.as_str())
        .header("Origin", config.host_sim.origin.as_str())
        .body(())?;

    let (ws_stream, _) = connect_async(request).await?;
    let (mut write, mut read) = ws_stream.split();

    println!("{}", HELP);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut driver = HostDriver::new();

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    // Verbatim first, parsed second.
                    tracing::info!("<- {}", text);
                    if let Some(envelope) = Envelope::parse(&text) {
                        tracing::info!("   parsed as {}", envelope.type_name());
                        if let Some(reply) = driver.on_envelope(&envelope) {
                            send(&mut write, &reply).await?;
                        }
                    } else {
                        tracing::warn!("   (not a known envelope)");
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    write.send(Message::Pong(payload)).await?;
                }
                Some(Ok(Message::Close(reason))) => {
                    tracing::info!("Guest closed the connection: {:?}", reason);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::error!("Websocket error: {}", e);
                    break;
                }
                None => {
                    tracing::info!("Connection ended");
                    break;
                }
            },
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        if let Some(envelope) = driver.build(&command) {
                            send(&mut write, &envelope).await?;
                        }
                    }
                    Err(usage) => println!("{}", usage),
                },
                None => break,
            },
        }
    }

    Ok(())
}

async fn send<S>(write: &mut S, envelope: &Envelope) -> Result<(), Box<dyn std::error::Error>>
where
    S: SinkExt<Message> + Unpin,
    S::Error: std::error::Error + 'static,
{
    if let Some(json) = envelope.to_json() {
        tracing::info!("-> {}", json);
        write.send(Message::Text(json)).await?;
    }
    Ok(())
}
