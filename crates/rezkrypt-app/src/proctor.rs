//! `rezkrypt proctor`: detector frames in, proctoring events out, both as
//! JSON lines.

use anyhow::Result;
use rezkrypt_media::{FrameSample, ProctorConfig, ProctorHub};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::warn;

use crate::cli::ProctorArgs;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Output<'a> {
    Error { line: usize, message: String },
    Ended { connection: &'a str, dropped_frames: u64 },
}

async fn emit<W, T>(out: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    out.write_all(line.as_bytes()).await?;
    out.flush().await?;
    Ok(())
}

/// Feed every frame on `input` to the connection's session. Events are
/// written as they are released; the rest follow once input ends.
pub async fn drive<R, W>(hub: &ProctorHub, connection: &str, input: R, out: &mut W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let session = hub.get_or_start(connection);
    let mut lines = BufReader::new(input).lines();
    let mut line_no = 0;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<FrameSample>(&line) {
            Ok(sample) => {
                for event in session.on_frame(sample) {
                    emit(out, &event).await?;
                }
            }
            Err(e) => {
                warn!(line = line_no, "unreadable frame: {}", e);
                let message = e.to_string();
                emit(out, &Output::Error { line: line_no, message }).await?;
            }
        }
    }

    let session = hub.end(connection).await?;
    loop {
        let batch = session.drain();
        if batch.is_empty() {
            break;
        }
        for event in &batch {
            emit(out, event).await?;
        }
    }
    let ended = Output::Ended {
        connection,
        dropped_frames: session.dropped_frames(),
    };
    emit(out, &ended).await
}

pub async fn run(config: &ProctorConfig, args: ProctorArgs) -> Result<()> {
    let hub = ProctorHub::new(config.clone());
    let mut stdout = tokio::io::stdout();
    drive(&hub, &args.connection, tokio::io::stdin(), &mut stdout).await
}
