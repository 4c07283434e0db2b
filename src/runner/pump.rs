//! Line pumps: turn a child's output pipe into [`OutputLine`] messages.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{OutputLine, StreamOrigin};

/// Read `rd` until EOF, forwarding each line to `line_tx`.
///
/// Both `\n` and `\r` terminate a line: downloaders redraw progress with a
/// bare carriage return when they think they are writing to a terminal.
/// Empty lines are dropped. Stops early once the receiver is gone.
pub(super) fn pump_lines<R>(
    rd: R,
    origin: StreamOrigin,
    line_tx: mpsc::UnboundedSender<OutputLine>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(rd);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf);
                    for segment in text.split(['\r', '\n']) {
                        if segment.trim().is_empty() {
                            continue;
                        }
                        let line = OutputLine {
                            origin,
                            line: segment.to_string(),
                        };
                        if line_tx.send(line).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    tracing::debug!(?origin, error = %e, "output pipe read failed");
                    break;
                }
            }
        }
    })
}
