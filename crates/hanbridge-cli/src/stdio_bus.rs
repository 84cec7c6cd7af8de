//! JSON-lines bus adapter.
//!
//! Each stdin line is one [`BusRequest`]; each [`BusEvent`] is written to
//! stdout as one line:
//!
//! ```text
//! <- {"instance":"porch","class":"sensor","type":"basic","fields":{"request":"current"}}
//! -> {"kind":"status","instance":"porch","class":"sensor","type":"basic","fields":{"device":"0","type":"temp","current":"21","units":"celsius"}}
//! ```

use hanbridge_gateway::{BusEvent, BusRequest};
use std::io::BufRead;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Parse one input line. Blank lines and bad JSON yield `None`.
pub fn parse_request(line: &str) -> Option<BusRequest> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match serde_json::from_str(line) {
        Ok(request) => Some(request),
        Err(e) => {
            warn!(line, "Ignoring unparsable bus request: {}", e);
            None
        }
    }
}

/// Read requests from stdin on a dedicated thread.
///
/// The thread stops on EOF or once the receiver is dropped; a read still
/// blocked at shutdown ends with the process.
pub fn spawn_request_reader(tx: mpsc::Sender<BusRequest>) -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("stdin-bus".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("Cannot read stdin: {}", e);
                        break;
                    }
                };
                if let Some(request) = parse_request(&line)
                    && tx.blocking_send(request).is_err()
                {
                    break;
                }
            }
            debug!("Bus request reader finished");
        })
}

/// Write events to stdout until every sender is gone.
///
/// # Errors
///
/// Returns the first I/O error writing to stdout.
pub async fn write_events(mut events: mpsc::UnboundedReceiver<BusEvent>) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();

    while let Some(event) = events.recv().await {
        let mut line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                warn!(instance = %event.instance_id, "Cannot serialize event: {}", e);
                continue;
            }
        };
        line.push('\n');
        stdout.write_all(line.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}
