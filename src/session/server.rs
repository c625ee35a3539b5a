use std::io::{BufRead, Write};

use tracing::{debug, warn};

use crate::session::messages::{Request, Response};
use crate::session::session::Session;

/// Serve NDJSON requests until the input ends: one request object per
/// line in, one response object per line out.
pub fn serve(session: &mut Session, input: impl BufRead, mut output: impl Write) -> std::io::Result<usize> {
    let mut handled = 0;

    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(trimmed) {
            Ok(request) => {
                debug!(action = request.action(), "request received");
                session.handle(request)
            }
            Err(e) => {
                warn!("rejecting malformed request: {}", e);
                Response::failure(format!("invalid request: {}", e))
            }
        };

        let json = serde_json::to_string(&response).map_err(std::io::Error::other)?;
        writeln!(output, "{}", json)?;
        output.flush()?;
        handled += 1;
    }

    Ok(handled)
}
