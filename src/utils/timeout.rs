//! Default timing constants for connection and request deadlines.

use std::time::Duration;

/// How long an outstanding request waits for a matching reply.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a TCP connect plus remote handshake may take.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
