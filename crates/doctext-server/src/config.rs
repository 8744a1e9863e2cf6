//! Command-line configuration for the document server binary.

use clap::Parser;
use doctext_sync::SessionConfig;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "doctext-server")]
#[command(about = "Real-time collaborative plain-text document service")]
pub struct Args {
    /// Address to bind the WebSocket/HTTP listener on.
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// Maximum size of a single inbound frame, in bytes.
    #[arg(long, default_value_t = 1024 * 1024)]
    pub max_frame_bytes: usize,

    /// Milliseconds of inactivity before a peer is marked idle.
    #[arg(long, default_value_t = 30_000)]
    pub stale_threshold_ms: u64,

    /// Milliseconds of inactivity before a peer is evicted.
    #[arg(long, default_value_t = 60_000)]
    pub evict_threshold_ms: u64,

    /// Delay before tearing down a document session with no connections.
    #[arg(long, default_value_t = 0)]
    pub session_cleanup_delay_ms: u64,

    /// Maximum number of concurrently open document sessions.
    #[arg(long, default_value_t = 10_000)]
    pub max_concurrent_sessions: usize,

    /// Maximum number of peers in a single document session.
    #[arg(long, default_value_t = 256)]
    pub max_peers_per_session: usize,

    /// Interval, in seconds, between idle/eviction sweeps.
    #[arg(long, default_value_t = 10)]
    pub sweep_interval_secs: u64,

    /// Enable verbose debug logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            stale_threshold: Duration::from_millis(self.stale_threshold_ms),
            evict_threshold: Duration::from_millis(self.evict_threshold_ms),
            session_cleanup_delay: Duration::from_millis(self.session_cleanup_delay_ms),
            max_frame_bytes: self.max_frame_bytes,
            max_concurrent_sessions: self.max_concurrent_sessions,
            max_peers_per_session: self.max_peers_per_session,
            ..SessionConfig::default()
        }
    }
}
