use clap::Parser;
use std::time::Duration;

use crate::codec::{FrameCodec, DEFAULT_MAX_FRAME_SIZE};
use crate::reply::{ReplyEncoder, DEFAULT_SIMPLE_STRING_THRESHOLD};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Server settings, read from the command line with environment variable fallbacks.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "simpledb", version, about = "An in-memory Redis-like key-value server")]
pub struct Config {
    /// The address to listen on
    #[arg(long, env = "SIMPLEDB_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// The port to listen on
    #[arg(short, long, env = "SIMPLEDB_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Seconds to wait for the next request before closing the connection, 0 waits forever
    #[arg(long, env = "SIMPLEDB_READ_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub read_timeout: u64,

    /// Seconds allowed for writing a reply, 0 waits forever
    #[arg(long, env = "SIMPLEDB_WRITE_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub write_timeout: u64,

    /// Text replies up to this many bytes are sent as simple strings
    #[arg(long, env = "SIMPLEDB_SIMPLE_STRING_THRESHOLD", default_value_t = DEFAULT_SIMPLE_STRING_THRESHOLD)]
    pub simple_string_threshold: usize,

    /// Largest request, in bytes, a client may send
    #[arg(long, env = "SIMPLEDB_MAX_FRAME_SIZE", default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            read_timeout: DEFAULT_TIMEOUT_SECS,
            write_timeout: DEFAULT_TIMEOUT_SECS,
            simple_string_threshold: DEFAULT_SIMPLE_STRING_THRESHOLD,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl Config {
    pub fn read_timeout(&self) -> Option<Duration> {
        seconds(self.read_timeout)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        seconds(self.write_timeout)
    }

    pub fn codec(&self) -> FrameCodec {
        FrameCodec::new(
            self.max_frame_size,
            ReplyEncoder::new(self.simple_string_threshold),
        )
    }
}

fn seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_parsed_defaults() {
        let parsed = Config::try_parse_from(["simpledb"]).unwrap();

        assert_eq!(parsed, Config::default());

        assert_eq!(parsed.host, DEFAULT_HOST);
        assert_eq!(parsed.port, DEFAULT_PORT);
        assert_eq!(parsed.read_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "simpledb",
            "--host",
            "0.0.0.0",
            "-p",
            "7000",
            "--read-timeout",
            "0",
            "--simple-string-threshold",
            "10",
        ])
        .unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 7000);
        assert_eq!(config.read_timeout(), None);
        assert_eq!(config.write_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.simple_string_threshold, 10);
    }

    #[test]
    fn invalid_port_is_rejected() {
        assert!(Config::try_parse_from(["simpledb", "--port", "70000"]).is_err());
    }
}
