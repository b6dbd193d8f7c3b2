//! Forwarding server CLI configuration (`fship_srv -h -d -l <url> -M <MB>`).

use clap::Parser;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid listen URL {0:?}")]
    InvalidUrl(String),
}

/// Send/receive arenas are each sized to half of `max_mem_mb`.
#[derive(Parser, Debug, Clone)]
#[command(name = "fship_srv", about = "Forwarding server for the databroker client/backend protocol")]
pub struct ServerConfig {
    /// Run as a daemon (forks and exits the parent).
    #[arg(short = 'd', long = "daemon")]
    pub daemon: bool,

    /// Listen URL.
    #[arg(short = 'l', long = "listen", default_value = "localhost:0")]
    pub listen_url: String,

    /// Total buffering memory budget, in MiB. Split evenly between the receive and send arenas.
    #[arg(short = 'M', long = "max-mem", default_value_t = 512)]
    pub max_mem_mb: usize,
}

impl ServerConfig {
    pub fn r_buf_capacity(&self) -> usize {
        (self.max_mem_mb / 2).max(1) * 1024 * 1024
    }

    pub fn s_buf_capacity(&self) -> usize {
        self.r_buf_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_cli_contract() {
        let cfg = ServerConfig::parse_from(["fship_srv"]);
        assert!(!cfg.daemon);
        assert_eq!(cfg.listen_url, "localhost:0");
        assert_eq!(cfg.max_mem_mb, 512);
    }

    #[test]
    fn buffer_capacities_split_max_mem_in_half() {
        let cfg = ServerConfig::parse_from(["fship_srv", "-M", "10"]);
        assert_eq!(cfg.r_buf_capacity(), 5 * 1024 * 1024);
        assert_eq!(cfg.s_buf_capacity(), 5 * 1024 * 1024);
    }

    #[test]
    fn daemon_and_listen_flags_parse() {
        let cfg = ServerConfig::parse_from(["fship_srv", "-d", "-l", "0.0.0.0:9000"]);
        assert!(cfg.daemon);
        assert_eq!(cfg.listen_url, "0.0.0.0:9000");
    }
}
