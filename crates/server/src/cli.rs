use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::config::{
    parse_timeout_ms, BridgeConfig, DEFAULT_BRIDGE_URL, DEFAULT_HTTP_BIND, ENV_BRIDGE_TIMEOUT_MS,
    ENV_BRIDGE_URL, ENV_HTTP,
};

/// Command-line interface for the `wamcp` gateway.
#[derive(Debug, Parser)]
#[command(
    name = "wamcp",
    version,
    about = "MCP gateway exposing a WhatsApp bridge with trimmed, cached responses"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Bridge connection flags shared by every command that talks to the bridge.
#[derive(Debug, Clone, Args)]
pub struct BridgeArgs {
    /// Base URL of the WhatsApp bridge.
    #[arg(long, env = ENV_BRIDGE_URL, default_value = DEFAULT_BRIDGE_URL, value_name = "URL")]
    pub bridge_url: String,
    /// Timeout for a single bridge request, in milliseconds (default 60000).
    ///
    /// Unparsable values fall back to the default, as they do for the bare
    /// `wamcp` invocation.
    #[arg(long, env = ENV_BRIDGE_TIMEOUT_MS, value_name = "MILLIS")]
    pub timeout_ms: Option<String>,
}

impl BridgeArgs {
    /// Resolves the flags into a validated bridge configuration.
    pub fn config(&self) -> Result<BridgeConfig> {
        BridgeConfig::new(
            &self.bridge_url,
            parse_timeout_ms(self.timeout_ms.as_deref()),
        )
    }
}

/// Available `wamcp` commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Runs the MCP server (stdio unless `--http` is given).
    Serve {
        #[command(flatten)]
        bridge: BridgeArgs,
        /// Serve Streamable HTTP (plus `/health`) instead of stdio.
        ///
        /// A bare `--http` binds the default address.
        #[arg(
            long,
            env = ENV_HTTP,
            value_name = "ADDR",
            num_args = 0..=1,
            default_missing_value = DEFAULT_HTTP_BIND
        )]
        http: Option<String>,
    },
    /// Prints the tool names and descriptions the server advertises.
    Tools,
    /// Runs one status check against the bridge and prints the result.
    Status {
        #[command(flatten)]
        bridge: BridgeArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TIMEOUT_MS;
    use serial_test::serial;
    use std::time::Duration;

    struct EnvVarGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            if let Some(v) = &self.previous {
                std::env::set_var(self.key, v);
            } else {
                std::env::remove_var(self.key);
            }
        }
    }

    fn set_env_var(key: &'static str, value: Option<&str>) -> EnvVarGuard {
        let previous = std::env::var(key).ok();
        if let Some(v) = value {
            std::env::set_var(key, v);
        } else {
            std::env::remove_var(key);
        }
        EnvVarGuard { key, previous }
    }

    #[test]
    #[serial]
    fn unparsable_timeout_env_falls_back_to_default() {
        let _timeout = set_env_var(ENV_BRIDGE_TIMEOUT_MS, Some("soon"));

        for command in ["serve", "status"] {
            let cli = Cli::try_parse_from(["wamcp", command]).unwrap();
            let bridge = match cli.command {
                Some(Commands::Serve { bridge, .. }) | Some(Commands::Status { bridge }) => bridge,
                other => panic!("unexpected command: {other:?}"),
            };
            let config = bridge.config().unwrap();
            assert_eq!(config.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
        }
    }

    #[test]
    #[serial]
    fn timeout_env_is_used_when_valid() {
        let _timeout = set_env_var(ENV_BRIDGE_TIMEOUT_MS, Some("1500"));

        let cli = Cli::try_parse_from(["wamcp", "status"]).unwrap();
        match cli.command {
            Some(Commands::Status { bridge }) => {
                assert_eq!(bridge.config().unwrap().timeout, Duration::from_millis(1500));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_accepts_http_and_bridge_flags() {
        let cli = Cli::try_parse_from([
            "wamcp",
            "serve",
            "--http",
            "127.0.0.1:8001",
            "--bridge-url",
            "http://bridge:3000",
            "--timeout-ms",
            "2500",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Serve { bridge, http }) => {
                assert_eq!(http.as_deref(), Some("127.0.0.1:8001"));
                assert_eq!(bridge.bridge_url, "http://bridge:3000");
                assert_eq!(bridge.timeout_ms.as_deref(), Some("2500"));
                let config = bridge.config().unwrap();
                assert_eq!(config.timeout, Duration::from_millis(2500));
                assert_eq!(config.base_url.as_str(), "http://bridge:3000/");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn bare_http_flag_uses_default_bind() {
        let cli = Cli::try_parse_from(["wamcp", "serve", "--http"]).unwrap();
        match cli.command {
            Some(Commands::Serve { http, .. }) => {
                assert_eq!(http.as_deref(), Some(DEFAULT_HTTP_BIND));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn bad_bridge_url_is_rejected() {
        let bridge = BridgeArgs {
            bridge_url: "::nope::".into(),
            timeout_ms: Some("10".into()),
        };
        assert!(bridge.config().is_err());
    }

    #[test]
    fn no_subcommand_parses() {
        let cli = Cli::try_parse_from(["wamcp"]).unwrap();
        assert!(cli.command.is_none());
    }
}
