use clap::Parser;
use ptyrelay_config::RelayConfig;
use std::path::PathBuf;

/// Serve an interactive program's terminal over TCP.
#[derive(Parser, Debug)]
#[command(name = "ptyrelay", version, about)]
pub struct Args {
    /// Address to bind to [default: 0.0.0.0].
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on [default: 9867].
    #[arg(long)]
    pub port: Option<u16>,

    /// Program to run for each connection, instead of the configured one.
    #[arg(short = 'e', long)]
    pub command: Option<String>,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level override (e.g. `debug`, `ptyrelay=trace`).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Write a commented default config file and exit.
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut RelayConfig) {
        if let Some(host) = &self.host {
            config.listen.host = host.clone();
        }
        if let Some(port) = self.port {
            config.listen.port = port;
        }
        if let Some(command) = &self.command {
            config.session.program = command.clone();
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_keep_config() {
        let args = Args::try_parse_from(["ptyrelay"]).unwrap();
        let mut config = RelayConfig::default();
        args.apply(&mut config);
        assert_eq!(config.listen.address(), "0.0.0.0:9867");
        assert_eq!(config.session.program, "./launch.sh");
        assert!(!args.init_config);
    }

    #[test]
    fn flags_override_config() {
        let args = Args::try_parse_from([
            "ptyrelay",
            "--host",
            "127.0.0.1",
            "--port",
            "7000",
            "--command",
            "/usr/bin/top",
        ])
        .unwrap();
        let mut config = RelayConfig::default();
        args.apply(&mut config);
        assert_eq!(config.listen.address(), "127.0.0.1:7000");
        assert_eq!(config.session.program, "/usr/bin/top");
    }

    #[test]
    fn rejects_invalid_port() {
        assert!(Args::try_parse_from(["ptyrelay", "--port", "70000"]).is_err());
        assert!(Args::try_parse_from(["ptyrelay", "--port", "abc"]).is_err());
    }
}
