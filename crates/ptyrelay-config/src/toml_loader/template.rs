//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# ptyrelay configuration
# Only override what you want to change -- missing fields use defaults.

[listen]
# host = "0.0.0.0"
# port = 9867
# backlog = 5             # 1-1024

[session]
# program = "./launch.sh"
# args = []
# working_directory = "/path/to/game"
# rows = 43               # until the peer sends ESC[8;rows;colst
# cols = 80
# chunk_size = 4096       # 512-1048576 bytes

[session.env]
# LANG = "C.UTF-8"

[shutdown]
# poll_interval_ms = 500     # 10-60000
# interrupt_grace_ms = 5000  # wait after Ctrl+C / SIGINT
# terminate_grace_ms = 2000  # wait after SIGTERM
# kill_grace_ms = 1000       # wait for exit after SIGKILL
"##
    .to_string()
}
