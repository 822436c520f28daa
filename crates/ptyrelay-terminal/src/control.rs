//! Terminal control sequences the relay sends to the peer.

/// Switch to the alternate screen buffer.
pub const ENTER_ALT_SCREEN: &[u8] = b"\x1b[?1049h";
/// Return to the primary screen buffer.
pub const EXIT_ALT_SCREEN: &[u8] = b"\x1b[?1049l";
pub const HIDE_CURSOR: &[u8] = b"\x1b[?25l";
pub const SHOW_CURSOR: &[u8] = b"\x1b[?25h";
pub const CLEAR_SCREEN: &[u8] = b"\x1b[2J";

/// Keyboard interrupt (Ctrl+C) as the line discipline sees it.
pub const INTERRUPT: u8 = 0x03;

/// Sent once when a session starts, in order.
pub const SESSION_START: [&[u8]; 3] = [ENTER_ALT_SCREEN, HIDE_CURSOR, CLEAR_SCREEN];

/// Sent once when a session ends, in order.
pub const SESSION_END: [&[u8]; 2] = [SHOW_CURSOR, EXIT_ALT_SCREEN];

/// Concatenate a list of sequences into a single write.
pub fn concat(sequences: &[&[u8]]) -> Vec<u8> {
    sequences.iter().flat_map(|s| s.iter().copied()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_start_sequence() {
        assert_eq!(concat(&SESSION_START), b"\x1b[?1049h\x1b[?25l\x1b[2J".to_vec());
    }

    #[test]
    fn session_end_restores_cursor_before_leaving_alt_screen() {
        assert_eq!(concat(&SESSION_END), b"\x1b[?25h\x1b[?1049l".to_vec());
    }
}
