//! ANSI terminal escape sequences.

pub const RESET: &str = "\x1b[0m";

pub const BLACK: &str = "\x1b[30m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const BLUE: &str = "\x1b[34m";
pub const PURPLE: &str = "\x1b[35m";
pub const CYAN: &str = "\x1b[36m";
pub const WHITE: &str = "\x1b[37m";

pub const BRIGHT_BLACK: &str = "\x1b[90m";
pub const BRIGHT_RED: &str = "\x1b[91m";
pub const BRIGHT_GREEN: &str = "\x1b[92m";
pub const BRIGHT_YELLOW: &str = "\x1b[93m";
pub const BRIGHT_BLUE: &str = "\x1b[94m";
pub const BRIGHT_PURPLE: &str = "\x1b[95m";
pub const BRIGHT_CYAN: &str = "\x1b[96m";
pub const BRIGHT_WHITE: &str = "\x1b[97m";

pub const BOLD: &str = "\x1b[1m";
pub const BOLD_BRIGHT_BLUE: &str = "\x1b[1;94m";
pub const BOLD_BRIGHT_GREEN: &str = "\x1b[1;92m";
pub const BOLD_BRIGHT_RED: &str = "\x1b[1;91m";
pub const BOLD_BRIGHT_YELLOW: &str = "\x1b[1;93m";
pub const BOLD_BRIGHT_PURPLE: &str = "\x1b[1;95m";

pub const UNDERLINE: &str = "\x1b[4m";
pub const DIM: &str = "\x1b[2m";
/// Ends [`DIM`] without resetting colours.
pub const DIM_END: &str = "\x1b[22m";

#[test]
fn test_sequences_are_well_formed() {
    for seq in [RESET, RED, BRIGHT_WHITE, BOLD_BRIGHT_PURPLE, UNDERLINE, DIM, DIM_END] {
        assert!(seq.starts_with("\x1b[") && seq.ends_with('m'), "{seq:?}");
    }
    assert_eq!(BRIGHT_BLUE, "\x1b[94m");
}
