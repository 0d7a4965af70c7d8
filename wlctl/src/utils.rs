//! Utility functions for command formatting and Wi-Fi data conversion.

use crate::constants::frequency;

/// Converts a Wi-Fi frequency in MHz to a channel number.
///
/// Supports 2.4GHz (channels 1-14), 5GHz, and 6GHz bands.
/// Returns `None` for frequencies outside known Wi-Fi bands.
pub(crate) fn channel_from_freq(mhz: u32) -> Option<u16> {
    match mhz {
        frequency::BAND_2_4_START..=frequency::BAND_2_4_END => {
            Some(((mhz - frequency::BAND_2_4_START) / frequency::CHANNEL_SPACING + 1) as u16)
        }
        frequency::BAND_2_4_CH14 => Some(14),
        frequency::BAND_5_START..=frequency::BAND_5_END => {
            Some(((mhz - frequency::BAND_5_START) / frequency::CHANNEL_SPACING) as u16)
        }
        frequency::BAND_6_START..=frequency::BAND_6_END => {
            Some(((mhz - frequency::BAND_6_START) / frequency::CHANNEL_SPACING + 1) as u16)
        }
        _ => None,
    }
}

/// Wraps a value in double quotes, as the daemon expects for string settings.
pub(crate) fn quoted(value: &str) -> String {
    format!("\"{value}\"")
}

/// Hides secrets before a command is written to the log.
///
/// `SET_NETWORK <id> psk "..."` becomes `SET_NETWORK <id> psk <redacted>`.
pub(crate) fn redact_command(command: &str) -> String {
    let mut parts = command.splitn(4, ' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(verb), Some(id), Some(field)) if field == "psk" => {
            format!("{verb} {id} {field} <redacted>")
        }
        _ => command.to_string(),
    }
}

/// Returns the first line of a reply, trimmed.
pub(crate) fn first_line(reply: &str) -> &str {
    reply.lines().next().unwrap_or("").trim()
}
