//! `SCAN_RESULTS` parsing.
//!
//! The daemon answers with a header line followed by one tab-separated row
//! per BSS:
//!
//! ```text
//! bssid / frequency / signal level / flags / ssid
//! 00:11:22:33:44:55	2437	-47	[WPA2-PSK-CCMP][ESS]	lab-net
//! ```
//!
//! Rows that do not match the expected shape (header, hidden networks with an
//! empty SSID, truncated lines) are skipped.

use log::trace;

use crate::models::ScannedNetwork;

/// Parses a `SCAN_RESULTS` reply into networks, in reply order.
pub fn parse_scan_results(text: &str) -> Vec<ScannedNetwork> {
    text.lines().filter_map(parse_row).collect()
}

fn parse_row(line: &str) -> Option<ScannedNetwork> {
    let [bssid, frequency_raw, level_raw, flags, ssid] = split_columns(line)?;

    if !is_bssid(bssid) {
        trace!("Skipping scan row: {line}");
        return None;
    }

    if frequency_raw.len() != 4 {
        return None;
    }
    let frequency = frequency_raw.parse::<u32>().ok()?;

    if !level_raw.starts_with('-') {
        return None;
    }
    let signal_level = level_raw.parse::<i32>().ok()?;

    if flags.is_empty() || ssid.is_empty() {
        return None;
    }

    Some(ScannedNetwork {
        bssid: bssid.to_string(),
        frequency,
        signal_level,
        flags: flags.to_string(),
        ssid: ssid.to_string(),
    })
}

/// Splits a row into its four leading columns and the SSID.
///
/// Columns are normally tab-separated, but some tools re-emit the table with
/// spaces; the SSID is whatever follows the fourth column and may itself
/// contain spaces.
fn split_columns(line: &str) -> Option<[&str; 5]> {
    let mut columns = [""; 5];
    let mut rest = line;
    for column in columns.iter_mut().take(4) {
        rest = rest.trim_start();
        let end = rest.find(char::is_whitespace)?;
        *column = &rest[..end];
        rest = &rest[end..];
    }
    columns[4] = rest.trim();
    Some(columns)
}

/// Six lowercase hex octets separated by colons.
fn is_bssid(s: &str) -> bool {
    let octets: Vec<&str> = s.split(':').collect();
    octets.len() == 6
        && octets.iter().all(|o| {
            o.len() == 2
                && o
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = "bssid / frequency / signal level / flags / ssid\n\
        00:11:22:33:44:55\t2437\t-47\t[WPA2-PSK-CCMP][ESS]\tlab-net\n\
        66:77:88:99:aa:bb\t5180\t-71\t[ESS]\tguest wifi\n\
        cc:dd:ee:ff:00:11\t2412\t-80\t[WPA-PSK-TKIP][ESS]\t\n";

    #[test]
    fn parses_rows_and_skips_header_and_hidden() {
        let nets = parse_scan_results(REPLY);
        assert_eq!(nets.len(), 2);

        assert_eq!(nets[0].bssid, "00:11:22:33:44:55");
        assert_eq!(nets[0].frequency, 2437);
        assert_eq!(nets[0].signal_level, -47);
        assert_eq!(nets[0].flags, "[WPA2-PSK-CCMP][ESS]");
        assert_eq!(nets[0].ssid, "lab-net");

        assert_eq!(nets[1].ssid, "guest wifi");
        assert_eq!(nets[1].channel(), Some(36));
        assert!(!nets[1].is_secured());
    }

    #[test]
    fn parses_space_separated_rows() {
        let nets = parse_scan_results("00:11:22:33:44:55  2462  -55  [WEP][ESS]  office\n");
        assert_eq!(nets.len(), 1);
        assert_eq!(nets[0].frequency, 2462);
        assert_eq!(nets[0].ssid, "office");
    }

    #[test]
    fn rejects_malformed_rows() {
        // Uppercase BSSID, positive level, short frequency, missing columns.
        let text = "00:11:22:33:44:5G\t2437\t-47\t[ESS]\ta\n\
            00:11:22:33:44:55\t2437\t47\t[ESS]\tb\n\
            00:11:22:33:44:55\t243\t-47\t[ESS]\tc\n\
            00:11:22:33:44:55\t2437\n";
        assert!(parse_scan_results(text).is_empty());
    }

    #[test]
    fn empty_reply_yields_nothing() {
        assert!(parse_scan_results("").is_empty());
        assert!(parse_scan_results("bssid / frequency / signal level / flags / ssid\n").is_empty());
    }

    #[test]
    fn split_columns_keeps_spaces_in_ssid() {
        assert_eq!(
            split_columns("00:11:22:33:44:55\t2437\t-47\t[ESS]\tmy home net"),
            Some(["00:11:22:33:44:55", "2437", "-47", "[ESS]", "my home net"])
        );
        assert_eq!(split_columns("00:11:22:33:44:55\t2437"), None);
    }

    #[test]
    fn is_bssid_checks_shape() {
        assert!(is_bssid("0a:1b:2c:3d:4e:5f"));
        assert!(!is_bssid("0A:1B:2C:3D:4E:5F"));
        assert!(!is_bssid("0a:1b:2c:3d:4e"));
        assert!(!is_bssid("0a1b2c3d4e5f"));
    }
}
