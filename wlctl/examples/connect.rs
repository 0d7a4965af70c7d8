/// Example connecting to a network with custom timeouts, then checking that
/// the link stayed up before releasing it.
///
/// Reads the network from `WIFI_SSID`, `WIFI_ENCRYPTION` (`NONE`, `WPA`,
/// `WPA2` or `WPA-WPA2`) and `WIFI_PASSWORD`.
use std::time::Duration;
use wlctl::{ControllerConfig, Encryption, WifiController};

#[tokio::main]
async fn main() -> wlctl::Result<()> {
    let ssid = std::env::var("WIFI_SSID").unwrap_or_else(|_| "MyNetwork".to_string());
    let encryption: Encryption = std::env::var("WIFI_ENCRYPTION")
        .unwrap_or_else(|_| "WPA2".to_string())
        .parse()?;
    let key = std::env::var("WIFI_PASSWORD").ok();

    // Slow access points can take a while to associate
    let config = ControllerConfig::new()
        .with_interface("wlan0")
        .with_connect_timeout(Duration::from_secs(30))
        .with_disconnect_timeout(Duration::from_secs(10));

    let mut wifi = WifiController::new(config);
    println!(
        "Controlling {} (connect timeout {:?})",
        wifi.interface().unwrap_or("?"),
        wifi.config().connect_timeout
    );

    wifi.start().await?;

    println!("Connecting to {ssid}...");
    let id = wifi.connect(&ssid, encryption, key.as_deref(), None).await?;
    println!("Connected as network {id}");

    tokio::time::sleep(Duration::from_secs(5)).await;

    if wifi.check_connection(false)? {
        println!("Link stayed up");
    } else {
        println!("Link dropped while we were away");
    }

    wifi.disconnect(false, Some(id)).await?;
    wifi.stop().await?;
    println!("Done");

    Ok(())
}
