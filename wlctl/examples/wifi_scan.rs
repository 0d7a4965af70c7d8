use wlctl::{ControllerConfig, WifiController};

#[tokio::main]
async fn main() -> wlctl::Result<()> {
    let ifname = std::env::var("WIFI_INTERFACE").unwrap_or_else(|_| "wlan0".to_string());
    let mut wifi = WifiController::new(ControllerConfig::new().with_interface(ifname));

    wifi.start().await?;

    println!("Scanning for WiFi networks...");
    let networks = wifi.scan().await?;
    for net in networks {
        println!(
            "{:30} {:>4} dBm  ch {:>3}  {}",
            net.ssid,
            net.signal_level,
            net.channel().unwrap_or(0),
            net.flags
        );
    }

    wifi.stop().await
}
