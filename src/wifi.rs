use anyhow::{anyhow, Context, Result};
use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi, WifiDeviceId};
use log::{info, warn};

#[derive(Debug)]
pub struct WifiNetwork<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
    pub auth_method: AuthMethod,
}

impl<'a> WifiNetwork<'a> {
    pub const fn new(ssid: &'a str, password: &'a str) -> Self {
        Self {
            ssid,
            password,
            auth_method: AuthMethod::WPA2Personal,
        }
    }
}

/// Station-mode Wi-Fi that joins the first known network found in a scan.
pub struct WifiManager<'a> {
    networks: &'a [WifiNetwork<'a>],
    wifi: Option<BlockingWifi<EspWifi<'static>>>,
    current_network: Option<&'a WifiNetwork<'a>>,
}

impl<'a> WifiManager<'a> {
    pub fn new(networks: &'a [WifiNetwork<'a>]) -> Self {
        Self {
            networks,
            wifi: None,
            current_network: None,
        }
    }

    pub fn connect(&mut self, modem: Modem) -> Result<()> {
        let sys_loop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take()?;

        let wifi = BlockingWifi::wrap(EspWifi::new(modem, sys_loop.clone(), Some(nvs))?, sys_loop)?;
        self.wifi = Some(wifi);

        // First, scan for available networks
        let available_networks = self.scan_networks()?;
        info!("Found {} available networks", available_networks.len());

        for network in self.networks.iter() {
            if !available_networks.iter().any(|ssid| ssid == network.ssid) {
                continue;
            }
            info!("Attempting to connect to network: {}", network.ssid);

            if let Err(e) = self.connect_to_network(network) {
                warn!("Failed to connect to {}: {}", network.ssid, e);
                continue;
            }

            self.current_network = Some(network);
            info!("Successfully connected to {}", network.ssid);

            info!("IP: {}", self.ip_address()?);

            return Ok(());
        }

        Err(anyhow!("No known networks available"))
    }

    fn scan_networks(&mut self) -> Result<Vec<String>> {
        let wifi = self.wifi.as_mut().context("WiFi not initialized")?;

        // Start WiFi in station mode for scanning
        wifi.set_configuration(&Configuration::Client(ClientConfiguration::default()))?;
        wifi.start()?;

        let ap_infos = wifi.scan()?;
        Ok(ap_infos.iter().map(|ap| ap.ssid.as_str().to_string()).collect())
    }

    fn connect_to_network(&mut self, network: &WifiNetwork) -> Result<()> {
        let wifi = self.wifi.as_mut().context("WiFi not initialized")?;

        let wifi_config = Configuration::Client(ClientConfiguration {
            ssid: network
                .ssid
                .try_into()
                .map_err(|_| anyhow!("SSID too long: {}", network.ssid))?,
            password: network
                .password
                .try_into()
                .map_err(|_| anyhow!("Password too long"))?,
            auth_method: network.auth_method,
            ..Default::default()
        });

        wifi.set_configuration(&wifi_config)?;
        wifi.connect()?;
        wifi.wait_netif_up()?;

        Ok(())
    }

    pub fn ip_address(&self) -> Result<String> {
        let wifi = self.wifi.as_ref().context("WiFi not initialized")?;
        let info = wifi.wifi().sta_netif().get_ip_info()?;
        Ok(info.ip.to_string())
    }

    /// Station MAC as twelve uppercase hex digits, used as the screen id.
    pub fn screen_id(&self) -> Result<String> {
        let wifi = self.wifi.as_ref().context("WiFi not initialized")?;
        let mac = wifi.wifi().get_mac(WifiDeviceId::Sta)?;
        Ok(mac.iter().map(|b| format!("{:02X}", b)).collect())
    }

    pub fn is_connected(&self) -> bool {
        self.current_network.is_some()
    }
}
