#[cfg(target_os = "espidf")]
mod esp_http;
#[cfg(target_os = "espidf")]
mod panel;
#[cfg(target_os = "espidf")]
mod pins;
#[cfg(target_os = "espidf")]
mod wifi;

#[cfg(target_os = "espidf")]
use device::run;
#[cfg(not(target_os = "espidf"))]
use preview::run;

fn main() -> anyhow::Result<()> {
    run()
}

// https://docs.esp-rs.org/esp-idf-svc/esp_idf_svc/
#[cfg(target_os = "espidf")]
mod device {
    use std::time::{Duration, Instant, SystemTime};

    use anyhow::{Context, Result};
    use chrono::{DateTime, FixedOffset, Utc};
    use esp_idf_svc::hal::delay::{Delay, FreeRtos};
    use esp_idf_svc::hal::gpio::{self, PinDriver, Pull};
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::hal::prelude::*;
    use esp_idf_svc::hal::spi;
    use esp_idf_svc::sntp::{EspSntp, SyncStatus};
    use log::{error, info, warn};

    use living_clock::app::Appliance;
    use living_clock::config::{AppConfig, DisplayGeometry};
    use living_clock::fetch::{AssetBuffer, AssetFetcher};
    use living_clock::http::HttpConnection;
    use living_clock::pipeline::DisplaySink;
    use living_clock::poem::PoemTown;
    use living_clock::render::{EpaperSink, FontBook, Panel};
    use living_clock::time_index::TimeIndex;

    use crate::esp_http::EspHttp;
    use crate::panel::{EpdPanel, PANEL_HEIGHT, PANEL_WIDTH};
    use crate::pins::Pins;
    use crate::wifi::{WifiManager, WifiNetwork};

    const POLL_MS: u32 = 10;
    const SNTP_WAIT_MS: u32 = 30_000;
    const API_TIMEOUT: Duration = Duration::from_secs(10);
    const ASSET_TIMEOUT: Duration = Duration::from_secs(30);

    fn show<P: Panel>(display: &mut EpaperSink<P>, message: &str) {
        info!("{}", message);
        if let Err(e) = display.show_status(message) {
            error!("Status screen failed: {}", e);
        }
    }

    fn fetch_font<C: HttpConnection>(
        fetcher: &mut AssetFetcher<C>,
        url: &str,
        max_size: usize,
    ) -> Option<Vec<u8>> {
        match fetcher.fetch(url, max_size) {
            Ok(buffer) => Some(AssetBuffer::into_vec(buffer)),
            Err(e) => {
                warn!("Font {} unavailable: {}", url, e);
                None
            }
        }
    }

    pub fn run() -> Result<()> {
        // It is necessary to call this function once. Otherwise some patches to the runtime
        // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
        esp_idf_svc::sys::link_patches();

        // Bind the log crate to the ESP Logging facilities
        esp_idf_svc::log::EspLogger::initialize_default();

        let config = AppConfig {
            geometry: DisplayGeometry {
                width: PANEL_WIDTH,
                height: PANEL_HEIGHT,
                ..DisplayGeometry::default()
            },
            ..AppConfig::default()
        };

        let peripherals = Peripherals::take().context("Could not take peripherals")?;
        let pins = peripherals.pins;

        info!(
            "Panel on SCK {} MOSI {} CS {}, button on {}",
            Pins::SCK,
            Pins::MOSI,
            Pins::CS,
            Pins::BUTTON
        );
        let driver = spi::SpiDeviceDriver::new_single(
            peripherals.spi2,
            pins.gpio12,                    // Pins::SCK
            pins.gpio11,                    // Pins::MOSI
            Option::<gpio::AnyIOPin>::None, // No MISO needed for display
            Some(pins.gpio45),              // Pins::CS
            &spi::SpiDriverConfig::new(),
            &spi::SpiConfig::new().baudrate(4.MHz().into()),
        )
        .context("Could not create SPI device driver")?;

        let mut power_pin = PinDriver::output(pins.gpio7)?; // Pins::PANEL_POWER
        power_pin.set_high()?;
        Delay::default().delay_ms(100);

        let panel = EpdPanel::new(
            driver,
            PinDriver::input(pins.gpio48)?,  // Pins::BSY
            PinDriver::output(pins.gpio46)?, // Pins::DC
            PinDriver::output(pins.gpio47)?, // Pins::RST
            Delay::default(),
        )?;
        let mut display = EpaperSink::new(panel, FontBook::default(), config.geometry);

        show(&mut display, "Connecting to WiFi...");
        let networks = [WifiNetwork::new(
            &config.device.wifi_ssid,
            &config.device.wifi_password,
        )];
        let mut wifi = WifiManager::new(&networks);
        if let Err(e) = wifi.connect(peripherals.modem) {
            show(&mut display, "WiFi connection failed");
            return Err(e);
        }

        show(&mut display, "Syncing time...");
        let sntp = EspSntp::new_default()?;
        let mut waited = 0;
        while sntp.get_sync_status() != SyncStatus::Completed {
            if waited >= SNTP_WAIT_MS {
                warn!("Time not synced after {} ms, continuing", waited);
                break;
            }
            FreeRtos::delay_ms(100);
            waited += 100;
        }
        let offset = FixedOffset::east_opt(config.device.utc_offset_secs)
            .context("UTC offset out of range")?;
        let wall = move || DateTime::<Utc>::from(SystemTime::now()).with_timezone(&offset);

        let screen_id = wifi.screen_id()?;
        let mut poems = PoemTown::new(
            EspHttp::new(API_TIMEOUT),
            config.endpoints.clone(),
            screen_id,
            config.limits.json,
        );
        if let Err(e) = poems.register() {
            warn!("Registration failed: {}", e);
        }

        show(&mut display, "Loading fonts...");
        let mut fetcher = AssetFetcher::new(EspHttp::new(ASSET_TIMEOUT));
        let sans = fetch_font(&mut fetcher, &config.endpoints.sans_font_url, config.limits.sans_font);
        let serif = fetch_font(
            &mut fetcher,
            &config.endpoints.serif_font_url,
            config.limits.serif_font,
        );
        display.set_fonts(FontBook::from_buffers(sans, serif));

        show(&mut display, "Loading time index...");
        let index = match fetcher
            .fetch(&config.endpoints.index_url, config.limits.index)
            .and_then(|body| TimeIndex::from_json(&body, &config.geometry))
        {
            Ok(index) => index,
            Err(e) => {
                error!("Time index unavailable: {}", e);
                show(&mut display, "Failed to load time index");
                loop {
                    FreeRtos::delay_ms(60_000);
                }
            }
        };
        drop(fetcher);

        let mut button = PinDriver::input(pins.gpio1)?; // Pins::BUTTON
        button.set_pull(Pull::Up)?;

        let mut app = Appliance::new(index, EspHttp::new(ASSET_TIMEOUT), poems, display, &config);
        info!("Ready");

        let start = Instant::now();
        loop {
            let now_ms = start.elapsed().as_millis() as u64;
            app.tick(now_ms, button.is_low(), &wall());
            FreeRtos::delay_ms(POLL_MS);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod preview {
    use std::time::SystemTime;

    use anyhow::{Context, Result};
    use chrono::{DateTime, FixedOffset, Utc};
    use living_clock::config::AppConfig;
    use living_clock::layout::layout;
    use living_clock::poem::{normalize, PoemContent};
    use living_clock::time_index::{TimeCode, TimeIndex};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const USAGE: &str = "usage: living-clock <index.json> [HHMM] [poem]";

    /// Resolve a time code against an index file and print the chosen image and
    /// the poem layout, measured with a half-em fixed advance.
    pub fn run() -> Result<()> {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

        let config = AppConfig::default();
        let mut args = std::env::args().skip(1);
        let path = args.next().context(USAGE)?;
        let bytes = std::fs::read(&path).with_context(|| format!("Could not read {}", path))?;
        let index = TimeIndex::from_json(&bytes, &config.geometry)?;

        let code = match args.next() {
            Some(code) => code.parse::<TimeCode>()?,
            None => {
                let offset = FixedOffset::east_opt(config.device.utc_offset_secs)
                    .context("UTC offset out of range")?;
                let now = DateTime::<Utc>::from(SystemTime::now()).with_timezone(&offset);
                TimeCode::from_time(&now)
            }
        };
        let poem = match args.next() {
            Some(text) => normalize(&text),
            None => PoemContent::fallback().display_text(),
        };

        let (entry, distance) = index.nearest(code).context("Index has no entries")?;
        println!("{} -> {} (distance {})", code, entry.code, distance);

        let mut rng = StdRng::from_entropy();
        let candidate = index
            .find_nearest(code, &mut rng)
            .context("Index has no entries")?;
        let region = candidate.text_region(&config.geometry);
        println!("image  {}", candidate.url);
        println!(
            "region {}x{} at ({}, {}){}",
            region.width,
            region.height,
            region.x,
            region.y,
            if candidate.zone.is_some() { "" } else { " from strip" }
        );

        let measure = |text: &str, size: u32| text.chars().count() as u32 * size / 2;
        let result = layout(&poem, region, &config.poem_layout, &measure);
        println!(
            "font   {}{}",
            result.font_size,
            if result.fits { "" } else { " (overflows)" }
        );
        for line in &result.lines {
            println!("  ({:>4}, {:>4}) {}", line.x, line.y, line.text);
        }

        Ok(())
    }
}
