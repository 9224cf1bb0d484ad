#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_net::StackResources;
use embassy_time::{Duration, Instant, Timer};
use esp_hal::clock::CpuClock;
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info};
use static_cell::StaticCell;

use thrust_core::config::StandConfig;
use thrust_core::sampler::Sampler;
use thrust_core::sensors::Sensor;
use thrust_firmware::access_point;
use thrust_firmware::app_state::{self, FirmwareStand, StandLoadCell};
use thrust_firmware::net::{
    self, HTTP_PORT, HTTP_WORKER_COUNT, access_point_task, dhcp_task, http_worker, net_task,
};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

/// HTTP workers, DHCP and one spare for the dashboard's next poll
const SOCKET_COUNT: usize = HTTP_WORKER_COUNT + 2;

static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
static NET_RESOURCES: StaticCell<StackResources<SOCKET_COUNT>> = StaticCell::new();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // Internal RAM for the radio, PSRAM for the thrust log
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);
    esp_alloc::psram_allocator!(peripherals.PSRAM, esp_hal::psram);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let settings = access_point::config();
    let stand_config = settings.stand;

    // Gate first so the igniter is held low before anything else runs
    let stand = app_state::init_stand(peripherals.GPIO3, &stand_config)
        .expect("Failed to initialize ignition gate");
    let load_cell =
        app_state::init_load_cell(peripherals.GPIO17, peripherals.GPIO18, &stand_config)
            .expect("Failed to initialize HX711");

    let radio = RADIO.init(esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller"));
    let (wifi_controller, interfaces) =
        esp_radio::wifi::new(radio, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi controller");

    let address = access_point::ap_address();
    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;
    let (stack, runner) = embassy_net::new(
        interfaces.ap,
        net::ap_net_config(address),
        NET_RESOURCES.init(StackResources::new()),
        seed,
    );

    spawner
        .spawn(net_task(runner))
        .expect("net_task spawn");
    spawner
        .spawn(access_point_task(wifi_controller))
        .expect("access_point_task spawn");
    spawner
        .spawn(dhcp_task(stack, address))
        .expect("dhcp_task spawn");
    for worker_id in 0..HTTP_WORKER_COUNT {
        spawner
            .spawn(http_worker(stack, stand, worker_id))
            .expect("http_worker spawn");
    }

    info!("Access point SSID: {}", settings.access_point.ssid);
    info!("AP IP address: {}", address);
    info!("HTTP server started at http://{}:{}/", address, HTTP_PORT);

    sample_loop(load_cell, stand, stand_config).await
}

/// Tares the load cell, then samples on a fixed schedule forever.
///
/// The HX711 is read without holding the stand lock; the result is recorded
/// and the ignition gate re-asserted in one short critical section.
async fn sample_loop(
    mut load_cell: StandLoadCell,
    stand: &'static FirmwareStand,
    config: StandConfig,
) -> ! {
    info!("Calibrating scale... Do not apply any weight.");
    match load_cell.tare(config.tare_samples).await {
        Ok(offset) => info!("Calibration complete (offset {}).", offset),
        Err(e) => error!("Tare failed, readings are uncorrected: {}", e),
    }
    Timer::after(Duration::from_millis(config.settle_ms)).await;

    // Timestamps count from boot, so the first sample is due right away
    let mut sampler = Sampler::new(config.sample_interval_ms);

    loop {
        Timer::at(Instant::from_millis(sampler.next_due_ms())).await;

        let Some(timestamp_ms) = sampler.tick(Instant::now().as_millis()) else {
            continue;
        };

        let reading = load_cell.read().await;

        let mut stand = stand.lock().await;
        stand.record(timestamp_ms, reading);
        if let Err(e) = stand.mirror_ignition() {
            error!("{}", e);
        }
    }
}
