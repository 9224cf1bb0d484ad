//! Access point, DHCP server and HTTP workers
//!
//! The stand hosts its own WPA2 network. Joining stations get an address from
//! the DHCP task; the HTTP workers accept on port 80 and answer one request per
//! connection from the shared stand.

use core::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use alloc::string::ToString;
use edge_dhcp::io::{self as dhcp_io, DEFAULT_SERVER_PORT};
use edge_dhcp::server::{Server, ServerOptions};
use edge_nal::UdpBind;
use edge_nal_embassy::{Udp, UdpBuffers};
use embassy_net::tcp::{Error as TcpError, TcpSocket};
use embassy_net::{Ipv4Cidr, Stack, StaticConfigV4};
use embassy_time::{Duration, Timer};
use esp_radio::wifi::{AccessPointConfig, AuthMethod, ModeConfig, WifiController, WifiDevice, WifiEvent};
use log::{debug, info, warn};

use thrust_core::control::http::{MAX_REQUEST_SIZE, head_complete};
use thrust_core::control::{Route, handle};

use crate::access_point::{AP_PASSWORD, AP_PREFIX_LEN, AP_SSID};
use crate::app_state::FirmwareStand;

/// Two workers so the dashboard's 100 ms poll never finds the port closed
/// while the other is busy with a download.
pub const HTTP_WORKER_COUNT: usize = 2;
pub const HTTP_PORT: u16 = 80;

/// Socket buffers; the CSV export streams through `TX_BUF_SIZE` at a time.
const RX_BUF_SIZE: usize = 1024;
const TX_BUF_SIZE: usize = 2048;

/// Stations the DHCP server will lease to at once
const DHCP_MAX_LEASES: usize = 8;

/// Static addressing for the stand's own network.
pub fn ap_net_config(address: Ipv4Addr) -> embassy_net::Config {
    embassy_net::Config::ipv4_static(StaticConfigV4 {
        address: Ipv4Cidr::new(address, AP_PREFIX_LEN),
        gateway: Some(address),
        dns_servers: Default::default(),
    })
}

#[embassy_executor::task]
pub async fn net_task(mut runner: embassy_net::Runner<'static, WifiDevice<'static>>) {
    runner.run().await;
}

/// Brings the access point up and restarts it if the driver ever stops it.
#[embassy_executor::task]
pub async fn access_point_task(mut controller: WifiController<'static>) {
    loop {
        if !matches!(controller.is_started(), Ok(true)) {
            let ap_config = ModeConfig::AccessPoint(
                AccessPointConfig::default()
                    .with_ssid(AP_SSID.to_string())
                    .with_password(AP_PASSWORD.to_string())
                    .with_auth_method(AuthMethod::Wpa2Personal),
            );

            if let Err(e) = controller.set_config(&ap_config) {
                warn!("Access point config rejected: {:?}", e);
                Timer::after(Duration::from_secs(5)).await;
                continue;
            }

            if let Err(e) = controller.start_async().await {
                warn!("Access point start failed: {:?}", e);
                Timer::after(Duration::from_secs(5)).await;
                continue;
            }
            info!("Access point \"{}\" started", AP_SSID);
        }

        controller.wait_for_event(WifiEvent::ApStop).await;
        warn!("Access point stopped; restarting");
        Timer::after(Duration::from_secs(1)).await;
    }
}

/// Leases addresses on the access point subnet with the stand as gateway.
#[embassy_executor::task]
pub async fn dhcp_task(stack: Stack<'static>, gateway: Ipv4Addr) {
    let mut buf = [0u8; 1500];
    let mut gw_buf = [Ipv4Addr::UNSPECIFIED];

    let buffers = UdpBuffers::<2, 1024, 1024, 4>::new();
    let udp = Udp::new(stack, &buffers);

    let mut socket = loop {
        match udp
            .bind(SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::UNSPECIFIED,
                DEFAULT_SERVER_PORT,
            )))
            .await
        {
            Ok(socket) => break socket,
            Err(e) => {
                warn!("DHCP bind failed: {:?}", e);
                Timer::after(Duration::from_secs(1)).await;
            }
        }
    };

    info!("DHCP server leasing from {}", gateway);

    loop {
        if let Err(e) = dhcp_io::server::run(
            &mut Server::<_, DHCP_MAX_LEASES>::new_with_et(gateway),
            &ServerOptions::new(gateway, Some(&mut gw_buf)),
            &mut socket,
            &mut buf,
        )
        .await
        {
            warn!("DHCP server error: {:?}", e);
        }
        Timer::after(Duration::from_millis(500)).await;
    }
}

#[embassy_executor::task(pool_size = HTTP_WORKER_COUNT)]
pub async fn http_worker(stack: Stack<'static>, stand: &'static FirmwareStand, worker_id: usize) {
    let mut rx_buf = [0u8; RX_BUF_SIZE];
    let mut tx_buf = [0u8; TX_BUF_SIZE];

    info!("HTTP worker {} starting (port={})", worker_id, HTTP_PORT);

    loop {
        stack.wait_config_up().await;

        let mut socket = TcpSocket::new(stack, &mut rx_buf, &mut tx_buf);
        socket.set_timeout(Some(Duration::from_secs(10)));

        match socket.accept(HTTP_PORT).await {
            Ok(()) => {
                if let Err(e) = handle_connection(&mut socket, stand).await {
                    warn!("HTTP worker {} connection error: {:?}", worker_id, e);
                }
            }
            Err(e) => {
                warn!("HTTP worker {} accept error: {:?}", worker_id, e);
                Timer::after(Duration::from_millis(200)).await;
            }
        }

        socket.close();
        // Let the FIN go out before the buffers are reused
        let _ = socket.flush().await;
        socket.abort();
    }
}

async fn handle_connection(
    socket: &mut TcpSocket<'_>,
    stand: &'static FirmwareStand,
) -> Result<(), TcpError> {
    let mut buf = [0u8; MAX_REQUEST_SIZE];
    let mut total = 0usize;

    while total < buf.len() {
        let n = socket.read(&mut buf[total..]).await?;
        if n == 0 {
            break;
        }
        total += n;
        if head_complete(&buf[..total]) {
            break;
        }
    }

    if total == 0 {
        return Ok(());
    }

    let route = Route::from_head(&buf[..total]);
    debug!("HTTP {:?}", route);

    // The handler sees the stand between two sampling ticks; the lock is
    // released before anything goes on the wire.
    let response = {
        let mut stand = stand.lock().await;
        handle(&mut *stand, route)
    };

    write_all(socket, response.head().as_bytes()).await?;
    write_all(socket, response.body().as_bytes()).await?;
    socket.flush().await
}

async fn write_all(socket: &mut TcpSocket<'_>, mut bytes: &[u8]) -> Result<(), TcpError> {
    while !bytes.is_empty() {
        let n = socket.write(bytes).await?;
        if n == 0 {
            return Err(TcpError::ConnectionReset);
        }
        bytes = &bytes[n..];
    }
    Ok(())
}
