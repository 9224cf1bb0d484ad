//! Host-side stand-in for the test stand firmware.
//!
//! Runs the `thrust-core` sampler, ignition controller and control surface in
//! a single polling loop over `std::net`, with a synthetic load cell whose
//! thrust curve starts when the simulated ignition pin goes high. Each call to
//! [`SimulatedStand::poll`] is one loop pass: service pending requests,
//! mirror the ignition state, then sample if the interval has elapsed.

use std::cell::Cell;
use std::convert::Infallible;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::rc::Rc;
use std::time::Duration;

use embassy_futures::block_on;
use embedded_hal::digital::{ErrorType, OutputPin};
use log::{debug, info, warn};
use thiserror_no_std::Error;

use thrust_core::app_state::{SharedStand, StandError, TestStand};
use thrust_core::config::StandConfig;
use thrust_core::control::http::{MAX_REQUEST_SIZE, Response, head_complete};
use thrust_core::control::{Route, handle};
use thrust_core::sampler::Sampler;
use thrust_core::sensors::{Calibration, LoadCell, Sensor, SensorError};

/// How long a client may take to send its request head
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Stand setup failed: {0}")]
    Stand(StandError),
    #[error("Socket error: {0}")]
    Io(io::Error),
}

impl From<StandError> for SimError {
    fn from(e: StandError) -> Self {
        Self::Stand(e)
    }
}

impl From<SensorError> for SimError {
    fn from(e: SensorError) -> Self {
        Self::Stand(StandError::Sensor(e))
    }
}

impl From<io::Error> for SimError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Simulated hardware
// ---------------------------------------------------------------------------

/// Ignition gate whose level is visible to the synthetic motor.
#[derive(Clone, Default)]
pub struct SimGatePin {
    level: Rc<Cell<bool>>,
}

impl SimGatePin {
    pub fn is_high(&self) -> bool {
        self.level.get()
    }
}

impl ErrorType for SimGatePin {
    type Error = Infallible;
}

impl OutputPin for SimGatePin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.level.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        if !self.level.replace(true) {
            debug!("Simulated igniter energised");
        }
        Ok(())
    }
}

/// Synthetic HX711: raw counts from a small motor that lights once the gate
/// has been high for a read.
pub struct SyntheticThrust {
    gate: SimGatePin,
    counts_per_kg: f32,
    /// Reads since ignition; `None` until the gate first goes high
    burn_ticks: Option<u32>,
    noise_state: u32,
}

/// Raw reading of the unloaded stand
const SYNTHETIC_ZERO_COUNTS: i32 = 84_210;

impl SyntheticThrust {
    pub fn new(gate: SimGatePin, counts_per_kg: f32) -> Self {
        Self {
            gate,
            counts_per_kg,
            burn_ticks: None,
            noise_state: 0x2545_F491,
        }
    }

    /// Thrust profile in kg, one entry per 100 ms tick: fast rise, short
    /// plateau, long regressive tail.
    fn thrust_kg(tick: u32) -> f32 {
        const PEAK_KG: f32 = 12.0;
        match tick {
            0..=2 => PEAK_KG * (tick as f32 + 1.0) / 3.0,
            3..=8 => PEAK_KG,
            9..=30 => PEAK_KG * (30 - tick) as f32 / 22.0,
            _ => 0.0,
        }
    }

    /// A few counts of xorshift noise, like a real bridge at rest
    fn noise_counts(&mut self) -> i32 {
        let mut x = self.noise_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.noise_state = x;
        (x % 9) as i32 - 4
    }
}

impl Sensor for SyntheticThrust {
    type Reading = i32;

    async fn read(&mut self) -> Result<i32, SensorError> {
        if self.gate.is_high() && self.burn_ticks.is_none() {
            info!("Simulated motor ignited");
            self.burn_ticks = Some(0);
        }

        let thrust = match self.burn_ticks.as_mut() {
            Some(tick) => {
                let kg = Self::thrust_kg(*tick);
                *tick = tick.saturating_add(1);
                kg
            }
            None => 0.0,
        };

        let load_counts = (thrust * self.counts_per_kg) as i32;
        Ok(SYNTHETIC_ZERO_COUNTS + load_counts + self.noise_counts())
    }
}

// ---------------------------------------------------------------------------
// Stand loop
// ---------------------------------------------------------------------------

pub struct SimulatedStand<S = SyntheticThrust> {
    stand: SharedStand<SimGatePin>,
    gate: SimGatePin,
    sampler: Sampler,
    load_cell: LoadCell<S>,
    listener: Option<TcpListener>,
}

impl SimulatedStand<SyntheticThrust> {
    /// Builds the stand with the synthetic motor and tares it.
    pub fn new(config: &StandConfig) -> Result<Self, SimError> {
        let gate = SimGatePin::default();
        let source = SyntheticThrust::new(gate.clone(), config.calibration_factor);
        Self::with_source(config, gate, source)
    }
}

impl<S> SimulatedStand<S>
where
    S: Sensor<Reading = i32>,
{
    /// Builds the stand around any raw-count source and tares it.
    pub fn with_source(config: &StandConfig, gate: SimGatePin, source: S) -> Result<Self, SimError> {
        let stand = TestStand::new(gate.clone(), config.log_policy)?;

        let mut load_cell = LoadCell::new(source, Calibration::new(config.calibration_factor));
        info!("Calibrating scale... Do not apply any weight.");
        block_on(load_cell.tare(config.tare_samples))?;
        info!("Calibration complete.");

        Ok(Self {
            stand: SharedStand::new(stand),
            gate,
            sampler: Sampler::new(config.sample_interval_ms),
            load_cell,
            listener: None,
        })
    }

    /// Starts accepting control-surface connections.
    pub fn bind<A: ToSocketAddrs>(&mut self, addr: A) -> Result<SocketAddr, SimError> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let local = listener.local_addr()?;
        self.listener = Some(listener);
        info!("HTTP server started on http://{}", local);
        Ok(local)
    }

    /// Runs `f` with the stand locked, as a request handler would.
    pub fn with_stand<R>(&self, f: impl FnOnce(&mut TestStand<SimGatePin>) -> R) -> R {
        let mut stand = block_on(self.stand.lock());
        f(&mut *stand)
    }

    pub fn ignition_high(&self) -> bool {
        self.gate.is_high()
    }

    /// One pass of the control loop.
    pub fn poll(&mut self, now_ms: u64) {
        self.serve_pending();

        if let Err(e) = self.with_stand(|stand| stand.mirror_ignition()) {
            warn!("{}", e);
        }

        self.sample(now_ms);
    }

    /// Takes one reading if the sample interval has elapsed.
    pub fn sample(&mut self, now_ms: u64) -> bool {
        let Some(timestamp_ms) = self.sampler.tick(now_ms) else {
            return false;
        };
        // Read outside the lock, like the firmware's sampling task
        let reading = block_on(self.load_cell.read());
        self.with_stand(|stand| stand.record(timestamp_ms, reading));
        true
    }

    /// Accepts and answers every connection already waiting.
    pub fn serve_pending(&mut self) {
        loop {
            let Some(listener) = self.listener.as_ref() else {
                return;
            };
            match listener.accept() {
                Ok((stream, peer)) => {
                    debug!("Connection from {}", peer);
                    let prepared = stream
                        .set_nonblocking(false)
                        .and_then(|_| stream.set_read_timeout(Some(REQUEST_READ_TIMEOUT)));
                    if let Err(e) = prepared.and_then(|_| self.serve_connection(stream)) {
                        warn!("Connection from {} failed: {}", peer, e);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return,
                Err(e) => {
                    warn!("Accept failed: {}", e);
                    return;
                }
            }
        }
    }

    /// Reads one request head from `stream`, answers it and returns.
    pub fn serve_connection<T: Read + Write>(&mut self, mut stream: T) -> io::Result<()> {
        let mut buf = [0u8; MAX_REQUEST_SIZE];
        let mut total = 0;

        while total < buf.len() {
            let n = stream.read(&mut buf[total..])?;
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

        let response = self.respond(&buf[..total]);
        stream.write_all(response.head().as_bytes())?;
        stream.write_all(response.body().as_bytes())?;
        stream.flush()
    }

    /// Routes a raw request head and runs the handler.
    pub fn respond(&mut self, head: &[u8]) -> Response {
        let route = Route::from_head(head);
        self.with_stand(|stand| handle(stand, route))
    }
}
