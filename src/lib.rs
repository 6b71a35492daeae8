#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Async, `no_std` driver for the Azoteq IQS269A 8-channel capacitive and
//! inductive touch controller.
//!
//! The IQS269A senses up to eight channels for proximity, touch and deep
//! touch, drives two sliders with gesture detection and can pair two channels
//! into a Hall-effect switch. This crate exposes:
//!
//! - A typed register image with validated builders for the system and
//!   channel settings, from [`Config`] or any [`PropertySource`]
//! - An interrupt-driven decode path that reports keys, switches and slider
//!   input to an [`EventSink`], restoring the configuration after an
//!   unexpected device reset
//! - ATI (automatic tuning) accessors and a calibration gate that callers can
//!   wait on
//! - Power management and diagnostics: suspend/resume, channel counts and
//!   Hall-effect calibration bins
//!
//! Every method takes `&self`; the bus and configuration sit behind an async
//! mutex, so the interrupt task and the control paths can share one driver.
//!
//! ```no_run
//! use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
//! use embedded_hal_async::{digital::Wait, i2c::{I2c, SevenBitAddress}};
//! use iqs269a::{ChannelProps, Config, EventKind, EventProps, EventSink, Iqs269a, OtpOption, SystemProps};
//!
//! const CHANNELS: [ChannelProps; 1] = [ChannelProps::new(2)
//!   .with_pins(&[2], &[])
//!   .with_event(EventKind::ProxDown, EventProps::new().with_thresh(10).with_code(2))];
//!
//! async fn run<I2C, RDY, E>(i2c: I2C, rdy: RDY, sink: &mut impl EventSink) -> Result<(), iqs269a::Error<E>>
//! where
//!   I2C: I2c<SevenBitAddress, Error = E>,
//!   RDY: Wait,
//! {
//!   let touch = Iqs269a::<CriticalSectionRawMutex, _, _>::new(i2c, rdy, OtpOption::Default);
//!   touch.initialize(&Config::new(SystemProps::new(), &CHANNELS), sink).await?;
//!   loop {
//!     touch.service(sink).await?;
//!   }
//! }
//! ```

#[macro_use]
mod fmt;

mod ati;
mod codec;
mod config;
mod control;
mod event;
mod init;
mod irq;
mod reg;
mod rw;
mod state;
#[cfg(test)]
mod testing;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::Timer;
use embedded_hal_async::digital::Wait;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

pub use ati::{AtiState, ATI_TIMEOUT};
pub use codec::{AtiBase, ConfigError, ConfigErrorKind, LocalCapSize, PowerMode};
pub use config::*;
pub use event::{Capabilities, EventSink, InputDevice, StatusSnapshot, SysFlags};
pub use irq::IRQ_SETTLE;
pub use reg::{I2C_ADDR, MAX_KEYCODES, NUM_CHANNELS, NUM_GESTURES, NUM_SLIDERS};
pub use state::{ChannelLayout, DeviceState, OtpOption, SliderMode, Version};

use ati::AtiGate;
use irq::IrqGate;
use reg::Reg;
use rw::Bus;

/// Errors that can occur while interacting with the controller.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
  /// I²C bus transaction failed with the underlying driver error.
  I2c(E),
  /// The device reset and restoring its configuration failed.
  RecoveryFailed(E),
  /// The device reported an unexpected product number during bring-up.
  InvalidProduct(u8),
  /// A configuration value was rejected.
  Config(ConfigError),
  /// ATI did not complete in time.
  Timeout,
  /// Not configured yet, or the requested data would be meaningless with the
  /// current configuration.
  NotReady,
  /// ATI is still running.
  Busy,
  /// The RDY pin could not be read.
  Pin,
  /// An operation attempted to write a buffer larger than the protocol allows.
  BufferOverflow,
}

impl<E> From<ConfigError> for Error<E> {
  fn from(e: ConfigError) -> Self {
    Error::Config(e)
  }
}

impl<E> Error<E> {
  fn recovery(self) -> Self {
    match self {
      Error::I2c(e) => Error::RecoveryFailed(e),
      other => other,
    }
  }
}

/// Outcome of servicing one interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
  /// The device had reset; its configuration was rewritten and nothing was
  /// reported.
  Recovered,
  /// ATI in progress, nothing reported.
  Calibrating,
  /// Input state was reported to the sink.
  Reported,
}

/// Bus plus the configuration it was programmed with. Always locked as one,
/// so a report never observes a half-applied change.
pub(crate) struct Device<I> {
  bus: Bus<I>,
  state: Option<DeviceState>,
}

/// Driver for the Azoteq IQS269A.
///
/// Owns the I²C peripheral and the RDY pin. Create it with
/// [`Iqs269a::new`], program it with [`Iqs269a::initialize`], then keep a
/// task running [`Iqs269a::service`].
pub struct Iqs269a<M: RawMutex, I, RDY> {
  device: Mutex<M, Device<I>>,
  rdy: Mutex<M, RDY>,
  irq: IrqGate<M>,
  ati: AtiGate<M>,
  otp: OtpOption,
}

impl<M, I, E, RDY> Iqs269a<M, I, RDY>
where
  M: RawMutex,
  I: I2c<SevenBitAddress, Error = E>,
  RDY: Wait,
{
  /// Create a driver at the default address. Nothing is sent to the device
  /// until [`Iqs269a::initialize`].
  pub const fn new(i2c: I, rdy: RDY, otp: OtpOption) -> Self {
    Self::with_address(i2c, rdy, otp, I2C_ADDR)
  }

  pub const fn with_address(i2c: I, rdy: RDY, otp: OtpOption, address: u8) -> Self {
    Self {
      device: Mutex::new(Device { bus: Bus::new(i2c, address), state: None }),
      rdy: Mutex::new(rdy),
      irq: IrqGate::new(),
      ati: AtiGate::new(),
      otp,
    }
  }

  /// Wait for RDY, then service the interrupt.
  ///
  /// RDY edges that arrive while an attribute transaction has the interrupt
  /// suspended are dropped.
  pub async fn service<S: EventSink + ?Sized>(&self, sink: &mut S) -> Result<Status, Error<E>> {
    self.wait_for_rdy().await?;
    let status = self.handle_interrupt(sink).await;
    Timer::after(IRQ_SETTLE).await;
    status
  }

  /// Read one status snapshot and act on it.
  ///
  /// A reported reset rewrites the full configuration instead of reporting;
  /// ATI in progress reports nothing. Otherwise every mapped input is
  /// reported and the calibration gate opens.
  pub async fn handle_interrupt<S: EventSink + ?Sized>(&self, sink: &mut S) -> Result<Status, Error<E>> {
    let mut dev = self.device.lock().await;
    dev.state()?;

    let snapshot: StatusSnapshot = dev.bus.read(Reg::SysFlags).await?;
    if snapshot.reset_occurred() {
      error!("unexpected device reset, restoring settings");
      dev.init().await.map_err(|e| {
        error!("settings restore failed");
        e.recovery()
      })?;
      return Ok(Status::Recovered);
    }
    if snapshot.calibrating() {
      return Ok(Status::Calibrating);
    }

    let slider_x: [u8; NUM_SLIDERS] = match dev.state()?.any_raw_slider() {
      true => dev.bus.read(Reg::SliderX).await?,
      false => [0; NUM_SLIDERS],
    };
    dev.state()?.report(&snapshot, slider_x, sink);

    // Under the device lock, so a rearm in between cannot be opened by this
    // snapshot.
    self.ati.release();
    Ok(Status::Reported)
  }

  async fn wait_for_rdy(&self) -> Result<(), Error<E>> {
    let mut rdy = self.rdy.lock().await;
    loop {
      rdy.wait_for_falling_edge().await.map_err(|_| Error::Pin)?;
      if self.irq.enabled() {
        return Ok(());
      }
      debug!("RDY edge dropped while suspended");
    }
  }

  /// Copy of the current configuration.
  pub async fn state(&self) -> Result<DeviceState, Error<E>> {
    self.device.lock().await.state().copied()
  }

  pub async fn capabilities(&self) -> Result<Capabilities, Error<E>> {
    Ok(self.device.lock().await.state()?.capabilities())
  }

  pub fn ati_state(&self) -> AtiState {
    self.ati.state()
  }

  /// Wait until ATI has completed and a clean report has been decoded.
  pub async fn wait_for_ati(&self) -> Result<(), Error<E>> {
    self.ati.wait(ATI_TIMEOUT).await.map_err(|_| Error::Timeout)
  }
}
