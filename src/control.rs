//! Runtime attributes and power management.
//!
//! Setters only edit the stored configuration and mark ATI stale; the device
//! sees the change at the next [`Iqs269a::trigger_ati`]. Reads that talk to
//! the device suspend RDY servicing, since any unsolicited transaction makes
//! the device assert RDY.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::digital::Wait;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::codec::PowerMode;
use crate::reg::{self, Reg};
use crate::state::DeviceState;
use crate::{ConfigError, Error, Iqs269a};

impl<M, I, E, RDY> Iqs269a<M, I, RDY>
where
  M: RawMutex,
  I: I2c<SevenBitAddress, Error = E>,
  RDY: Wait,
{
  /// Raw count of the selected channel.
  ///
  /// Fails with [`Error::NotReady`] while ATI is stale or the Hall-effect
  /// switch is enabled, and with [`Error::Busy`] until ATI has completed.
  pub async fn counts(&self) -> Result<u16, Error<E>> {
    let mut dev = self.device.lock().await;
    let state = dev.state()?;
    if !state.is_ati_current() || state.hall_enabled() {
      return Err(Error::NotReady);
    }
    if !self.ati.is_ready() {
      return Err(Error::Busy);
    }
    let addr = u8::from(Reg::ChannelCounts) + 2 * state.selected_channel() as u8;

    let irq = self.irq.suspend();
    let counts = dev.bus.read::<2, [u8; 2]>(addr).await;
    irq.settle().await;

    Ok(u16::from_le_bytes(counts?))
  }

  /// Hall-effect calibration bin of the pad shared by the Hall channel pair.
  pub async fn hall_bin(&self) -> Result<u8, Error<E>> {
    let mut dev = self.device.lock().await;
    let pad = dev.state()?.hall_pad();

    let irq = self.irq.suspend();
    let cal = dev.bus.read_u16(Reg::CalDataA).await;
    irq.settle().await;
    let cal = cal?;

    let shift = match pad {
      reg::HALL_PAD_R => reg::HALL_BIN_R_SHIFT,
      reg::HALL_PAD_L => reg::HALL_BIN_L_SHIFT,
      _ => return Err(ConfigError::invalid_enum("hall_bin", pad as u32).into()),
    };
    Ok(((cal >> shift) & reg::HALL_BIN_MASK) as u8)
  }

  pub async fn hall_enable(&self) -> Result<bool, Error<E>> {
    self.read_state(|s| Ok(s.hall_enabled())).await
  }

  pub async fn set_hall_enable(&self, enable: bool) -> Result<(), Error<E>> {
    self
      .update_state(|s| {
        s.set_hall_enabled(enable);
        Ok(())
      })
      .await
  }

  /// Channel the per-channel attributes act on.
  pub async fn channel(&self) -> Result<usize, Error<E>> {
    self.read_state(|s| Ok(s.selected_channel())).await
  }

  pub async fn set_channel(&self, ch: u32) -> Result<(), Error<E>> {
    self.update_state(|s| s.select_channel(ch)).await
  }

  pub async fn rx_enable(&self) -> Result<u8, Error<E>> {
    self.read_state(|s| s.rx_enable(s.selected_channel())).await
  }

  pub async fn set_rx_enable(&self, mask: u8) -> Result<(), Error<E>> {
    self.update_state(|s| s.set_rx_enable(s.selected_channel(), mask)).await
  }

  pub async fn ati_mode(&self) -> Result<u8, Error<E>> {
    self.read_state(|s| s.ati_mode(s.selected_channel())).await
  }

  pub async fn set_ati_mode(&self, mode: u32) -> Result<(), Error<E>> {
    self.update_state(|s| s.set_ati_mode(s.selected_channel(), mode)).await
  }

  pub async fn ati_base(&self) -> Result<u32, Error<E>> {
    self.read_state(|s| s.ati_base(s.selected_channel())).await
  }

  pub async fn set_ati_base(&self, base: u32) -> Result<(), Error<E>> {
    self.update_state(|s| s.set_ati_base(s.selected_channel(), base)).await
  }

  pub async fn ati_target(&self) -> Result<u32, Error<E>> {
    self.read_state(|s| s.ati_target(s.selected_channel())).await
  }

  pub async fn set_ati_target(&self, target: u32) -> Result<(), Error<E>> {
    self.update_state(|s| s.set_ati_target(s.selected_channel(), target)).await
  }

  /// The device runs the stored configuration and has finished ATI on it.
  pub async fn ati_ready(&self) -> bool {
    let dev = self.device.lock().await;
    let current = dev.state.as_ref().is_some_and(DeviceState::is_ati_current);
    current && self.ati.is_ready()
  }

  /// Rewrite the full configuration with ATI requested, then wait for the
  /// service task to decode a clean report.
  pub async fn trigger_ati(&self) -> Result<(), Error<E>> {
    {
      let mut dev = self.device.lock().await;
      dev.state()?;

      let irq = self.irq.suspend();
      self.ati.rearm();
      let written = dev.init().await;
      irq.settle().await;
      written?;
    }

    self.wait_for_ati().await.inspect_err(|_| warn!("ATI did not complete"))
  }

  /// Drop into the configured suspend power mode with automatic switching
  /// disabled. Does nothing if the suspend mode is normal power.
  pub async fn suspend(&self) -> Result<(), Error<E>> {
    let mut dev = self.device.lock().await;
    let state = *dev.state()?;
    if state.suspend_mode() == PowerMode::Normal {
      return Ok(());
    }

    let irq = self.irq.suspend();
    let written = dev.bus.write_u16(Reg::SysSettings, state.suspend_settings().into_bits()).await;
    irq.settle().await;
    written
  }

  /// Return to normal power, then re-enable automatic power switching.
  pub async fn resume(&self) -> Result<(), Error<E>> {
    let mut dev = self.device.lock().await;
    let state = *dev.state()?;
    if state.suspend_mode() == PowerMode::Normal {
      return Ok(());
    }

    let irq = self.irq.suspend();
    let mut written = dev.bus.write_u16(Reg::SysSettings, state.wake_settings().into_bits()).await;
    if written.is_ok() {
      written = dev.bus.write_u16(Reg::SysSettings, state.resume_settings().into_bits()).await;
    }
    irq.settle().await;
    written
  }

  async fn read_state<T>(&self, f: impl FnOnce(&DeviceState) -> Result<T, ConfigError>) -> Result<T, Error<E>> {
    let dev = self.device.lock().await;
    Ok(f(dev.state()?)?)
  }

  async fn update_state(&self, f: impl FnOnce(&mut DeviceState) -> Result<(), ConfigError>) -> Result<(), Error<E>> {
    let mut dev = self.device.lock().await;
    Ok(f(dev.state_mut()?)?)
  }
}

#[cfg(test)]
mod tests {
  extern crate std;

  use super::*;
  use crate::config::{ChannelProps, Config, SystemProps};
  use crate::state::OtpOption;
  use crate::testing::*;
  use crate::{AtiState, ConfigErrorKind, RegisterImage, Status};
  use embassy_futures::block_on;
  use embassy_futures::join::join;
  use embassy_time::Timer;
  use std::vec;

  const REDO_ATI: u16 = 1 << 2;
  const ACK_RESET: u16 = 1 << 0;
  const POWER_MODE: u16 = 0b11 << 11;
  const DISABLE_AUTO: u16 = 1 << 13;

  const HALL_PAIR: [ChannelProps; 2] =
    [ChannelProps::new(6).with_pins(&[0], &[]), ChannelProps::new(7).with_pins(&[0], &[])];

  #[test]
  fn counts_read_selected_channel() {
    let i2c = device(0x10).with_bytes(0x0C, &[0x34, 0x12]);
    let driver = ready_ch2(i2c);

    block_on(driver.set_channel(2)).unwrap();
    assert_eq!(block_on(driver.counts()).unwrap(), 0x1234);
  }

  #[test]
  fn counts_refused_while_stale() {
    let driver = Driver::new(device(0x10), MockRdy::default(), OtpOption::Default);
    assert!(matches!(block_on(driver.counts()), Err(Error::NotReady)));

    let driver = ready_ch2(device(0x10));
    block_on(driver.set_rx_enable(0x05)).unwrap();
    assert!(matches!(block_on(driver.counts()), Err(Error::NotReady)));
    assert!(!block_on(driver.ati_ready()));
  }

  #[test]
  fn counts_refused_in_hall_mode() {
    let config = Config::new(SystemProps::new().with_hall(), &HALL_PAIR);
    let driver = ready(device(0x10), OtpOption::Default, &config);
    assert!(matches!(block_on(driver.counts()), Err(Error::NotReady)));
  }

  #[test]
  fn hall_bin_follows_shared_pad() {
    let i2c = device(0x10).with_bytes(0x35, &[0xA5, 0x00]);
    let config = Config::new(SystemProps::new().with_hall(), &HALL_PAIR);
    let driver = ready(i2c, OtpOption::Default, &config);
    assert_eq!(block_on(driver.hall_bin()).unwrap(), 0x05);

    // Move both channels onto the left pad.
    for ch in [6, 7] {
      block_on(driver.set_channel(ch)).unwrap();
      block_on(driver.set_rx_enable(reg::HALL_PAD_L)).unwrap();
    }
    assert_eq!(block_on(driver.hall_bin()).unwrap(), 0x0A);
  }

  #[test]
  fn hall_bin_rejects_unpaired_pads() {
    let driver = ready_ch2(device(0x10));
    let err = block_on(driver.hall_bin());
    assert!(matches!(err, Err(Error::Config(e)) if e.kind == ConfigErrorKind::InvalidEnum && e.value == 0));
  }

  #[test]
  fn attributes_act_on_selected_channel() {
    let i2c = device(0x10);
    let driver = ready_ch2(i2c.clone());
    assert!(block_on(driver.ati_ready()));

    let err = block_on(driver.set_channel(8));
    assert!(matches!(err, Err(Error::Config(e)) if e.property == "ch_number" && e.kind == ConfigErrorKind::OutOfRange));

    block_on(driver.set_channel(2)).unwrap();
    assert_eq!(block_on(driver.channel()).unwrap(), 2);
    assert_eq!(block_on(driver.rx_enable()).unwrap(), 1 << 2);

    block_on(driver.set_ati_mode(2)).unwrap();
    block_on(driver.set_ati_base(150)).unwrap();
    block_on(driver.set_ati_target(500)).unwrap();
    assert_eq!(block_on(driver.ati_mode()).unwrap(), 2);
    assert_eq!(block_on(driver.ati_base()).unwrap(), 150);
    assert_eq!(block_on(driver.ati_target()).unwrap(), 480);
    assert!(!block_on(driver.ati_ready()));

    let rejected = block_on(driver.set_ati_base(125));
    assert!(matches!(rejected, Err(Error::Config(e)) if e.kind == ConfigErrorKind::InvalidEnum));
    assert!(matches!(block_on(driver.set_ati_target(2048)), Err(Error::Config(_))));
    assert!(matches!(block_on(driver.set_ati_mode(4)), Err(Error::Config(_))));

    // Other channels untouched, nothing written.
    block_on(driver.set_channel(3)).unwrap();
    assert_eq!(block_on(driver.ati_target()).unwrap(), block_on(driver.state()).unwrap().ati_target(3).unwrap());
    assert_eq!(i2c.writes_to(0x80).len(), 1);
  }

  #[test]
  fn hall_enable_marks_stale() {
    let driver = ready_ch2(device(0x10));
    assert!(!block_on(driver.hall_enable()).unwrap());
    block_on(driver.set_hall_enable(true)).unwrap();
    assert!(block_on(driver.hall_enable()).unwrap());
    assert!(!block_on(driver.ati_ready()));
  }

  #[test]
  fn trigger_ati_rewrites_and_waits() {
    let i2c = device(0x10);
    let driver = ready_ch2(i2c.clone());
    block_on(driver.set_channel(2)).unwrap();
    block_on(driver.set_ati_target(1024)).unwrap();
    i2c.clear_writes();
    i2c.push_status(IDLE);

    let mut sink = Recorder::default();
    let (triggered, serviced) = block_on(join(driver.trigger_ati(), async {
      Timer::after_millis(20).await;
      driver.service(&mut sink).await
    }));
    assert!(triggered.is_ok());
    assert!(matches!(serviced, Ok(Status::Reported)));
    assert!(block_on(driver.ati_ready()));

    let writes = i2c.writes_to(0x80);
    assert_eq!(writes.len(), 1);
    let image: [u8; RegisterImage::LEN] = writes[0].as_slice().try_into().unwrap();
    let image = RegisterImage::from(image);
    assert!(image.general.redo_ati());
    assert_eq!(image.channels[2].engine_b.ati_target(), 32);
  }

  #[test]
  fn trigger_ati_times_out_and_blocks_counts() {
    let i2c = device(0x10);
    let driver = ready_ch2(i2c);

    assert!(matches!(block_on(driver.trigger_ati()), Err(Error::Timeout)));
    assert_eq!(driver.ati_state(), AtiState::Calibrating);
    assert!(matches!(block_on(driver.counts()), Err(Error::Busy)));
  }

  #[test]
  fn suspend_and_resume_write_general_settings() {
    let i2c = device(0x10);
    let config = Config::new(SystemProps::new().with_suspend_mode(PowerMode::UltraLow), &PROX_CH2);
    let driver = ready(i2c.clone(), OtpOption::Default, &config);
    let general = block_on(driver.state()).unwrap().image().general.into_bits();
    assert_eq!(general & POWER_MODE, 0b10 << 11);
    i2c.clear_writes();

    block_on(driver.suspend()).unwrap();
    let suspend = (general & !(REDO_ATI | ACK_RESET)) | DISABLE_AUTO;
    assert_eq!(i2c.writes_to(0x80), vec![suspend.to_be_bytes().to_vec()]);
    i2c.clear_writes();

    block_on(driver.resume()).unwrap();
    assert_eq!(
      i2c.writes_to(0x80),
      vec![(suspend & !POWER_MODE).to_be_bytes().to_vec(), (suspend & !DISABLE_AUTO).to_be_bytes().to_vec()]
    );
  }

  #[test]
  fn normal_suspend_mode_writes_nothing() {
    let i2c = device(0x10);
    let driver = ready_ch2(i2c.clone());
    i2c.clear_writes();

    block_on(driver.suspend()).unwrap();
    block_on(driver.resume()).unwrap();
    assert!(i2c.writes().is_empty());
  }
}
