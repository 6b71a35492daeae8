use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{with_timeout, Timer};
use embedded_hal_async::digital::Wait;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::config::{Config, PropertySource, RegisterImage};
use crate::reg::{self, Reg};
use crate::state::{DeviceState, OtpOption, Version};
use crate::{ConfigError, Device, Error, EventSink, Iqs269a, ATI_TIMEOUT};

impl<I, E> Device<I>
where
  I: I2c<SevenBitAddress, Error = E>,
{
  pub(crate) fn state(&self) -> Result<&DeviceState, Error<E>> {
    self.state.as_ref().ok_or(Error::NotReady)
  }

  pub(crate) fn state_mut(&mut self) -> Result<&mut DeviceState, Error<E>> {
    self.state.as_mut().ok_or(Error::NotReady)
  }

  /// Program the device from the stored state: unlock sequence where needed,
  /// Hall UI, then the full settings block in one burst.
  pub(crate) async fn init(&mut self) -> Result<(), Error<E>> {
    let state = *self.state()?;

    if state.otp() == OtpOption::Tws && state.version().is_early_silicon() {
      for (reg, value) in reg::TWS_INIT {
        self.bus.write_u16(reg, value).await?;
      }
    }

    let hall = if state.hall_enabled() { reg::HALL_UI_ENABLE } else { 0 };
    self.bus.update_u16(Reg::HallUi, reg::HALL_UI_ENABLE, hall).await?;

    self.bus.write::<{ RegisterImage::LEN }, _>(Reg::SysSettings, state.image).await?;

    // Gives RDY time to deassert, so the write is not mistaken for an event.
    Timer::after_millis(2).await;

    self.state_mut()?.ati_current = true;
    Ok(())
  }
}

impl<M, I, E, RDY> Iqs269a<M, I, RDY>
where
  M: RawMutex,
  I: I2c<SevenBitAddress, Error = E>,
  RDY: Wait,
{
  /// Verify the product, program `config` and wait for the first ATI to
  /// complete. Interrupts seen while waiting are serviced into `sink`.
  pub async fn initialize<S>(&self, config: &Config<'_>, sink: &mut S) -> Result<Version, Error<E>>
  where
    S: EventSink + ?Sized,
  {
    self.setup(|image, version, otp| DeviceState::build(image, version, otp, config), sink).await
  }

  /// Like [`Iqs269a::initialize`], with the settings read from a property tree.
  pub async fn initialize_from<S: EventSink + ?Sized>(
    &self,
    props: &dyn PropertySource,
    sink: &mut S,
  ) -> Result<Version, Error<E>> {
    self.setup(|image, version, otp| DeviceState::load(image, version, otp, props), sink).await
  }

  async fn setup<F, S>(&self, build: F, sink: &mut S) -> Result<Version, Error<E>>
  where
    F: FnOnce(RegisterImage, Version, OtpOption) -> Result<DeviceState, ConfigError>,
    S: EventSink + ?Sized,
  {
    let mut dev = self.device.lock().await;

    let version: Version = dev.bus.read(Reg::VersionInfo).await?;
    if version.product != reg::PRODUCT_NUMBER {
      error!("unexpected product number {=u8:#x}", version.product);
      return Err(Error::InvalidProduct(version.product));
    }

    // Start from the device's own values so reserved bits survive.
    let image = dev.bus.read::<{ RegisterImage::LEN }, RegisterImage>(Reg::SysSettings).await?;
    let state = build(image, version, self.otp).inspect_err(|e| error!("invalid configuration: {}", e))?;
    dev.state = Some(state);

    self.ati.rearm();
    dev.init().await?;
    drop(dev);

    info!("IQS269A fw {=u8:#x} hw {=u8:#x}, waiting for ATI", version.firmware, version.hardware);

    let ati = async {
      while !self.ati.is_ready() {
        self.service(sink).await?;
      }
      Ok::<_, Error<E>>(())
    };
    with_timeout(ATI_TIMEOUT, ati).await.map_err(|_| {
      warn!("ATI did not complete");
      Error::Timeout
    })??;

    Ok(version)
  }
}
