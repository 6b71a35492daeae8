use crate::codec::{self, AtiBase, ConfigError, LocalCapSize, PowerMode};
use crate::config::channel::{ati_mode, ati_target};
use crate::config::{ChannelRegister, General, Gesture, Keymap, RegisterImage};
use crate::reg::{FW_NUM_3, HALL_ACTIVE, HALL_INACTIVE, NUM_SLIDERS};

/// Product, software, hardware and firmware numbers read at probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Version {
  pub product: u8,
  pub software: u8,
  pub hardware: u8,
  pub firmware: u8,
}

impl Version {
  /// Early silicon needs a few workarounds, see [`OtpOption::Tws`].
  pub const fn is_early_silicon(&self) -> bool {
    self.firmware < FW_NUM_3
  }
}

impl From<[u8; 4]> for Version {
  fn from(b: [u8; 4]) -> Self {
    Self { product: b[0], software: b[1], hardware: b[2], firmware: b[3] }
  }
}

/// Factory OTP variant of the part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OtpOption {
  #[default]
  Default,
  /// True wireless stereo variant. Enables touch-and-hold on GPIO4, which
  /// takes over slider 1, and needs an unlock sequence on early silicon.
  Tws,
}

impl OtpOption {
  pub const fn has_touch_hold(self) -> bool {
    matches!(self, Self::Tws)
  }
}

/// How a channel's state bits are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelLayout {
  Ordinary,
  /// Two channels sense one Hall-effect switch. Only the active channel
  /// reports, and it reports as a switch rather than a key.
  HallPair { active: usize, inactive: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Route {
  Key,
  Switch,
  Silent,
}

impl ChannelLayout {
  pub const fn new(hall: bool) -> Self {
    match hall {
      true => Self::HallPair { active: HALL_ACTIVE, inactive: HALL_INACTIVE },
      false => Self::Ordinary,
    }
  }

  pub(crate) const fn route(self, ch: usize) -> Route {
    match self {
      Self::HallPair { active, .. } if ch == active => Route::Switch,
      Self::HallPair { inactive, .. } if ch == inactive => Route::Silent,
      _ => Route::Key,
    }
  }
}

/// What a slider reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SliderMode {
  /// Slider unused, or repurposed for touch-and-hold.
  None,
  /// Gestures reported as keys.
  Gesture,
  /// Touch plus raw coordinate.
  Raw,
}

pub(crate) fn slider_mode(image: &RegisterImage, keymap: &Keymap, otp: OtpOption, slider: usize) -> SliderMode {
  if slider >= NUM_SLIDERS || (slider == 1 && otp.has_touch_hold()) || image.slider_select[slider] == 0 {
    return SliderMode::None;
  }
  match keymap.has_gestures(slider) {
    true => SliderMode::Gesture,
    false => SliderMode::Raw,
  }
}

/// Everything the driver knows about the configured device.
///
/// The register image here is the source of truth: every rewrite, including
/// recovery after an unexpected reset, sends it verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceState {
  pub(crate) image: RegisterImage,
  pub(crate) keymap: Keymap,
  pub(crate) layout: ChannelLayout,
  pub(crate) version: Version,
  pub(crate) otp: OtpOption,
  /// Cleared whenever the image changes in a way calibration depends on.
  pub(crate) ati_current: bool,
  pub(crate) selected: usize,
}

impl DeviceState {
  pub(crate) const fn new(
    image: RegisterImage,
    keymap: Keymap,
    hall: bool,
    version: Version,
    otp: OtpOption,
  ) -> Self {
    Self { image, keymap, layout: ChannelLayout::new(hall), version, otp, ati_current: false, selected: 0 }
  }

  pub fn image(&self) -> &RegisterImage {
    &self.image
  }

  pub fn keymap(&self) -> &Keymap {
    &self.keymap
  }

  pub fn version(&self) -> Version {
    self.version
  }

  pub fn otp(&self) -> OtpOption {
    self.otp
  }

  pub fn layout(&self) -> ChannelLayout {
    self.layout
  }

  pub fn hall_enabled(&self) -> bool {
    matches!(self.layout, ChannelLayout::HallPair { .. })
  }

  pub(crate) fn set_hall_enabled(&mut self, hall: bool) {
    self.layout = ChannelLayout::new(hall);
    self.ati_current = false;
  }

  /// Whether the last calibration reflects the current configuration.
  pub fn is_ati_current(&self) -> bool {
    self.ati_current
  }

  pub fn slider_mode(&self, slider: usize) -> SliderMode {
    slider_mode(&self.image, &self.keymap, self.otp, slider)
  }

  pub(crate) fn any_raw_slider(&self) -> bool {
    (0..NUM_SLIDERS).any(|i| self.slider_mode(i) == SliderMode::Raw)
  }

  pub fn selected_channel(&self) -> usize {
    self.selected
  }

  pub(crate) fn select_channel(&mut self, ch: u32) -> Result<(), ConfigError> {
    self.selected = codec::channel("ch_number", ch)?;
    Ok(())
  }

  pub fn rx_enable(&self, ch: usize) -> Result<u8, ConfigError> {
    Ok(self.channel(ch)?.rx_enable)
  }

  pub(crate) fn set_rx_enable(&mut self, ch: usize, mask: u8) -> Result<(), ConfigError> {
    self.channel_mut(ch)?.rx_enable = mask;
    self.ati_current = false;
    Ok(())
  }

  pub fn ati_mode(&self, ch: usize) -> Result<u8, ConfigError> {
    Ok(self.channel(ch)?.engine_a.ati_mode())
  }

  pub(crate) fn set_ati_mode(&mut self, ch: usize, mode: u32) -> Result<(), ConfigError> {
    let reg = self.channel_mut(ch)?;
    reg.engine_a = ati_mode(reg.engine_a, mode)?;
    self.ati_current = false;
    Ok(())
  }

  /// ATI base in counts: 75, 100, 150 or 200.
  pub fn ati_base(&self, ch: usize) -> Result<u32, ConfigError> {
    Ok(self.channel(ch)?.engine_b.ati_base().counts())
  }

  pub(crate) fn set_ati_base(&mut self, ch: usize, base: u32) -> Result<(), ConfigError> {
    let base = AtiBase::try_from(base)?;
    self.channel_mut(ch)?.engine_b.set_ati_base(base);
    self.ati_current = false;
    Ok(())
  }

  /// ATI target in counts, always a multiple of 32.
  pub fn ati_target(&self, ch: usize) -> Result<u32, ConfigError> {
    Ok(self.channel(ch)?.engine_b.ati_target() as u32 * codec::ATI_TARGET_STEP)
  }

  pub(crate) fn set_ati_target(&mut self, ch: usize, target: u32) -> Result<(), ConfigError> {
    let reg = self.channel_mut(ch)?;
    reg.engine_b = ati_target(reg.engine_b, target)?;
    self.ati_current = false;
    Ok(())
  }

  /// RX pins shared by both channels of the Hall-effect pair.
  pub(crate) fn hall_pad(&self) -> u8 {
    self.image.channels[HALL_ACTIVE].rx_enable & self.image.channels[HALL_INACTIVE].rx_enable
  }

  pub fn local_cap_size(&self, ch: usize) -> Result<LocalCapSize, ConfigError> {
    let reg = self.channel(ch)?;
    LocalCapSize::decode(reg.engine_a.local_cap_size(), reg.engine_b.local_cap_enable())
      .map_err(|e| e.on_channel(ch as u8))
  }

  /// Settings word written on suspend: automatic power switching off,
  /// one-shot bits cleared.
  pub(crate) fn suspend_settings(&self) -> General {
    self.image.general.with_redo_ati(false).with_ack_reset(false).with_disable_auto(true)
  }

  /// First resume step: back to normal power with automatic switching still off.
  pub(crate) fn wake_settings(&self) -> General {
    self.suspend_settings().with_power_mode(PowerMode::Normal)
  }

  /// Second resume step: automatic switching back on.
  pub(crate) fn resume_settings(&self) -> General {
    self.suspend_settings().with_disable_auto(false)
  }

  pub(crate) fn suspend_mode(&self) -> PowerMode {
    self.image.general.power_mode()
  }

  pub(crate) fn gesture_code(&self, slider: usize, gesture: Gesture) -> Option<u16> {
    self.keymap.gesture(slider, gesture)
  }

  fn channel(&self, ch: usize) -> Result<&ChannelRegister, ConfigError> {
    self.image.channels.get(ch).ok_or(ConfigError::out_of_range("channel", ch as u32))
  }

  fn channel_mut(&mut self, ch: usize) -> Result<&mut ChannelRegister, ConfigError> {
    self.image.channels.get_mut(ch).ok_or(ConfigError::out_of_range("channel", ch as u32))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{ChannelProps, Config, SystemProps};

  const VERSION: Version = Version { product: 0x4F, software: 0x02, hardware: 0x00, firmware: 0x10 };

  fn state(system: SystemProps) -> DeviceState {
    let channels = [ChannelProps::new(1).with_pins(&[1], &[]).with_ati(1, 100, 256)];
    DeviceState::build(RegisterImage::default(), VERSION, OtpOption::Default, &Config::new(system, &channels)).unwrap()
  }

  #[test]
  fn early_silicon_is_below_fw_num_3() {
    assert!(Version::from([0x4F, 0x02, 0x00, 0x0F]).is_early_silicon());
    assert!(!VERSION.is_early_silicon());
  }

  #[test]
  fn hall_pair_routes() {
    let layout = ChannelLayout::new(true);
    assert_eq!(layout.route(HALL_ACTIVE), Route::Switch);
    assert_eq!(layout.route(HALL_INACTIVE), Route::Silent);
    assert_eq!(layout.route(0), Route::Key);
    assert_eq!(ChannelLayout::new(false).route(HALL_ACTIVE), Route::Key);
  }

  #[test]
  fn rejected_setter_keeps_state() {
    let mut state = state(SystemProps::new());
    state.ati_current = true;
    let before = state;

    assert!(state.set_ati_target(1, 4000).is_err());
    assert!(state.set_ati_base(1, 120).is_err());
    assert!(state.set_ati_mode(1, 9).is_err());
    assert!(state.set_rx_enable(8, 0xFF).is_err());
    assert!(state.select_channel(8).is_err());
    assert_eq!(state, before);
    assert!(state.is_ati_current());

    state.set_ati_target(1, 64).unwrap();
    assert_eq!(state.ati_target(1), Ok(64));
    assert!(!state.is_ati_current());
  }

  #[test]
  fn power_words() {
    let state = state(SystemProps::new().with_suspend_mode(PowerMode::Low));
    assert_eq!(state.suspend_mode(), PowerMode::Low);

    let suspend = state.suspend_settings();
    assert!(!suspend.redo_ati());
    assert!(!suspend.ack_reset());
    assert!(suspend.disable_auto());
    assert_eq!(suspend.power_mode(), PowerMode::Low);

    assert_eq!(state.wake_settings(), suspend.with_power_mode(PowerMode::Normal));
    assert_eq!(state.resume_settings(), suspend.with_disable_auto(false));
  }
}
