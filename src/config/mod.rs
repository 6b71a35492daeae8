//! Register image and the builders that fill it from configuration properties.

pub(crate) mod channel;
mod image;
mod keymap;
mod props;
mod system;

pub use channel::{ChannelProps, EventProps};
pub use image::*;
pub use keymap::{EventKind, Gesture, Keymap, StateOffset, ThresholdSlot};
pub use props::{Node, PropertySource, Value};
pub use system::SystemProps;

use crate::codec::ConfigError;
use crate::state::{self, DeviceState, OtpOption, SliderMode, Version};

/// Complete device configuration: system properties plus one entry per
/// channel in use.
///
/// # Example
/// ```no_run
/// use iqs269a::{ChannelProps, Config, EventKind, EventProps, SystemProps};
///
/// const KEYPAD: [ChannelProps; 1] = [ChannelProps::new(2)
///   .with_pins(&[2], &[])
///   .with_ati(3, 100, 512)
///   .with_event(EventKind::TouchDown, EventProps::new().with_thresh(8).with_code(30))];
///
/// let config = Config::new(SystemProps::new().with_rates(16, 64, 160), &KEYPAD);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config<'a> {
  pub system: SystemProps<'a>,
  pub channels: &'a [ChannelProps<'a>],
}

impl<'a> Config<'a> {
  pub const fn new(system: SystemProps<'a>, channels: &'a [ChannelProps<'a>]) -> Self {
    Self { system, channels }
  }
}

/// Staged configuration. Works on a copy of the image read from the device,
/// so a rejected property leaves nothing half applied.
pub(crate) struct Builder {
  image: RegisterImage,
  keymap: Keymap,
  hall: bool,
  version: Version,
  otp: OtpOption,
}

impl Builder {
  pub(crate) const fn new(image: RegisterImage, version: Version, otp: OtpOption) -> Self {
    Self { image, keymap: Keymap::new(), hall: false, version, otp }
  }

  fn slider_mode(&self, slider: usize) -> SliderMode {
    state::slider_mode(&self.image, &self.keymap, self.otp, slider)
  }

  fn finish(self) -> DeviceState {
    DeviceState::new(self.image, self.keymap, self.hall, self.version, self.otp)
  }
}

impl DeviceState {
  /// Apply `config` on top of `image`, the settings block as read from the
  /// device.
  ///
  /// The result depends only on the inputs; nothing is sent to the device.
  pub fn build(image: RegisterImage, version: Version, otp: OtpOption, config: &Config) -> Result<Self, ConfigError> {
    let mut builder = Builder::new(image, version, otp);
    builder.system(&config.system)?;
    for ch in config.channels {
      builder.channel(ch)?;
    }
    builder.general(&config.system)?;
    Ok(builder.finish())
  }
}
