//! Input reporting: turning a status snapshot into key, switch and slider
//! reports.

mod report;
mod status;

pub use status::{StatusSnapshot, SysFlags};

use crate::config::{EventKind, Keymap};
use crate::reg::{NUM_CHANNELS, NUM_SLIDERS};
use crate::state::{ChannelLayout, DeviceState, Route, SliderMode};

/// Logical input device a report belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputDevice {
  /// Per-channel keys and the Hall-effect switch.
  Keypad,
  /// One device per slider, gesture keys or touch plus position.
  Slider(u8),
}

/// Receiver for decoded input.
///
/// Reports carry the current level of every mapped input, changed or not;
/// filtering repeats is left to the sink. A [`EventSink::sync`] closes a
/// batch for one device.
pub trait EventSink {
  fn key(&mut self, device: InputDevice, code: u16, pressed: bool);

  fn switch(&mut self, code: u16, active: bool);

  fn touch(&mut self, slider: u8, touched: bool);

  /// Raw slider position, only sent while the slider is touched.
  fn position(&mut self, slider: u8, x: u8);

  fn sync(&mut self, device: InputDevice);
}

/// Inputs each logical device can emit, for registering them with an input
/// stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Capabilities {
  keymap: Keymap,
  layout: ChannelLayout,
  sliders: [SliderMode; NUM_SLIDERS],
}

impl Capabilities {
  /// Mapped keypad keys, duplicates included.
  pub fn keypad_keys(&self) -> impl Iterator<Item = u16> + '_ {
    EventKind::ALL.into_iter().flat_map(move |kind| {
      (0..NUM_CHANNELS)
        .filter(move |&ch| self.layout.route(ch) == Route::Key)
        .filter_map(move |ch| self.keymap.key(kind, ch))
    })
  }

  /// Switch codes, only when the Hall-effect pair is in use.
  pub fn keypad_switches(&self) -> impl Iterator<Item = u16> + '_ {
    let hall = matches!(self.layout, ChannelLayout::HallPair { .. });
    EventKind::ALL.into_iter().filter_map(move |kind| self.keymap.switch(kind)).filter(move |_| hall)
  }

  pub fn slider(&self, slider: usize) -> SliderMode {
    self.sliders.get(slider).copied().unwrap_or(SliderMode::None)
  }

  /// Gesture keys of a slider in gesture mode.
  pub fn slider_keys(&self, slider: usize) -> impl Iterator<Item = u16> + '_ {
    let keyed = self.slider(slider) == SliderMode::Gesture;
    self.keymap.slider_keys(slider).filter(move |_| keyed)
  }
}

impl DeviceState {
  pub fn capabilities(&self) -> Capabilities {
    Capabilities {
      keymap: self.keymap,
      layout: self.layout,
      sliders: [self.slider_mode(0), self.slider_mode(1)],
    }
  }
}
