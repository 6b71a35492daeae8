use crate::reg::{NUM_CHANNELS, NUM_GESTURES, NUM_SLIDERS};

/// Event-mask bits in the system settings.
pub(crate) mod mask {
  pub const PROX: u8 = 1 << 0;
  pub const TOUCH: u8 = 1 << 1;
  pub const DEEP: u8 = 1 << 2;
  pub const GESTURE: u8 = 1 << 3;
  pub const SYS: u8 = 1 << 6;
}

/// Byte offsets of the channel state bitmaps within the status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StateOffset {
  Prox = 0,
  Direction = 1,
  Touch = 2,
  Deep = 3,
}

/// Threshold slots within a channel block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ThresholdSlot {
  Prox = 0,
  Touch = 1,
  Deep = 2,
}

/// One of the six per-channel events: proximity, touch and deep touch, each
/// in the "down" (signal falls) or "up" (signal rises) direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
  ProxDown = 0,
  ProxUp = 1,
  TouchDown = 2,
  TouchUp = 3,
  DeepDown = 4,
  DeepUp = 5,
}

impl EventKind {
  pub const COUNT: usize = 6;
  pub const ALL: [Self; Self::COUNT] =
    [Self::ProxDown, Self::ProxUp, Self::TouchDown, Self::TouchUp, Self::DeepDown, Self::DeepUp];

  /// Name of the child node that configures this event.
  pub const fn node_name(self) -> &'static str {
    match self {
      Self::ProxDown => "event-prox",
      Self::ProxUp => "event-prox-alt",
      Self::TouchDown => "event-touch",
      Self::TouchUp => "event-touch-alt",
      Self::DeepDown => "event-deep",
      Self::DeepUp => "event-deep-alt",
    }
  }

  pub const fn state(self) -> StateOffset {
    match self {
      Self::ProxDown | Self::ProxUp => StateOffset::Prox,
      Self::TouchDown | Self::TouchUp => StateOffset::Touch,
      Self::DeepDown | Self::DeepUp => StateOffset::Deep,
    }
  }

  pub const fn threshold(self) -> ThresholdSlot {
    match self {
      Self::ProxDown | Self::ProxUp => ThresholdSlot::Prox,
      Self::TouchDown | Self::TouchUp => ThresholdSlot::Touch,
      Self::DeepDown | Self::DeepUp => ThresholdSlot::Deep,
    }
  }

  pub const fn is_up(self) -> bool {
    matches!(self, Self::ProxUp | Self::TouchUp | Self::DeepUp)
  }

  pub(crate) const fn mask(self) -> u8 {
    match self.state() {
      StateOffset::Prox | StateOffset::Direction => mask::PROX,
      StateOffset::Touch => mask::TOUCH,
      StateOffset::Deep => mask::DEEP,
    }
  }
}

/// Slider gestures, in the bit order the device reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gesture {
  Tap = 0,
  Hold = 1,
  FlickPositive = 2,
  FlickNegative = 3,
}

impl Gesture {
  pub const ALL: [Self; NUM_GESTURES] = [Self::Tap, Self::Hold, Self::FlickPositive, Self::FlickNegative];

  /// Tap and flicks fire once and must be released right after reporting;
  /// hold is a level.
  pub const fn is_momentary(self) -> bool {
    !matches!(self, Self::Hold)
  }

  pub(crate) const fn bit(self) -> u8 {
    1 << self as u8
  }
}

/// Event to code routing, resolved while building the configuration.
///
/// A code of `None` means the event is left unmapped and never reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Keymap {
  keys: [[Option<u16>; NUM_CHANNELS]; EventKind::COUNT],
  switches: [Option<u16>; EventKind::COUNT],
  gestures: [[Option<u16>; NUM_GESTURES]; NUM_SLIDERS],
}

impl Keymap {
  pub const fn new() -> Self {
    Self {
      keys: [[None; NUM_CHANNELS]; EventKind::COUNT],
      switches: [None; EventKind::COUNT],
      gestures: [[None; NUM_GESTURES]; NUM_SLIDERS],
    }
  }

  pub fn key(&self, kind: EventKind, channel: usize) -> Option<u16> {
    self.keys[kind as usize].get(channel).copied().flatten()
  }

  pub fn switch(&self, kind: EventKind) -> Option<u16> {
    self.switches[kind as usize]
  }

  pub fn gesture(&self, slider: usize, gesture: Gesture) -> Option<u16> {
    self.gestures.get(slider).and_then(|g| g[gesture as usize])
  }

  pub(crate) fn has_gestures(&self, slider: usize) -> bool {
    self.gestures.get(slider).is_some_and(|g| g.iter().any(Option::is_some))
  }

  pub(crate) fn set_key(&mut self, kind: EventKind, channel: usize, code: Option<u16>) {
    self.keys[kind as usize][channel] = code;
  }

  pub(crate) fn set_switch(&mut self, kind: EventKind, code: Option<u16>) {
    self.switches[kind as usize] = code;
  }

  pub(crate) fn set_gesture(&mut self, slider: usize, gesture: Gesture, code: Option<u16>) {
    self.gestures[slider][gesture as usize] = code;
  }

  pub fn slider_keys(&self, slider: usize) -> impl Iterator<Item = u16> + '_ {
    self.gestures.get(slider).into_iter().flatten().filter_map(|c| *c)
  }
}
