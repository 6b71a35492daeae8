use bitfield_struct::bitfield;

use crate::codec::PowerMode;
use crate::config::StateOffset;

/// System flags word.
#[bitfield(u16, defmt = cfg(feature = "defmt"))]
#[derive(PartialEq, Eq)]
pub struct SysFlags {
  #[bits(10)]
  __: u16,
  /// ATI in progress; channel states are not meaningful.
  pub in_ati: bool,
  #[bits(2)]
  pub power_mode: PowerMode,
  #[bits(2)]
  ___: u8,
  /// The device reset since the last acknowledgement and lost its settings.
  pub show_reset: bool,
}

/// One coherent read of the flags, gesture and channel state registers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusSnapshot {
  pub system: SysFlags,
  /// Four gesture bits per slider, slider 0 in the low nibble.
  pub gesture: u8,
  /// Proximity, direction, touch and deep touch bitmaps, one bit per channel.
  pub states: [u8; 4],
}

impl StatusSnapshot {
  pub const LEN: usize = 8;

  pub fn reset_occurred(&self) -> bool {
    self.system.show_reset()
  }

  pub fn calibrating(&self) -> bool {
    self.system.in_ati()
  }

  pub fn state(&self, offset: StateOffset) -> u8 {
    self.states[offset as usize]
  }
}

impl From<[u8; StatusSnapshot::LEN]> for StatusSnapshot {
  fn from(b: [u8; StatusSnapshot::LEN]) -> Self {
    Self {
      system: SysFlags::from_bits(u16::from_be_bytes([b[0], b[1]])),
      gesture: b[2],
      states: [b[4], b[5], b[6], b[7]],
    }
  }
}
