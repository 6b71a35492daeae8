/******************************************************************************
 * Refer to IQS269A datasheet for more information, available here:           *
 * - https://www.azoteq.com/design/datasheets/                                *
 * ========================================================================== *
 *                       IQS269A - Registers & Memory Map                     *
*******************************************************************************/

/// Default 7-bit I²C address of the IQS269A.
pub const I2C_ADDR: u8 = 0x44;

pub(crate) const PRODUCT_NUMBER: u8 = 0x4F;
/// Firmware revisions below this one use the slower tap/swipe timebase and
/// need the TWS unlock sequence.
pub(crate) const FW_NUM_3: u8 = 0x10;

pub const NUM_CHANNELS: usize = 8;
pub const NUM_SLIDERS: usize = 2;
pub const NUM_GESTURES: usize = 4;
pub const MAX_KEYCODES: usize = NUM_SLIDERS * NUM_GESTURES;

pub(crate) const HALL_INACTIVE: usize = 6;
pub(crate) const HALL_ACTIVE: usize = 7;

// Calibration data A (0x35): Hall-effect bins for the left and right pads
pub(crate) const HALL_BIN_L_SHIFT: u16 = 12;
pub(crate) const HALL_BIN_R_SHIFT: u16 = 8;
pub(crate) const HALL_BIN_MASK: u16 = 0x0F;
pub(crate) const HALL_PAD_R: u8 = 1 << 0;
pub(crate) const HALL_PAD_L: u8 = 1 << 1;

// Hall UI register (0xF5)
pub(crate) const HALL_UI_ENABLE: u16 = 1 << 15;

// Unlock sequence required by early silicon shipping with the TWS OTP option.
pub(crate) const TWS_INIT: [(Reg, u16); 3] = [
  (Reg::TouchHoldSliderSelect, 0x0014),
  (Reg::TwsUnlock, 0x580F),
  (Reg::TwsUnlock, 0x59EF),
];

#[allow(dead_code)]
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Reg {
  // Version information (0x00..0x01)
  VersionInfo = 0x00,

  // System flags, gesture flags and channel states (0x02..0x05)
  SysFlags = 0x02,

  // Channel counts, little endian (0x08..0x0F)
  ChannelCounts = 0x08,

  // Slider coordinates (0x30)
  SliderX = 0x30,

  // Hall-effect calibration bins (0x35)
  CalDataA = 0x35,

  // System settings, followed by the eight channel blocks (0x80..0xC3)
  SysSettings = 0x80,
  TouchHoldSliderSelect = 0x89,

  TwsUnlock = 0xF0,
  HallUi = 0xF5,
}

impl From<Reg> for u8 {
  fn from(r: Reg) -> Self {
    r as u8
  }
}
