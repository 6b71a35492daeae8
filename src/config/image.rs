use bitfield_struct::bitfield;

use crate::codec::{AtiBase, PowerMode};
use crate::reg::NUM_CHANNELS;

/// General system settings (0x80).
#[bitfield(u16, defmt = cfg(feature = "defmt"))]
#[derive(PartialEq, Eq)]
pub struct General {
  /// Clear the device's reset indicator.
  pub ack_reset: bool,
  __: bool,
  /// Run ATI on every channel once the settings land.
  pub redo_ati: bool,
  ___: bool,
  /// Event mode while in low power, needed for raw slider reporting.
  pub event_mode_lp: bool,
  pub event_mode: bool,
  pub reseed_offset: bool,
  pub slider_swipe: bool,
  #[bits(3)]
  pub ulp_update: u8,
  #[bits(2)]
  pub power_mode: PowerMode,
  pub disable_auto: bool,
  pub ulp_auto: bool,
  pub clock_divider: bool,
}

/// Filter strengths for normal and low power modes.
#[bitfield(u8, defmt = cfg(feature = "defmt"))]
#[derive(PartialEq, Eq)]
pub struct FilterStrength {
  #[bits(2)]
  pub np_count: u8,
  #[bits(2)]
  pub np_lta: u8,
  #[bits(2)]
  pub lp_count: u8,
  #[bits(2)]
  pub lp_lta: u8,
}

#[bitfield(u16, defmt = cfg(feature = "defmt"))]
#[derive(PartialEq, Eq)]
pub struct MiscA {
  pub global_cap_increase: bool,
  #[bits(3)]
  __: u8,
  #[bits(2)]
  pub tx_freq: u8,
  pub dual_direction: bool,
  ___: bool,
  #[bits(3)]
  pub gpio3_select: u8,
  ____: bool,
  pub filter_disable: bool,
  pub ati_band_tighten: bool,
  pub ati_lp_only: bool,
  pub ati_band_disable: bool,
}

#[bitfield(u16, defmt = cfg(feature = "defmt"))]
#[derive(PartialEq, Eq)]
pub struct MiscB {
  #[bits(2)]
  pub slider_filter_strength: u8,
  #[bits(2)]
  __: u8,
  pub tracking_enable: bool,
  ___: bool,
  #[bits(2)]
  pub reseed_select: u8,
  #[bits(8)]
  ____: u8,
}

/// Channel engine settings, first word.
#[bitfield(u16, defmt = cfg(feature = "defmt"))]
#[derive(PartialEq, Eq)]
pub struct EngineA {
  #[bits(4)]
  pub sense_mode: u8,
  __: bool,
  #[bits(2)]
  pub proj_bias: u8,
  pub invert: bool,
  #[bits(2)]
  pub ati_mode: u8,
  #[bits(2)]
  ___: u8,
  pub local_cap_size: bool,
  /// Ground inactive Rx pins; cleared to let them float.
  pub rx_gnd_inactive: bool,
  ____: bool,
  /// Measurement capacitor size; cleared to decrease it.
  pub meas_cap_size: bool,
}

/// Channel engine settings, second word.
#[bitfield(u16, defmt = cfg(feature = "defmt"))]
#[derive(PartialEq, Eq)]
pub struct EngineB {
  /// ATI target in steps of 32 counts.
  #[bits(6)]
  pub ati_target: u8,
  #[bits(2)]
  pub ati_base: AtiBase,
  pub static_enable: bool,
  #[bits(2)]
  pub sense_freq: u8,
  #[bits(2)]
  __: u8,
  pub local_cap_enable: bool,
  #[bits(2)]
  ___: u8,
}

/// Deep touch hysteresis lives in the upper nibble, touch in the lower.
#[bitfield(u8, defmt = cfg(feature = "defmt"))]
#[derive(PartialEq, Eq)]
pub struct Hysteresis {
  #[bits(4)]
  pub touch: u8,
  #[bits(4)]
  pub deep: u8,
}

/// Per-channel register block, 14 bytes on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelRegister {
  pub rx_enable: u8,
  pub tx_enable: u8,
  pub engine_a: EngineA,
  pub engine_b: EngineB,
  pub ati_comp: u16,
  /// Proximity, touch and deep touch thresholds.
  pub thresholds: [u8; 3],
  pub hysteresis: Hysteresis,
  pub assoc_select: u8,
  pub assoc_weight: u8,
}

impl ChannelRegister {
  pub const LEN: usize = 14;
}

impl From<[u8; ChannelRegister::LEN]> for ChannelRegister {
  fn from(b: [u8; ChannelRegister::LEN]) -> Self {
    Self {
      rx_enable: b[0],
      tx_enable: b[1],
      engine_a: EngineA::from_bits(u16::from_be_bytes([b[2], b[3]])),
      engine_b: EngineB::from_bits(u16::from_be_bytes([b[4], b[5]])),
      ati_comp: u16::from_be_bytes([b[6], b[7]]),
      thresholds: [b[8], b[9], b[10]],
      hysteresis: Hysteresis::from_bits(b[11]),
      assoc_select: b[12],
      assoc_weight: b[13],
    }
  }
}

impl From<ChannelRegister> for [u8; ChannelRegister::LEN] {
  fn from(ch: ChannelRegister) -> Self {
    let a = ch.engine_a.into_bits().to_be_bytes();
    let b = ch.engine_b.into_bits().to_be_bytes();
    let comp = ch.ati_comp.to_be_bytes();
    let [prox, touch, deep] = ch.thresholds;
    [
      ch.rx_enable,
      ch.tx_enable,
      a[0],
      a[1],
      b[0],
      b[1],
      comp[0],
      comp[1],
      prox,
      touch,
      deep,
      ch.hysteresis.into_bits(),
      ch.assoc_select,
      ch.assoc_weight,
    ]
  }
}

/// The complete system and channel configuration block starting at 0x80.
///
/// Read once at probe, modified in memory by the builders and written back in
/// one burst. Fields the builders never touch keep whatever the device
/// reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterImage {
  pub general: General,
  /// Channels enabled for sensing.
  pub active: u8,
  pub filter: FilterStrength,
  /// Channels that take part in automatic reseed.
  pub reseed: u8,
  /// Event classes masked from raising RDY; a set bit masks.
  pub event_mask: u8,
  pub rate_np: u8,
  pub rate_lp: u8,
  pub rate_ulp: u8,
  pub timeout_pwr: u8,
  pub timeout_rdy: u8,
  pub timeout_lta: u8,
  pub misc_a: MiscA,
  pub misc_b: MiscB,
  pub blocking: u8,
  pub padding: u8,
  /// Channel membership of each slider. Slider 1 doubles as the touch-hold
  /// ceiling on parts with the hold OTP option.
  pub slider_select: [u8; 2],
  pub timeout_tap: u8,
  pub timeout_swipe: u8,
  pub thresh_swipe: u8,
  /// Channels recalibrated when ATI is redone.
  pub redo_ati: u8,
  pub channels: [ChannelRegister; NUM_CHANNELS],
}

impl RegisterImage {
  pub const SYS_LEN: usize = 24;
  pub const LEN: usize = Self::SYS_LEN + NUM_CHANNELS * ChannelRegister::LEN;
}

impl From<[u8; RegisterImage::LEN]> for RegisterImage {
  fn from(b: [u8; RegisterImage::LEN]) -> Self {
    let mut channels = [ChannelRegister::default(); NUM_CHANNELS];
    for (ch, chunk) in channels.iter_mut().zip(b[Self::SYS_LEN..].chunks_exact(ChannelRegister::LEN)) {
      let mut raw = [0u8; ChannelRegister::LEN];
      raw.copy_from_slice(chunk);
      *ch = raw.into();
    }

    Self {
      general: General::from_bits(u16::from_be_bytes([b[0], b[1]])),
      active: b[2],
      filter: FilterStrength::from_bits(b[3]),
      reseed: b[4],
      event_mask: b[5],
      rate_np: b[6],
      rate_lp: b[7],
      rate_ulp: b[8],
      timeout_pwr: b[9],
      timeout_rdy: b[10],
      timeout_lta: b[11],
      misc_a: MiscA::from_bits(u16::from_be_bytes([b[12], b[13]])),
      misc_b: MiscB::from_bits(u16::from_be_bytes([b[14], b[15]])),
      blocking: b[16],
      padding: b[17],
      slider_select: [b[18], b[19]],
      timeout_tap: b[20],
      timeout_swipe: b[21],
      thresh_swipe: b[22],
      redo_ati: b[23],
      channels,
    }
  }
}

impl From<RegisterImage> for [u8; RegisterImage::LEN] {
  fn from(img: RegisterImage) -> Self {
    let mut b = [0u8; RegisterImage::LEN];
    b[0..2].copy_from_slice(&img.general.into_bits().to_be_bytes());
    b[2] = img.active;
    b[3] = img.filter.into_bits();
    b[4] = img.reseed;
    b[5] = img.event_mask;
    b[6] = img.rate_np;
    b[7] = img.rate_lp;
    b[8] = img.rate_ulp;
    b[9] = img.timeout_pwr;
    b[10] = img.timeout_rdy;
    b[11] = img.timeout_lta;
    b[12..14].copy_from_slice(&img.misc_a.into_bits().to_be_bytes());
    b[14..16].copy_from_slice(&img.misc_b.into_bits().to_be_bytes());
    b[16] = img.blocking;
    b[17] = img.padding;
    b[18..20].copy_from_slice(&img.slider_select);
    b[20] = img.timeout_tap;
    b[21] = img.timeout_swipe;
    b[22] = img.thresh_swipe;
    b[23] = img.redo_ati;

    for (chunk, ch) in b[RegisterImage::SYS_LEN..].chunks_exact_mut(ChannelRegister::LEN).zip(img.channels) {
      chunk.copy_from_slice(&<[u8; ChannelRegister::LEN]>::from(ch));
    }
    b
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn image_is_136_bytes() {
    assert_eq!(RegisterImage::LEN, 136);
  }

  #[test]
  fn words_are_big_endian() {
    let mut raw = [0u8; RegisterImage::LEN];
    raw[0] = 0x80; // clock divider
    raw[1] = 0x05; // redo ATI + ack reset
    let base = RegisterImage::SYS_LEN + 3 * ChannelRegister::LEN;
    raw[base + 2] = 0xA0; // meas cap size + rx ground
    raw[base + 3] = 0x0F; // sense mode 15
    raw[base + 5] = 0xC5; // base 200, target 5 * 32

    let img = RegisterImage::from(raw);
    assert!(img.general.clock_divider());
    assert!(img.general.redo_ati());
    assert!(img.general.ack_reset());
    assert!(!img.general.event_mode());

    let ch = img.channels[3];
    assert!(ch.engine_a.meas_cap_size());
    assert!(ch.engine_a.rx_gnd_inactive());
    assert_eq!(ch.engine_a.sense_mode(), 15);
    assert_eq!(ch.engine_b.ati_base(), AtiBase::Base200);
    assert_eq!(ch.engine_b.ati_target(), 5);

    assert_eq!(<[u8; RegisterImage::LEN]>::from(img), raw);
  }

  #[test]
  fn unknown_bits_survive_a_rewrite() {
    let mut raw = [0u8; RegisterImage::LEN];
    raw[0] = 0x00;
    raw[1] = 0x0A; // reserved bits 1 and 3
    raw[RegisterImage::SYS_LEN + 2] = 0x4C; // engine A reserved bits 14, 11, 10
    let mut img = RegisterImage::from(raw);
    img.general.set_event_mode(true);
    let out = <[u8; RegisterImage::LEN]>::from(img);
    assert_eq!(out[1], 0x2A);
    assert_eq!(out[RegisterImage::SYS_LEN + 2], 0x4C);
  }

  #[test]
  fn hysteresis_nibbles() {
    let h = Hysteresis::new().with_deep(0xA).with_touch(0x3);
    assert_eq!(h.into_bits(), 0xA3);
  }
}
