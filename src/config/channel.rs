use super::image::{EngineA, EngineB};
use super::keymap::{EventKind, ThresholdSlot};
use super::system::keycode;
use super::Builder;
use crate::codec::{self, AtiBase, ConfigError, LocalCapSize, Result};
use crate::reg::HALL_ACTIVE;

const WEIGHT_MAX: u8 = 255;
const THRESH_MAX: u8 = 255;
const HYST_MAX: u8 = 15;

/// Threshold, hysteresis and code for one channel event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventProps {
  pub thresh: Option<u32>,
  /// Ignored for proximity events, which have no hysteresis.
  pub hyst: Option<u32>,
  /// Input code to report; zero leaves the event unmapped.
  pub code: Option<u32>,
}

impl EventProps {
  pub const fn new() -> Self {
    Self { thresh: None, hyst: None, code: None }
  }

  pub const fn with_thresh(mut self, thresh: u32) -> Self {
    self.thresh = Some(thresh);
    self
  }

  pub const fn with_hyst(mut self, hyst: u32) -> Self {
    self.hyst = Some(hyst);
    self
  }

  pub const fn with_code(mut self, code: u32) -> Self {
    self.code = Some(code);
    self
  }
}

/// Properties of a single sensing channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelProps<'a> {
  /// Channel index, 0 to 7.
  pub reg: u32,
  pub reseed_disable: bool,
  pub blocking_enable: bool,
  pub slider0_select: bool,
  pub slider1_select: bool,
  pub rx_enable: Option<&'a [u32]>,
  pub tx_enable: Option<&'a [u32]>,
  pub meas_cap_decrease: bool,
  pub rx_float_inactive: bool,
  pub local_cap_size: Option<u32>,
  pub invert_enable: bool,
  pub proj_bias: Option<u32>,
  pub sense_mode: Option<u32>,
  pub sense_freq: Option<u32>,
  pub static_enable: bool,
  pub ati_mode: Option<u32>,
  /// One of 75, 100, 150 or 200.
  pub ati_base: Option<u32>,
  /// Rounded down to a multiple of 32, at most 2016.
  pub ati_target: Option<u32>,
  pub assoc_select: Option<&'a [u32]>,
  pub assoc_weight: Option<u32>,
  pub events: [EventProps; EventKind::COUNT],
}

impl<'a> ChannelProps<'a> {
  pub const fn new(reg: u32) -> Self {
    Self {
      reg,
      reseed_disable: false,
      blocking_enable: false,
      slider0_select: false,
      slider1_select: false,
      rx_enable: None,
      tx_enable: None,
      meas_cap_decrease: false,
      rx_float_inactive: false,
      local_cap_size: None,
      invert_enable: false,
      proj_bias: None,
      sense_mode: None,
      sense_freq: None,
      static_enable: false,
      ati_mode: None,
      ati_base: None,
      ati_target: None,
      assoc_select: None,
      assoc_weight: None,
      events: [EventProps::new(); EventKind::COUNT],
    }
  }

  pub const fn with_pins(mut self, rx: &'a [u32], tx: &'a [u32]) -> Self {
    self.rx_enable = Some(rx);
    self.tx_enable = Some(tx);
    self
  }

  pub const fn with_sense_mode(mut self, mode: u32) -> Self {
    self.sense_mode = Some(mode);
    self
  }

  pub const fn with_ati(mut self, mode: u32, base: u32, target: u32) -> Self {
    self.ati_mode = Some(mode);
    self.ati_base = Some(base);
    self.ati_target = Some(target);
    self
  }

  /// Add the channel to slider 0 or 1. Other indices are ignored.
  pub const fn with_slider(mut self, slider: usize) -> Self {
    match slider {
      0 => self.slider0_select = true,
      1 => self.slider1_select = true,
      _ => {}
    }
    self
  }

  pub const fn with_event(mut self, kind: EventKind, event: EventProps) -> Self {
    self.events[kind as usize] = event;
    self
  }
}

impl Builder {
  pub(super) fn channel(&mut self, props: &ChannelProps) -> Result<()> {
    let ch = codec::channel("reg", props.reg)?;
    self.apply_channel(ch, props).map_err(|e| e.on_channel(ch as u8))
  }

  fn apply_channel(&mut self, ch: usize, props: &ChannelProps) -> Result<()> {
    let bit = 1u8 << ch;
    let img = &mut self.image;

    img.active |= bit;
    if !props.reseed_disable {
      img.reseed |= bit;
    }
    if props.blocking_enable {
      img.blocking |= bit;
    }
    if props.slider0_select {
      img.slider_select[0] |= bit;
    }
    if props.slider1_select && !self.otp.has_touch_hold() {
      img.slider_select[1] |= bit;
    }

    let reg = &mut img.channels[ch];
    if let Some(pins) = props.rx_enable {
      reg.rx_enable = codec::pin_mask("azoteq,rx-enable", pins)?;
    }
    if let Some(pins) = props.tx_enable {
      reg.tx_enable = codec::pin_mask("azoteq,tx-enable", pins)?;
    }

    let mut a = reg
      .engine_a
      .with_meas_cap_size(!props.meas_cap_decrease)
      .with_rx_gnd_inactive(!props.rx_float_inactive)
      .with_invert(props.invert_enable);
    let mut b = reg.engine_b.with_static_enable(props.static_enable);

    let cap = match props.local_cap_size {
      Some(v) => LocalCapSize::try_from(v)?,
      None => LocalCapSize::Off,
    };
    let (size, enable) = cap.encode();
    a.set_local_cap_size(size);
    b.set_local_cap_enable(enable);

    if let Some(v) = props.proj_bias {
      a = codec::field("azoteq,proj-bias", v, |v| a.with_proj_bias_checked(v))?;
    }
    if let Some(v) = props.sense_mode {
      a = codec::field("azoteq,sense-mode", v, |v| a.with_sense_mode_checked(v))?;
    }
    if let Some(v) = props.sense_freq {
      b = codec::field("azoteq,sense-freq", v, |v| b.with_sense_freq_checked(v))?;
    }
    if let Some(v) = props.ati_mode {
      a = ati_mode(a, v)?;
    }
    if let Some(v) = props.ati_base {
      b.set_ati_base(AtiBase::try_from(v)?);
    }
    if let Some(v) = props.ati_target {
      b = ati_target(b, v)?;
    }
    reg.engine_a = a;
    reg.engine_b = b;

    if let Some(pins) = props.assoc_select {
      reg.assoc_select = codec::pin_mask("azoteq,assoc-select", pins)?;
    }
    if let Some(v) = props.assoc_weight {
      reg.assoc_weight = codec::bounded("azoteq,assoc-weight", v, WEIGHT_MAX)?;
    }

    for kind in EventKind::ALL {
      let event = &props.events[kind as usize];
      if let Some(v) = event.thresh {
        reg.thresholds[kind.threshold() as usize] = codec::bounded("azoteq,thresh", v, THRESH_MAX)?;
      }
      if let Some(v) = event.hyst {
        let hyst = codec::bounded("azoteq,hyst", v, HYST_MAX)?;
        match kind.threshold() {
          ThresholdSlot::Deep => reg.hysteresis.set_deep(hyst),
          ThresholdSlot::Touch => reg.hysteresis.set_touch(hyst),
          ThresholdSlot::Prox => {}
        }
      }

      let Some(code) = event.code else { continue };
      let code = keycode("linux,code", code)?;
      // The active half of the Hall pair also reports as a switch; which
      // table is used is decided per report by the channel layout.
      if ch == HALL_ACTIVE {
        self.keymap.set_switch(kind, code);
      }
      self.keymap.set_key(kind, ch, code);
      img.event_mask &= !kind.mask();
    }
    Ok(())
  }
}

pub(crate) fn ati_mode(a: EngineA, mode: u32) -> Result<EngineA> {
  codec::field("azoteq,ati-mode", mode, |v| a.with_ati_mode_checked(v))
}

pub(crate) fn ati_target(b: EngineB, target: u32) -> Result<EngineB> {
  if target > codec::ATI_TARGET_MAX {
    return Err(ConfigError::out_of_range("azoteq,ati-target", target));
  }
  Ok(b.with_ati_target((target / codec::ATI_TARGET_STEP) as u8))
}
