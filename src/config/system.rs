use super::keymap::{mask, Gesture};
use super::Builder;
use crate::codec::{self, ConfigError, PowerMode, Result};
use crate::reg::{MAX_KEYCODES, NUM_GESTURES, NUM_SLIDERS};
use crate::state::SliderMode;

const FILTER_MAX: u8 = 3;
const RATE_NP_MS_MAX: u8 = 255;
const RATE_LP_MS_MAX: u8 = 255;
const RATE_ULP_MS_MAX: u32 = 4080;
const TIMEOUT_PWR_MS_MAX: u32 = 130560;
const TIMEOUT_LTA_MS_MAX: u32 = 130560;
const TIMEOUT_TAP_MS_MAX: u32 = 4080;
const TIMEOUT_SWIPE_MS_MAX: u32 = 4080;
const THRESH_SWIPE_MAX: u8 = 255;
const TOUCH_HOLD_MS_MIN: u32 = 256;
const TOUCH_HOLD_MS_MAX: u32 = 65280;
/// Touch-and-hold ceiling early silicon reports after power-on.
pub(crate) const TOUCH_HOLD_DEFAULT: u8 = 0x14;

/// Device-wide properties.
///
/// Every setting is optional; an absent value leaves whatever the device
/// reported untouched, except for the flags, which are always rewritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemProps<'a> {
  /// Treat channels 6 and 7 as a Hall-effect pair.
  pub hall_enable: bool,

  pub filter_lp_lta: Option<u32>,
  pub filter_lp_count: Option<u32>,
  pub filter_np_lta: Option<u32>,
  pub filter_np_count: Option<u32>,

  pub rate_np_ms: Option<u32>,
  pub rate_lp_ms: Option<u32>,
  /// Rounded down to 16 ms steps.
  pub rate_ulp_ms: Option<u32>,
  /// Rounded down to 512 ms steps.
  pub timeout_pwr_ms: Option<u32>,
  /// Rounded down to 512 ms steps.
  pub timeout_lta_ms: Option<u32>,

  pub ati_band_disable: bool,
  pub ati_lp_only: bool,
  pub ati_band_tighten: bool,
  pub filter_disable: bool,
  /// Channel mirrored on GPIO3.
  pub gpio3_select: Option<u32>,
  pub dual_direction: bool,
  pub tx_freq: Option<u32>,
  pub global_cap_increase: bool,
  pub reseed_select: Option<u32>,
  pub tracking_enable: bool,
  pub filter_slider: Option<u32>,

  /// Touch-and-hold ceiling, only meaningful with the hold OTP option.
  pub touch_hold_ms: Option<u32>,

  pub clock_divider: bool,
  /// Power mode entered on suspend.
  pub suspend_mode: Option<u32>,
  pub ulp_update: Option<u32>,

  /// Slider gesture codes, four per slider: tap, hold, positive flick and
  /// negative flick. Zero leaves a gesture unmapped.
  pub keycodes: Option<&'a [u32]>,
  pub gesture_swipe: bool,
  pub timeout_tap_ms: Option<u32>,
  pub timeout_swipe_ms: Option<u32>,
  pub thresh_swipe: Option<u32>,

  pub reseed_offset: bool,
}

impl<'a> SystemProps<'a> {
  pub const fn new() -> Self {
    Self {
      hall_enable: false,
      filter_lp_lta: None,
      filter_lp_count: None,
      filter_np_lta: None,
      filter_np_count: None,
      rate_np_ms: None,
      rate_lp_ms: None,
      rate_ulp_ms: None,
      timeout_pwr_ms: None,
      timeout_lta_ms: None,
      ati_band_disable: false,
      ati_lp_only: false,
      ati_band_tighten: false,
      filter_disable: false,
      gpio3_select: None,
      dual_direction: false,
      tx_freq: None,
      global_cap_increase: false,
      reseed_select: None,
      tracking_enable: false,
      filter_slider: None,
      touch_hold_ms: None,
      clock_divider: false,
      suspend_mode: None,
      ulp_update: None,
      keycodes: None,
      gesture_swipe: false,
      timeout_tap_ms: None,
      timeout_swipe_ms: None,
      thresh_swipe: None,
      reseed_offset: false,
    }
  }

  pub const fn with_hall(mut self) -> Self {
    self.hall_enable = true;
    self
  }

  /// Low power LTA and count filters, then normal power LTA and count filters.
  pub const fn with_filters(mut self, lp_lta: u32, lp_count: u32, np_lta: u32, np_count: u32) -> Self {
    self.filter_lp_lta = Some(lp_lta);
    self.filter_lp_count = Some(lp_count);
    self.filter_np_lta = Some(np_lta);
    self.filter_np_count = Some(np_count);
    self
  }

  /// Report rates for normal, low and ultra-low power modes.
  pub const fn with_rates(mut self, np_ms: u32, lp_ms: u32, ulp_ms: u32) -> Self {
    self.rate_np_ms = Some(np_ms);
    self.rate_lp_ms = Some(lp_ms);
    self.rate_ulp_ms = Some(ulp_ms);
    self
  }

  pub const fn with_timeouts(mut self, pwr_ms: u32, lta_ms: u32) -> Self {
    self.timeout_pwr_ms = Some(pwr_ms);
    self.timeout_lta_ms = Some(lta_ms);
    self
  }

  pub const fn with_suspend_mode(mut self, mode: PowerMode) -> Self {
    self.suspend_mode = Some(mode as u32);
    self
  }

  pub const fn with_touch_hold(mut self, ms: u32) -> Self {
    self.touch_hold_ms = Some(ms);
    self
  }

  pub const fn with_keycodes(mut self, codes: &'a [u32]) -> Self {
    self.keycodes = Some(codes);
    self
  }

  /// Gesture timing, only applied together with keycodes.
  pub const fn with_gesture_timing(mut self, tap_ms: u32, swipe_ms: u32, swipe_threshold: u32) -> Self {
    self.timeout_tap_ms = Some(tap_ms);
    self.timeout_swipe_ms = Some(swipe_ms);
    self.thresh_swipe = Some(swipe_threshold);
    self
  }
}

impl Builder {
  /// Device-wide settings that do not depend on the channels.
  pub(super) fn system(&mut self, props: &SystemProps) -> Result<()> {
    self.hall = props.hall_enable;
    let img = &mut self.image;

    let mut filter = img.filter;
    if let Some(v) = props.filter_lp_lta {
      filter.set_lp_lta(codec::bounded("azoteq,filt-str-lp-lta", v, FILTER_MAX)?);
    }
    if let Some(v) = props.filter_lp_count {
      filter.set_lp_count(codec::bounded("azoteq,filt-str-lp-cnt", v, FILTER_MAX)?);
    }
    if let Some(v) = props.filter_np_lta {
      filter.set_np_lta(codec::bounded("azoteq,filt-str-np-lta", v, FILTER_MAX)?);
    }
    if let Some(v) = props.filter_np_count {
      filter.set_np_count(codec::bounded("azoteq,filt-str-np-cnt", v, FILTER_MAX)?);
    }
    img.filter = filter;

    if let Some(v) = props.rate_np_ms {
      img.rate_np = codec::bounded("azoteq,rate-np-ms", v, RATE_NP_MS_MAX)?;
    }
    if let Some(v) = props.rate_lp_ms {
      img.rate_lp = codec::bounded("azoteq,rate-lp-ms", v, RATE_LP_MS_MAX)?;
    }
    if let Some(v) = props.rate_ulp_ms {
      img.rate_ulp = codec::scaled("azoteq,rate-ulp-ms", v, RATE_ULP_MS_MAX, 16)?;
    }
    if let Some(v) = props.timeout_pwr_ms {
      img.timeout_pwr = codec::scaled("azoteq,timeout-pwr-ms", v, TIMEOUT_PWR_MS_MAX, 512)?;
    }
    if let Some(v) = props.timeout_lta_ms {
      img.timeout_lta = codec::scaled("azoteq,timeout-lta-ms", v, TIMEOUT_LTA_MS_MAX, 512)?;
    }

    let mut misc_a = img
      .misc_a
      .with_ati_band_disable(props.ati_band_disable)
      .with_ati_lp_only(props.ati_lp_only)
      .with_ati_band_tighten(props.ati_band_tighten)
      .with_filter_disable(props.filter_disable)
      .with_dual_direction(props.dual_direction)
      .with_global_cap_increase(props.global_cap_increase);
    if let Some(v) = props.gpio3_select {
      let ch = codec::channel("azoteq,gpio3-select", v)?;
      misc_a.set_gpio3_select(ch as u8);
    }
    if let Some(v) = props.tx_freq {
      misc_a = codec::field("azoteq,tx-freq", v, |v| misc_a.with_tx_freq_checked(v))?;
    }
    img.misc_a = misc_a;

    let mut misc_b = img.misc_b.with_tracking_enable(props.tracking_enable);
    if let Some(v) = props.reseed_select {
      misc_b = codec::field("azoteq,reseed-select", v, |v| misc_b.with_reseed_select_checked(v))?;
    }
    if let Some(v) = props.filter_slider {
      misc_b.set_slider_filter_strength(codec::bounded("azoteq,filt-str-slider", v, FILTER_MAX)?);
    }
    img.misc_b = misc_b;

    // Channel membership is rebuilt from scratch by the channel nodes.
    img.active = 0;
    img.reseed = 0;
    img.blocking = 0;
    img.slider_select[0] = 0;

    // With the hold option, slider 1's selection register holds the
    // touch-and-hold ceiling instead.
    if self.otp.has_touch_hold() {
      if let Some(ms) = props.touch_hold_ms {
        if !(TOUCH_HOLD_MS_MIN..=TOUCH_HOLD_MS_MAX).contains(&ms) {
          return Err(ConfigError::out_of_range("azoteq,touch-hold-ms", ms));
        }
        img.slider_select[1] = (ms / 256) as u8;
      } else if self.version.is_early_silicon() {
        // Early silicon may report an invalid ceiling after a soft reset,
        // so the power-on default is pinned in the image.
        img.slider_select[1] = TOUCH_HOLD_DEFAULT;
      }
    } else {
      img.slider_select[1] = 0;
    }

    img.event_mask = !mask::SYS;
    Ok(())
  }

  /// Settings that depend on the finished channel configuration.
  pub(super) fn general(&mut self, props: &SystemProps) -> Result<()> {
    self.image.redo_ati = self.image.active;

    let mut general = self.image.general;
    if props.clock_divider {
      general.set_clock_divider(true);
    }

    // Normal and low power switch automatically; ultra-low power is
    // reserved for suspend.
    general.set_ulp_auto(false);
    general.set_disable_auto(false);
    general.set_power_mode(PowerMode::Normal);
    if let Some(v) = props.suspend_mode {
      let mode = codec::bounded("azoteq,suspend-mode", v, 3)?;
      general.set_power_mode(PowerMode::from_bits(mode));
    }
    if let Some(v) = props.ulp_update {
      general = codec::field("azoteq,ulp-update", v, |v| general.with_ulp_update_checked(v))?;
    }

    if let Some(codes) = props.keycodes {
      if codes.len() > MAX_KEYCODES {
        return Err(ConfigError::out_of_range("linux,keycodes", codes.len() as u32));
      }
      for (i, &code) in codes.iter().enumerate() {
        let code = keycode("linux,keycodes", code)?;
        self.keymap.set_gesture(i / NUM_GESTURES, Gesture::ALL[i % NUM_GESTURES], code);
      }

      if props.gesture_swipe {
        general.set_slider_swipe(true);
      }

      // Early silicon counts gesture timeouts in finer steps.
      let scale = if self.version.is_early_silicon() { 4 } else { 1 };
      if let Some(ms) = props.timeout_tap_ms {
        self.image.timeout_tap = codec::scaled("azoteq,timeout-tap-ms", ms, TIMEOUT_TAP_MS_MAX / scale, 16 / scale)?;
      }
      if let Some(ms) = props.timeout_swipe_ms {
        self.image.timeout_swipe =
          codec::scaled("azoteq,timeout-swipe-ms", ms, TIMEOUT_SWIPE_MS_MAX / scale, 16 / scale)?;
      }
      if let Some(v) = props.thresh_swipe {
        self.image.thresh_swipe = codec::bounded("azoteq,thresh-swipe", v, THRESH_SWIPE_MAX)?;
      }

      self.image.event_mask &= !mask::GESTURE;
    }

    general.set_reseed_offset(props.reseed_offset);
    general.set_event_mode(true);

    // Raw slider coordinates need streaming in normal power.
    if (0..NUM_SLIDERS).any(|i| self.slider_mode(i) == SliderMode::Raw) {
      general.set_event_mode_lp(true);
    }

    general.set_redo_ati(true);
    general.set_ack_reset(true);
    self.image.general = general;
    Ok(())
  }
}

/// Map a configured code to the keymap, where zero means unmapped.
pub(super) fn keycode(property: &'static str, code: u32) -> Result<Option<u16>> {
  let code = u16::try_from(code).map_err(|_| ConfigError::out_of_range(property, code))?;
  Ok((code != 0).then_some(code))
}
