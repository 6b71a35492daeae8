//! Validation and unit conversion shared by the configuration builders.
//!
//! Every helper here validates before anything is written, so a failing
//! property never leaves a half-updated register word behind.

use crate::reg::NUM_CHANNELS;

/// Why a configuration value was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigErrorKind {
  /// The value exceeds the maximum the register field can hold.
  OutOfRange,
  /// The value is not one of the accepted discrete settings.
  InvalidEnum,
}

/// A rejected configuration property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigError {
  pub kind: ConfigErrorKind,
  /// Property name, e.g. `azoteq,ati-target`.
  pub property: &'static str,
  /// Channel the property belongs to, if any.
  pub channel: Option<u8>,
  pub value: u32,
}

impl ConfigError {
  pub const fn out_of_range(property: &'static str, value: u32) -> Self {
    Self { kind: ConfigErrorKind::OutOfRange, property, channel: None, value }
  }

  pub const fn invalid_enum(property: &'static str, value: u32) -> Self {
    Self { kind: ConfigErrorKind::InvalidEnum, property, channel: None, value }
  }

  pub(crate) const fn on_channel(mut self, channel: u8) -> Self {
    self.channel = Some(channel);
    self
  }
}

impl core::fmt::Display for ConfigError {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    let what = match self.kind {
      ConfigErrorKind::OutOfRange => "out of range",
      ConfigErrorKind::InvalidEnum => "invalid",
    };
    match self.channel {
      Some(ch) => write!(f, "channel {}: {} {}: {}", ch, what, self.property, self.value),
      None => write!(f, "{} {}: {}", what, self.property, self.value),
    }
  }
}

pub(crate) type Result<T> = core::result::Result<T, ConfigError>;

/// Narrow `value` into a register field through one of the generated
/// `with_*_checked` setters.
pub(crate) fn field<T, W>(
  property: &'static str,
  value: u32,
  set: impl FnOnce(T) -> core::result::Result<W, ()>,
) -> Result<W>
where
  T: TryFrom<u32>,
{
  T::try_from(value).ok().and_then(|v| set(v).ok()).ok_or(ConfigError::out_of_range(property, value))
}

/// Reject anything above `max`.
pub(crate) fn bounded(property: &'static str, value: u32, max: u8) -> Result<u8> {
  if value > max as u32 {
    return Err(ConfigError::out_of_range(property, value));
  }
  Ok(value as u8)
}

/// Convert a duration into register units of `step` milliseconds.
///
/// The register value is the floor of `ms / step`; anything beyond `max_ms`
/// is rejected before scaling.
pub(crate) fn scaled(property: &'static str, ms: u32, max_ms: u32, step: u32) -> Result<u8> {
  if ms > max_ms {
    return Err(ConfigError::out_of_range(property, ms));
  }
  Ok((ms / step) as u8)
}

/// Build an 8-bit pin mask from a list of pin indices.
pub(crate) fn pin_mask(property: &'static str, pins: &[u32]) -> Result<u8> {
  if pins.len() > NUM_CHANNELS {
    return Err(ConfigError::out_of_range(property, pins.len() as u32));
  }
  pins.iter().try_fold(0u8, |mask, &pin| {
    if pin as usize >= NUM_CHANNELS {
      return Err(ConfigError::out_of_range(property, pin));
    }
    Ok(mask | (1 << pin))
  })
}

/// Validate a channel index.
pub(crate) fn channel(property: &'static str, ch: u32) -> Result<usize> {
  if ch as usize >= NUM_CHANNELS {
    return Err(ConfigError::out_of_range(property, ch));
  }
  Ok(ch as usize)
}

/// ATI base value, selected as a count level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AtiBase {
  Base75 = 0,
  Base100 = 1,
  Base150 = 2,
  Base200 = 3,
}

impl AtiBase {
  pub const fn counts(self) -> u32 {
    match self {
      Self::Base75 => 75,
      Self::Base100 => 100,
      Self::Base150 => 150,
      Self::Base200 => 200,
    }
  }

  pub(crate) const fn into_bits(self) -> u8 {
    self as u8
  }

  pub(crate) const fn from_bits(bits: u8) -> Self {
    match bits & 0b11 {
      0 => Self::Base75,
      1 => Self::Base100,
      2 => Self::Base150,
      _ => Self::Base200,
    }
  }
}

impl TryFrom<u32> for AtiBase {
  type Error = ConfigError;

  fn try_from(counts: u32) -> core::result::Result<Self, ConfigError> {
    match counts {
      75 => Ok(Self::Base75),
      100 => Ok(Self::Base100),
      150 => Ok(Self::Base150),
      200 => Ok(Self::Base200),
      _ => Err(ConfigError::invalid_enum("azoteq,ati-base", counts)),
    }
  }
}

/// ATI target is stored in steps of 32 counts.
pub(crate) const ATI_TARGET_STEP: u32 = 32;
pub(crate) const ATI_TARGET_MAX: u32 = 2016;

/// Local (per-channel) capacitor selection.
///
/// Spread over two bits in different channel words: the size bit in engine A
/// and the enable bit in engine B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LocalCapSize {
  /// Local capacitor disabled.
  Off = 0,
  /// Only the global capacitor contributes.
  GlobalOnly = 1,
  /// Global capacitor plus 0.5 pF.
  GlobalPlusHalfPicofarad = 2,
}

impl LocalCapSize {
  /// `(size bit, enable bit)`
  pub(crate) const fn encode(self) -> (bool, bool) {
    match self {
      Self::Off => (false, false),
      Self::GlobalOnly => (false, true),
      Self::GlobalPlusHalfPicofarad => (true, true),
    }
  }

  pub(crate) const fn decode(size: bool, enable: bool) -> Result<Self> {
    match (size, enable) {
      (false, false) => Ok(Self::Off),
      (false, true) => Ok(Self::GlobalOnly),
      (true, true) => Ok(Self::GlobalPlusHalfPicofarad),
      (true, false) => Err(ConfigError::invalid_enum("azoteq,local-cap-size", 1)),
    }
  }
}

impl TryFrom<u32> for LocalCapSize {
  type Error = ConfigError;

  fn try_from(value: u32) -> core::result::Result<Self, ConfigError> {
    match value {
      0 => Ok(Self::Off),
      1 => Ok(Self::GlobalOnly),
      2 => Ok(Self::GlobalPlusHalfPicofarad),
      _ => Err(ConfigError::invalid_enum("azoteq,local-cap-size", value)),
    }
  }
}

/// Power mode, shared by the system settings and the system flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerMode {
  Normal = 0,
  Low = 1,
  UltraLow = 2,
  Halt = 3,
}

impl PowerMode {
  pub(crate) const fn into_bits(self) -> u8 {
    self as u8
  }

  pub(crate) const fn from_bits(bits: u8) -> Self {
    match bits & 0b11 {
      0 => Self::Normal,
      1 => Self::Low,
      2 => Self::UltraLow,
      _ => Self::Halt,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pin_mask_sets_listed_bits() {
    assert_eq!(pin_mask("azoteq,rx-enable", &[0, 3, 7]), Ok(0b1000_1001));
    assert_eq!(pin_mask("azoteq,rx-enable", &[]), Ok(0));
    assert_eq!(pin_mask("azoteq,rx-enable", &[2, 2]), Ok(0b100));
  }

  #[test]
  fn pin_mask_rejects_bad_pins() {
    let err = pin_mask("azoteq,tx-enable", &[1, 8]).unwrap_err();
    assert_eq!(err.kind, ConfigErrorKind::OutOfRange);
    assert_eq!(err.value, 8);

    let err = pin_mask("azoteq,tx-enable", &[0; 9]).unwrap_err();
    assert_eq!(err.kind, ConfigErrorKind::OutOfRange);
    assert_eq!(err.value, 9);
  }

  #[test]
  fn scaled_floors_and_bounds() {
    assert_eq!(scaled("azoteq,rate-ulp-ms", 4080, 4080, 16), Ok(255));
    assert_eq!(scaled("azoteq,rate-ulp-ms", 31, 4080, 16), Ok(1));
    assert_eq!(scaled("azoteq,timeout-pwr-ms", 130560, 130560, 512), Ok(255));
    let err = scaled("azoteq,timeout-pwr-ms", 130561, 130560, 512).unwrap_err();
    assert_eq!(err, ConfigError::out_of_range("azoteq,timeout-pwr-ms", 130561));
  }

  #[test]
  fn field_rejects_wide_values_before_truncation() {
    let set = |v: u8| if v < 16 { Ok(v) } else { Err(()) };
    assert_eq!(field("azoteq,sense-mode", 15, set), Ok(15));
    assert!(field("azoteq,sense-mode", 16, set).is_err());
    // 256 would wrap to 0 if narrowed first
    assert!(field("azoteq,sense-mode", 256, set).is_err());
  }

  #[test]
  fn ati_base_accepts_only_listed_levels() {
    for base in [75, 100, 150, 200] {
      let b = AtiBase::try_from(base).unwrap();
      assert_eq!(b.counts(), base);
      assert_eq!(AtiBase::from_bits(b.into_bits()), b);
    }
    let err = AtiBase::try_from(125).unwrap_err();
    assert_eq!(err.kind, ConfigErrorKind::InvalidEnum);
  }

  #[test]
  fn local_cap_size_uses_both_bits() {
    assert_eq!(LocalCapSize::GlobalOnly.encode(), (false, true));
    assert_eq!(LocalCapSize::GlobalPlusHalfPicofarad.encode(), (true, true));
    assert_eq!(LocalCapSize::decode(false, false), Ok(LocalCapSize::Off));
    assert!(LocalCapSize::decode(true, false).is_err());
    assert!(LocalCapSize::try_from(3).is_err());
  }
}
