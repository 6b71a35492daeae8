//! Configuration from a property tree, using the property names of the
//! IQS269A device-tree binding.

use super::{Builder, ChannelProps, EventKind, EventProps, RegisterImage, SystemProps};
use crate::codec::ConfigError;
use crate::reg::{MAX_KEYCODES, NUM_CHANNELS};
use crate::state::{DeviceState, OtpOption, Version};

/// Read access to a node of a property tree.
///
/// The device node carries the system properties and one child per channel;
/// each channel may have `event-*` children.
pub trait PropertySource {
  /// Whether `name` exists, whatever its value.
  fn present(&self, name: &str) -> bool;

  fn read_u32(&self, name: &str) -> Option<u32>;

  /// Copy an array property into `out` and return the number of elements the
  /// property holds, which may be more than fit.
  fn read_u32_array(&self, name: &str, out: &mut [u32]) -> Option<usize>;

  fn child(&self, name: &str) -> Option<&dyn PropertySource>;

  fn for_each_child(
    &self,
    f: &mut dyn FnMut(&dyn PropertySource) -> Result<(), ConfigError>,
  ) -> Result<(), ConfigError>;
}

/// Property value in a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value<'a> {
  Flag,
  U32(u32),
  Array(&'a [u32]),
}

/// A property tree that can live in flash.
///
/// ```no_run
/// use iqs269a::{Node, Value};
///
/// const EVENT: Node = Node::new(&[("azoteq,thresh", Value::U32(10)), ("linux,code", Value::U32(2))], &[]);
/// const CH2: Node = Node::new(
///   &[("reg", Value::U32(2)), ("azoteq,rx-enable", Value::Array(&[2]))],
///   &[("event-prox", EVENT)],
/// );
/// const DEVICE: Node = Node::new(&[("azoteq,rate-np-ms", Value::U32(16))], &[("channel@2", CH2)]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node<'a> {
  pub properties: &'a [(&'a str, Value<'a>)],
  pub children: &'a [(&'a str, Node<'a>)],
}

impl<'a> Node<'a> {
  pub const fn new(properties: &'a [(&'a str, Value<'a>)], children: &'a [(&'a str, Node<'a>)]) -> Self {
    Self { properties, children }
  }

  fn get(&self, name: &str) -> Option<Value<'a>> {
    self.properties.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
  }
}

impl PropertySource for Node<'_> {
  fn present(&self, name: &str) -> bool {
    self.get(name).is_some()
  }

  fn read_u32(&self, name: &str) -> Option<u32> {
    match self.get(name)? {
      Value::U32(v) => Some(v),
      Value::Array(a) => a.first().copied(),
      Value::Flag => None,
    }
  }

  fn read_u32_array(&self, name: &str, out: &mut [u32]) -> Option<usize> {
    match self.get(name)? {
      Value::Array(a) => {
        let n = a.len().min(out.len());
        out[..n].copy_from_slice(&a[..n]);
        Some(a.len())
      }
      Value::U32(v) => {
        if let Some(first) = out.first_mut() {
          *first = v;
        }
        Some(1)
      }
      Value::Flag => None,
    }
  }

  fn child(&self, name: &str) -> Option<&dyn PropertySource> {
    self.children.iter().find(|(n, _)| *n == name).map(|(_, node)| node as &dyn PropertySource)
  }

  fn for_each_child(
    &self,
    f: &mut dyn FnMut(&dyn PropertySource) -> Result<(), ConfigError>,
  ) -> Result<(), ConfigError> {
    self.children.iter().try_for_each(|(_, node)| f(node))
  }
}

fn read_array<'b>(
  src: &dyn PropertySource,
  name: &'static str,
  out: &'b mut [u32],
) -> Result<Option<&'b [u32]>, ConfigError> {
  match src.read_u32_array(name, out) {
    None => Ok(None),
    Some(n) if n > out.len() => Err(ConfigError::out_of_range(name, n as u32)),
    Some(n) => Ok(Some(&out[..n])),
  }
}

fn system_props<'b>(src: &dyn PropertySource, keycodes: &'b mut [u32]) -> Result<SystemProps<'b>, ConfigError> {
  Ok(SystemProps {
    hall_enable: src.present("azoteq,hall-enable"),
    filter_lp_lta: src.read_u32("azoteq,filt-str-lp-lta"),
    filter_lp_count: src.read_u32("azoteq,filt-str-lp-cnt"),
    filter_np_lta: src.read_u32("azoteq,filt-str-np-lta"),
    filter_np_count: src.read_u32("azoteq,filt-str-np-cnt"),
    rate_np_ms: src.read_u32("azoteq,rate-np-ms"),
    rate_lp_ms: src.read_u32("azoteq,rate-lp-ms"),
    rate_ulp_ms: src.read_u32("azoteq,rate-ulp-ms"),
    timeout_pwr_ms: src.read_u32("azoteq,timeout-pwr-ms"),
    timeout_lta_ms: src.read_u32("azoteq,timeout-lta-ms"),
    ati_band_disable: src.present("azoteq,ati-band-disable"),
    ati_lp_only: src.present("azoteq,ati-lp-only"),
    ati_band_tighten: src.present("azoteq,ati-band-tighten"),
    filter_disable: src.present("azoteq,filt-disable"),
    gpio3_select: src.read_u32("azoteq,gpio3-select"),
    dual_direction: src.present("azoteq,dual-direction"),
    tx_freq: src.read_u32("azoteq,tx-freq"),
    global_cap_increase: src.present("azoteq,global-cap-increase"),
    reseed_select: src.read_u32("azoteq,reseed-select"),
    tracking_enable: src.present("azoteq,tracking-enable"),
    filter_slider: src.read_u32("azoteq,filt-str-slider"),
    touch_hold_ms: src.read_u32("azoteq,touch-hold-ms"),
    clock_divider: src.present("azoteq,clk-div"),
    suspend_mode: src.read_u32("azoteq,suspend-mode"),
    ulp_update: src.read_u32("azoteq,ulp-update"),
    keycodes: read_array(src, "linux,keycodes", keycodes)?,
    gesture_swipe: src.present("azoteq,gesture-swipe"),
    timeout_tap_ms: src.read_u32("azoteq,timeout-tap-ms"),
    timeout_swipe_ms: src.read_u32("azoteq,timeout-swipe-ms"),
    thresh_swipe: src.read_u32("azoteq,thresh-swipe"),
    reseed_offset: src.present("azoteq,reseed-offset"),
  })
}

struct PinBuffers {
  rx: [u32; NUM_CHANNELS],
  tx: [u32; NUM_CHANNELS],
  assoc: [u32; NUM_CHANNELS],
}

fn channel_props<'b>(src: &dyn PropertySource, pins: &'b mut PinBuffers) -> Result<ChannelProps<'b>, ConfigError> {
  let reg = src.read_u32("reg").ok_or(ConfigError::out_of_range("reg", u32::MAX))?;
  let mut events = [EventProps::new(); EventKind::COUNT];
  for kind in EventKind::ALL {
    if let Some(node) = src.child(kind.node_name()) {
      events[kind as usize] = EventProps {
        thresh: node.read_u32("azoteq,thresh"),
        hyst: node.read_u32("azoteq,hyst"),
        code: node.read_u32("linux,code"),
      };
    }
  }

  let props = ChannelProps {
    reg,
    reseed_disable: src.present("azoteq,reseed-disable"),
    blocking_enable: src.present("azoteq,blocking-enable"),
    slider0_select: src.present("azoteq,slider0-select"),
    slider1_select: src.present("azoteq,slider1-select"),
    rx_enable: read_array(src, "azoteq,rx-enable", &mut pins.rx)?,
    tx_enable: read_array(src, "azoteq,tx-enable", &mut pins.tx)?,
    meas_cap_decrease: src.present("azoteq,meas-cap-decrease"),
    rx_float_inactive: src.present("azoteq,rx-float-inactive"),
    local_cap_size: src.read_u32("azoteq,local-cap-size"),
    invert_enable: src.present("azoteq,invert-enable"),
    proj_bias: src.read_u32("azoteq,proj-bias"),
    sense_mode: src.read_u32("azoteq,sense-mode"),
    sense_freq: src.read_u32("azoteq,sense-freq"),
    static_enable: src.present("azoteq,static-enable"),
    ati_mode: src.read_u32("azoteq,ati-mode"),
    ati_base: src.read_u32("azoteq,ati-base"),
    ati_target: src.read_u32("azoteq,ati-target"),
    assoc_select: read_array(src, "azoteq,assoc-select", &mut pins.assoc)?,
    assoc_weight: src.read_u32("azoteq,assoc-weight"),
    events,
  };
  Ok(props)
}

impl DeviceState {
  /// Like [`DeviceState::build`], reading the configuration from a property
  /// tree.
  pub fn load(
    image: RegisterImage,
    version: Version,
    otp: OtpOption,
    source: &dyn PropertySource,
  ) -> Result<Self, ConfigError> {
    let mut keycodes = [0u32; MAX_KEYCODES];
    let system = system_props(source, &mut keycodes)?;

    let mut builder = Builder::new(image, version, otp);
    builder.system(&system)?;
    source.for_each_child(&mut |node| {
      let mut pins = PinBuffers { rx: [0; NUM_CHANNELS], tx: [0; NUM_CHANNELS], assoc: [0; NUM_CHANNELS] };
      let props = channel_props(node, &mut pins).map_err(|e| match node.read_u32("reg") {
        Some(ch) if (ch as usize) < NUM_CHANNELS => e.on_channel(ch as u8),
        _ => e,
      })?;
      builder.channel(&props)
    })?;
    builder.general(&system)?;
    Ok(builder.finish())
  }
}
