//! Testing infrastructure (mock bus, RDY pin and event sink).

pub(crate) mod mock;

pub(crate) use mock::{MockError, MockI2c, MockRdy, Recorder, Report};

use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;

use crate::config::{ChannelProps, Config, EventKind, EventProps, SystemProps};
use crate::reg::PRODUCT_NUMBER;
use crate::state::OtpOption;
use crate::Iqs269a;

pub(crate) type Driver = Iqs269a<NoopRawMutex, MockI2c, MockRdy>;

pub(crate) const IDLE: [u8; 8] = [0; 8];
pub(crate) const IN_ATI: [u8; 8] = [0x04, 0, 0, 0, 0, 0, 0, 0];
pub(crate) const RESET: [u8; 8] = [0x80, 0, 0, 0, 0, 0, 0, 0];

pub(crate) const PROX_CH2: [ChannelProps; 1] = [ChannelProps::new(2)
  .with_pins(&[2], &[])
  .with_event(EventKind::ProxDown, EventProps::new().with_thresh(10).with_code(2))];

/// A device answering with the IQS269A product number and firmware `fw`.
pub(crate) fn device(fw: u8) -> MockI2c {
  MockI2c::default().with_bytes(0x00, &[PRODUCT_NUMBER, 0x00, 0x00, fw])
}

/// Driver initialized with `config`, after one report with ATI still running.
pub(crate) fn ready(i2c: MockI2c, otp: OtpOption, config: &Config) -> Driver {
  i2c.push_status(IN_ATI);
  i2c.push_status(IDLE);
  let driver = Driver::new(i2c, MockRdy::default(), otp);
  block_on(driver.initialize(config, &mut Recorder::default())).unwrap();
  driver
}

pub(crate) fn ready_ch2(i2c: MockI2c) -> Driver {
  ready(i2c, OtpOption::Default, &Config::new(SystemProps::new(), &PROX_CH2))
}
