extern crate std;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::digital::ErrorType as PinErrorType;
use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};
use embedded_hal_async::digital::Wait;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::event::{EventSink, InputDevice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MockError;

impl embedded_hal::i2c::Error for MockError {
  fn kind(&self) -> ErrorKind {
    ErrorKind::Other
  }
}

/// Word-addressed register file: address `a` maps to bytes `2a` and `2a + 1`.
#[derive(Debug)]
struct Bus {
  regs: [u8; 512],
  /// Queued status snapshots, served in order by reads of the flags register.
  status: VecDeque<[u8; 8]>,
  writes: Vec<(u8, Vec<u8>)>,
  /// Transactions left before every further one fails.
  budget: Option<usize>,
}

/// Shared handle, so tests can inspect the bus after handing it to the driver.
#[derive(Debug, Clone)]
pub(crate) struct MockI2c {
  bus: Rc<RefCell<Bus>>,
}

impl Default for MockI2c {
  fn default() -> Self {
    let bus = Bus { regs: [0; 512], status: VecDeque::new(), writes: Vec::new(), budget: None };
    Self { bus: Rc::new(RefCell::new(bus)) }
  }
}

impl MockI2c {
  pub(crate) fn with_bytes(self, reg: u8, data: &[u8]) -> Self {
    self.set_bytes(reg, data);
    self
  }

  pub(crate) fn set_bytes(&self, reg: u8, data: &[u8]) {
    let start = reg as usize * 2;
    self.bus.borrow_mut().regs[start..start + data.len()].copy_from_slice(data);
  }

  pub(crate) fn push_status(&self, status: [u8; 8]) {
    self.bus.borrow_mut().status.push_back(status);
  }

  /// Let `n` more transactions through, then fail the rest.
  pub(crate) fn fail_after(&self, n: usize) {
    self.bus.borrow_mut().budget = Some(n);
  }

  pub(crate) fn writes(&self) -> Vec<(u8, Vec<u8>)> {
    self.bus.borrow().writes.clone()
  }

  pub(crate) fn writes_to(&self, reg: u8) -> Vec<Vec<u8>> {
    self.bus.borrow().writes.iter().filter(|(r, _)| *r == reg).map(|(_, d)| d.clone()).collect()
  }

  pub(crate) fn clear_writes(&self) {
    self.bus.borrow_mut().writes.clear();
  }
}

impl ErrorType for MockI2c {
  type Error = MockError;
}

impl I2c<SevenBitAddress> for MockI2c {
  async fn transaction(&mut self, _address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
    let mut bus = self.bus.borrow_mut();
    match bus.budget {
      Some(0) => return Err(MockError),
      Some(n) => bus.budget = Some(n - 1),
      None => {}
    }

    let mut pointer = None;
    for op in operations {
      match op {
        Operation::Write(data) => {
          let Some((&reg, payload)) = data.split_first() else { continue };
          pointer = Some(reg);
          if !payload.is_empty() {
            let start = reg as usize * 2;
            bus.regs[start..start + payload.len()].copy_from_slice(payload);
            bus.writes.push((reg, payload.to_vec()));
          }
        }
        Operation::Read(buf) => {
          let reg = pointer.unwrap_or(0);
          if reg == 0x02 {
            if let Some(status) = bus.status.pop_front() {
              let start = reg as usize * 2;
              bus.regs[start..start + status.len()].copy_from_slice(&status);
            }
          }
          let start = reg as usize * 2;
          buf.copy_from_slice(&bus.regs[start..start + buf.len()]);
        }
      }
    }
    Ok(())
  }
}

/// RDY line that always has an edge pending.
#[derive(Debug, Default, Clone)]
pub(crate) struct MockRdy {
  edges: Rc<RefCell<u32>>,
}

impl MockRdy {
  pub(crate) fn edges(&self) -> u32 {
    *self.edges.borrow()
  }
}

impl PinErrorType for MockRdy {
  type Error = core::convert::Infallible;
}

impl Wait for MockRdy {
  async fn wait_for_high(&mut self) -> Result<(), Self::Error> {
    Ok(())
  }

  async fn wait_for_low(&mut self) -> Result<(), Self::Error> {
    Ok(())
  }

  async fn wait_for_rising_edge(&mut self) -> Result<(), Self::Error> {
    Ok(())
  }

  async fn wait_for_falling_edge(&mut self) -> Result<(), Self::Error> {
    *self.edges.borrow_mut() += 1;
    Ok(())
  }

  async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error> {
    Ok(())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Report {
  Key(InputDevice, u16, bool),
  Switch(u16, bool),
  Touch(u8, bool),
  Position(u8, u8),
  Sync(InputDevice),
}

#[derive(Debug, Default)]
pub(crate) struct Recorder {
  pub(crate) reports: Vec<Report>,
}

impl Recorder {
  /// Reports other than syncs.
  pub(crate) fn inputs(&self) -> Vec<Report> {
    self.reports.iter().copied().filter(|r| !matches!(r, Report::Sync(_))).collect()
  }
}

impl EventSink for Recorder {
  fn key(&mut self, device: InputDevice, code: u16, pressed: bool) {
    self.reports.push(Report::Key(device, code, pressed));
  }

  fn switch(&mut self, code: u16, active: bool) {
    self.reports.push(Report::Switch(code, active));
  }

  fn touch(&mut self, slider: u8, touched: bool) {
    self.reports.push(Report::Touch(slider, touched));
  }

  fn position(&mut self, slider: u8, x: u8) {
    self.reports.push(Report::Position(slider, x));
  }

  fn sync(&mut self, device: InputDevice) {
    self.reports.push(Report::Sync(device));
  }
}
