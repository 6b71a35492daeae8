use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{Duration, Timer};

/// Quiet time after an interrupt or an attribute transaction, so the device
/// can close its communication window before RDY is trusted again.
pub const IRQ_SETTLE: Duration = Duration::from_micros(200);

/// Gate for the RDY interrupt. While suspended, edges are drained without
/// being serviced. Suspensions nest.
pub(crate) struct IrqGate<M: RawMutex> {
  depth: Mutex<M, Cell<u8>>,
}

impl<M: RawMutex> IrqGate<M> {
  pub(crate) const fn new() -> Self {
    Self { depth: Mutex::new(Cell::new(0)) }
  }

  /// Stop servicing RDY until the returned guard is dropped.
  pub(crate) fn suspend(&self) -> Suspended<'_, M> {
    self.depth.lock(|d| d.set(d.get().saturating_add(1)));
    Suspended { gate: self }
  }

  fn resume(&self) {
    self.depth.lock(|d| d.set(d.get().saturating_sub(1)))
  }

  pub(crate) fn enabled(&self) -> bool {
    self.depth.lock(|d| d.get() == 0)
  }
}

#[must_use = "the interrupt resumes as soon as the guard is dropped"]
pub(crate) struct Suspended<'a, M: RawMutex> {
  gate: &'a IrqGate<M>,
}

impl<M: RawMutex> Suspended<'_, M> {
  /// Wait out [`IRQ_SETTLE`], then resume.
  pub(crate) async fn settle(self) {
    Timer::after(IRQ_SETTLE).await;
  }
}

impl<M: RawMutex> Drop for Suspended<'_, M> {
  fn drop(&mut self) {
    self.gate.resume()
  }
}
