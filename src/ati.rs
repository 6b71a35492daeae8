//! Calibration gate: lets callers wait until the device has finished ATI
//! and produced a clean status report.

use core::cell::RefCell;
use core::future::poll_fn;
use core::task::Poll;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::waitqueue::MultiWakerRegistration;
use embassy_time::{with_timeout, Duration, TimeoutError};

/// How long a waiter gives ATI to complete.
pub const ATI_TIMEOUT: Duration = Duration::from_millis(2000);

const MAX_WAITERS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AtiState {
  /// Nothing written to the device yet.
  Idle,
  Calibrating,
  /// A clean status report has been decoded since the last rearm.
  Ready,
}

struct Gate {
  state: AtiState,
  waiters: MultiWakerRegistration<MAX_WAITERS>,
}

pub(crate) struct AtiGate<M: RawMutex> {
  inner: Mutex<M, RefCell<Gate>>,
}

impl<M: RawMutex> AtiGate<M> {
  pub(crate) const fn new() -> Self {
    Self { inner: Mutex::new(RefCell::new(Gate { state: AtiState::Idle, waiters: MultiWakerRegistration::new() })) }
  }

  pub(crate) fn state(&self) -> AtiState {
    self.inner.lock(|g| g.borrow().state)
  }

  pub(crate) fn is_ready(&self) -> bool {
    self.state() == AtiState::Ready
  }

  /// Close the gate ahead of a settings write that requests ATI.
  pub(crate) fn rearm(&self) {
    self.inner.lock(|g| g.borrow_mut().state = AtiState::Calibrating)
  }

  /// Open the gate and wake every waiter. Repeated calls are no-ops.
  pub(crate) fn release(&self) {
    self.inner.lock(|g| {
      let mut g = g.borrow_mut();
      if g.state != AtiState::Ready {
        g.state = AtiState::Ready;
        g.waiters.wake();
      }
    })
  }

  /// Resolve once the gate is open, or fail after `timeout`.
  pub(crate) async fn wait(&self, timeout: Duration) -> Result<(), TimeoutError> {
    with_timeout(
      timeout,
      poll_fn(|cx| {
        self.inner.lock(|g| {
          let mut g = g.borrow_mut();
          if g.state == AtiState::Ready {
            return Poll::Ready(());
          }
          g.waiters.register(cx.waker());
          Poll::Pending
        })
      }),
    )
    .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use embassy_futures::block_on;
  use embassy_futures::join::join;
  use embassy_sync::blocking_mutex::raw::NoopRawMutex;
  use embassy_time::Timer;

  #[test]
  fn waiters_wake_on_release() {
    let gate = AtiGate::<NoopRawMutex>::new();
    gate.rearm();
    assert_eq!(gate.state(), AtiState::Calibrating);

    let (waits, ()) = block_on(join(
      join(gate.wait(ATI_TIMEOUT), gate.wait(ATI_TIMEOUT)),
      async {
        Timer::after_millis(5).await;
        gate.release();
      },
    ));
    assert_eq!(waits, (Ok(()), Ok(())));
    assert!(gate.is_ready());
  }

  #[test]
  fn wait_times_out() {
    let gate = AtiGate::<NoopRawMutex>::new();
    gate.rearm();
    assert_eq!(block_on(gate.wait(Duration::from_millis(10))), Err(TimeoutError));
  }

  #[test]
  fn release_is_idempotent_and_rearm_closes() {
    let gate = AtiGate::<NoopRawMutex>::new();
    assert_eq!(gate.state(), AtiState::Idle);
    gate.rearm();
    gate.release();
    gate.release();
    assert!(gate.is_ready());
    assert_eq!(block_on(gate.wait(Duration::from_millis(1))), Ok(()));

    gate.rearm();
    assert_eq!(gate.state(), AtiState::Calibrating);
  }
}
