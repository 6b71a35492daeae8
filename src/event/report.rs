use super::{EventSink, InputDevice, StatusSnapshot};
use crate::config::{EventKind, Gesture, StateOffset};
use crate::reg::{NUM_CHANNELS, NUM_GESTURES, NUM_SLIDERS};
use crate::state::{DeviceState, Route, SliderMode};

impl DeviceState {
  /// Report everything `snapshot` says about the configured inputs: each
  /// slider first, then the keypad, each batch closed by a sync.
  ///
  /// `slider_x` is only read for sliders in raw mode.
  pub fn report<S: EventSink + ?Sized>(&self, snapshot: &StatusSnapshot, slider_x: [u8; NUM_SLIDERS], sink: &mut S) {
    for (slider, x) in slider_x.into_iter().enumerate() {
      self.report_slider(slider, snapshot, x, sink);
    }
    self.report_keypad(snapshot, sink);
  }

  fn report_slider<S: EventSink + ?Sized>(&self, slider: usize, snapshot: &StatusSnapshot, x: u8, sink: &mut S) {
    let device = InputDevice::Slider(slider as u8);
    let gestures = snapshot.gesture >> (slider * NUM_GESTURES);

    match self.slider_mode(slider) {
      SliderMode::None => return,
      SliderMode::Gesture => {
        for gesture in Gesture::ALL {
          if let Some(code) = self.gesture_code(slider, gesture) {
            sink.key(device, code, gestures & gesture.bit() != 0);
          }
        }

        // Momentary gestures have no release of their own.
        let fired = Gesture::ALL.iter().any(|g| g.is_momentary() && gestures & g.bit() != 0);
        if fired {
          sink.sync(device);
          for gesture in Gesture::ALL.into_iter().filter(|g| g.is_momentary()) {
            if let Some(code) = self.gesture_code(slider, gesture) {
              sink.key(device, code, false);
            }
          }
        }
      }
      SliderMode::Raw => {
        let touched = snapshot.state(StateOffset::Touch) & self.image.slider_select[slider] != 0;
        sink.touch(slider as u8, touched);
        if touched {
          sink.position(slider as u8, x);
        }
      }
    }

    sink.sync(device);
  }

  fn report_keypad<S: EventSink + ?Sized>(&self, snapshot: &StatusSnapshot, sink: &mut S) {
    let direction = snapshot.state(StateOffset::Direction);

    for kind in EventKind::ALL {
      let dir_mask = if kind.is_up() { direction } else { !direction };
      let state = snapshot.state(kind.state()) & dir_mask;

      for ch in 0..NUM_CHANNELS {
        let active = state & (1 << ch) != 0;
        match self.layout.route(ch) {
          Route::Key => {
            if let Some(code) = self.keymap.key(kind, ch) {
              sink.key(InputDevice::Keypad, code, active);
            }
          }
          Route::Switch => {
            if let Some(code) = self.keymap.switch(kind) {
              sink.switch(code, active);
            }
          }
          Route::Silent => {}
        }
      }
    }

    sink.sync(InputDevice::Keypad);
  }
}
