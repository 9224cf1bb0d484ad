//! Ignition output control
//!
//! The igniter is switched by a MOSFET gate on a GPIO. The controller holds a
//! two-state machine and mirrors it onto the pin: `Armed` drives the gate high
//! continuously, `Idle` drives it low. Commands are last-write-wins; there is
//! no timeout, debounce or interlock.

use embedded_hal::digital::OutputPin;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnitionState {
    #[default]
    Idle,
    Armed,
}

impl IgnitionState {
    pub const fn is_armed(self) -> bool {
        matches!(self, Self::Armed)
    }
}

pub struct IgnitionController<P> {
    pin: P,
    state: IgnitionState,
}

impl<P: OutputPin> IgnitionController<P> {
    /// Takes ownership of the gate pin and drives it low.
    pub fn new(pin: P) -> Result<Self, P::Error> {
        let mut controller = Self {
            pin,
            state: IgnitionState::Idle,
        };
        controller.apply()?;
        Ok(controller)
    }

    pub fn state(&self) -> IgnitionState {
        self.state
    }

    /// Records the requested state and drives the pin to match.
    pub fn set(&mut self, state: IgnitionState) -> Result<(), P::Error> {
        self.state = state;
        self.apply()
    }

    pub fn arm(&mut self) -> Result<(), P::Error> {
        self.set(IgnitionState::Armed)
    }

    pub fn disarm(&mut self) -> Result<(), P::Error> {
        self.set(IgnitionState::Idle)
    }

    /// Re-asserts the current state on the pin. Called on every loop pass.
    pub fn apply(&mut self) -> Result<(), P::Error> {
        match self.state {
            IgnitionState::Armed => self.pin.set_high(),
            IgnitionState::Idle => self.pin.set_low(),
        }
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }
}

#[cfg(test)]
pub(crate) mod test_pin {
    use core::convert::Infallible;
    use embedded_hal::digital::{ErrorType, OutputPin};

    /// Output pin that remembers its level and how often it was driven.
    #[derive(Debug, Default)]
    pub struct RecordingPin {
        pub high: bool,
        pub writes: usize,
    }

    impl ErrorType for RecordingPin {
        type Error = Infallible;
    }

    impl OutputPin for RecordingPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.high = false;
            self.writes += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.high = true;
            self.writes += 1;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_pin::RecordingPin;
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_starts_idle_and_low() {
        let controller = IgnitionController::new(RecordingPin {
            high: true,
            writes: 0,
        })
        .unwrap();
        assert_eq!(controller.state(), IgnitionState::Idle);
        assert!(!controller.pin().high);
        assert_eq!(controller.pin().writes, 1);
    }

    #[test]
    fn test_arm_and_disarm_are_idempotent() {
        let mut controller = IgnitionController::new(RecordingPin::default()).unwrap();
        controller.arm().unwrap();
        controller.arm().unwrap();
        assert!(controller.pin().high);
        controller.disarm().unwrap();
        controller.disarm().unwrap();
        assert!(!controller.pin().high);
    }

    #[test]
    fn test_apply_restores_pin_level() {
        let mut controller = IgnitionController::new(RecordingPin::default()).unwrap();
        controller.arm().unwrap();
        controller.pin.high = false;
        controller.apply().unwrap();
        assert!(controller.pin().high);
    }

    proptest! {
        #[test]
        fn pin_follows_last_command(commands in prop::collection::vec(any::<bool>(), 1..64)) {
            let mut controller = IgnitionController::new(RecordingPin::default()).unwrap();
            for &arm in &commands {
                if arm {
                    controller.arm().unwrap();
                } else {
                    controller.disarm().unwrap();
                }
            }
            let last = *commands.last().unwrap();
            prop_assert_eq!(controller.pin().high, last);
            prop_assert_eq!(controller.state().is_armed(), last);
        }
    }
}
