//! Time related functions and types.
//!
//! It's usually a good idea to control where the time comes from in an
//! application so that it can be mocked for testing and we get the intended
//! behavior without relying on the underlying system clock.
//!
//! Clocks use the type [`DurationSinceUnixEpoch`] which is a
//! `std::time::Duration` since the Unix Epoch (timestamp).
//!
//! > **NOTICE**: the timestamp does not depend on the time zone. That gives
//! > you the ability to use the clock regardless of the underlying system
//! > time zone configuration.
use std::time::Duration;

pub mod static_time;

/// Duration since the Unix Epoch.
pub type DurationSinceUnixEpoch = Duration;

/// A generic structure that represents a clock.
///
/// It can be either the working clock (production) or the stopped clock
/// (testing). It implements the `Time` trait, which gives you the current
/// time.
#[derive(Debug)]
pub struct Clock<T> {
    clock: std::marker::PhantomData<T>,
}

/// The working clock. It returns the current time.
pub type Working = Clock<WorkingClock>;
/// The stopped clock. It returns always the same fixed time.
pub type Stopped = Clock<StoppedClock>;

#[derive(Debug)]
pub struct WorkingClock;

#[derive(Debug)]
pub struct StoppedClock;

/// Trait for types that can be used as a timestamp clock.
pub trait Time: Sized {
    fn now() -> DurationSinceUnixEpoch;

    #[must_use]
    fn now_add(add_time: &Duration) -> Option<DurationSinceUnixEpoch> {
        Self::now().checked_add(*add_time)
    }

    #[must_use]
    fn now_sub(sub_time: &Duration) -> Option<DurationSinceUnixEpoch> {
        Self::now().checked_sub(*sub_time)
    }
}

impl Time for Working {
    fn now() -> DurationSinceUnixEpoch {
        std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .expect("the system clock should not be set before the Unix Epoch")
    }
}

impl Time for Stopped {
    fn now() -> DurationSinceUnixEpoch {
        detail::FIXED_TIME.with(|time| *time.borrow())
    }
}

/// Trait for the testing clock, stopped at a settable time.
///
/// The fixed time is thread local, so every test thread starts at the Unix
/// Epoch and can move its own clock without interfering with other tests.
pub trait StoppedTime: Time {
    /// It sets the clock to a given time.
    fn local_set(unix_time: &DurationSinceUnixEpoch);

    /// It sets the clock to the Unix Epoch.
    fn local_set_to_unix_epoch() {
        Self::local_set(&DurationSinceUnixEpoch::ZERO);
    }

    /// It adds a `Duration` to the clock.
    fn local_add(duration: &Duration);

    /// It subtracts a `Duration` from the clock.
    fn local_sub(duration: &Duration);
}

impl StoppedTime for Stopped {
    fn local_set(unix_time: &DurationSinceUnixEpoch) {
        detail::FIXED_TIME.with(|time| {
            *time.borrow_mut() = *unix_time;
        });
    }

    fn local_add(duration: &Duration) {
        detail::FIXED_TIME.with(|time| {
            let updated = time
                .borrow()
                .checked_add(*duration)
                .expect("it should not overflow the stopped clock");
            *time.borrow_mut() = updated;
        });
    }

    fn local_sub(duration: &Duration) {
        detail::FIXED_TIME.with(|time| {
            let updated = time
                .borrow()
                .checked_sub(*duration)
                .expect("it should not underflow the stopped clock");
            *time.borrow_mut() = updated;
        });
    }
}

mod detail {
    use std::cell::RefCell;

    use super::DurationSinceUnixEpoch;

    thread_local!(pub static FIXED_TIME: RefCell<DurationSinceUnixEpoch> = RefCell::new(DurationSinceUnixEpoch::ZERO));
}

#[cfg(test)]
mod tests {
    use std::any::TypeId;
    use std::time::Duration;

    use crate::shared::clock::{DurationSinceUnixEpoch, Stopped, StoppedTime, Time, Working};
    use crate::CurrentClock;

    #[test]
    fn it_should_be_the_stopped_clock_as_default_when_testing() {
        // We are testing, so we should default to the fixed time.
        assert_eq!(TypeId::of::<Stopped>(), TypeId::of::<CurrentClock>());
        assert_eq!(Stopped::now(), CurrentClock::now());
    }

    #[test]
    fn it_should_default_to_zero_when_testing() {
        assert_eq!(Stopped::now(), DurationSinceUnixEpoch::ZERO);
    }

    #[test]
    fn it_should_be_possible_to_set_and_move_the_stopped_time() {
        Stopped::local_set(&Duration::from_secs(100));
        assert_eq!(Stopped::now(), Duration::from_secs(100));

        Stopped::local_add(&Duration::from_secs(50));
        assert_eq!(Stopped::now(), Duration::from_secs(150));

        Stopped::local_sub(&Duration::from_secs(150));
        assert_eq!(Stopped::now(), Duration::ZERO);
    }

    #[test]
    fn it_should_use_stopped_time_for_testing() {
        Stopped::local_set_to_unix_epoch();

        let time = CurrentClock::now();
        std::thread::sleep(Duration::from_millis(10));
        let time_2 = CurrentClock::now();

        assert_eq!(time, time_2);
    }

    #[test]
    fn the_working_clock_should_return_a_time_after_the_unix_epoch() {
        assert!(Working::now() > DurationSinceUnixEpoch::ZERO);
    }
}
