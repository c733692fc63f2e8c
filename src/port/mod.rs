//! Hardware port: the boundary between the machines and the peripherals.
//!
//! The machines never touch registers. They call the primitives below,
//! addressing each peripheral by a small integer id. Implementations are
//! shared between the polling loop and interrupt handlers, so every method
//! takes `&self`: single-word flags are atomics and anything spanning more
//! than one word is updated inside a critical section.
//!
//! Binding (`init_*`) is the only fallible operation. Once a machine holds
//! a unit, the other primitives are infallible and an unknown id is a no-op.

mod error;
#[cfg(feature = "sim")]
pub mod sim;

pub use error::{PortError, UnitKind};

use std::sync::Arc;

/// Capacity of each per-kind unit table.
pub const MAX_UNITS: usize = 4;

/// Size of a USART input message, end byte excluded.
pub const INPUT_BUFFER_LEN: usize = 10;

/// Size of a USART output message.
pub const OUTPUT_BUFFER_LEN: usize = 100;

/// Filler for unused buffer slots; a buffer whose first byte is this is empty.
pub const EMPTY_BYTE: u8 = 0x00;

/// Default end-of-message byte (line feed).
pub const DEFAULT_END_BYTE: u8 = 0x0A;

/// `true` once `now` is strictly past `deadline`, across counter wrap.
pub fn tick_after(now: u32, deadline: u32) -> bool {
    (now.wrapping_sub(deadline) as i32) > 0
}

/// `true` once `now` has reached `deadline`, across counter wrap.
pub fn tick_reached(now: u32, deadline: u32) -> bool {
    (now.wrapping_sub(deadline) as i32) >= 0
}

/// Millisecond system tick.
pub trait Clock {
    /// Current tick. Wraps at `u32::MAX`.
    fn get_tick(&self) -> u32;
}

/// Push buttons sampled through an edge interrupt.
pub trait ButtonPort: Clock {
    fn init_button(&self, id: u8) -> Result<(), PortError>;

    fn release_button(&self, _id: u8) {}

    /// Press flag last written by the edge interrupt.
    fn is_pressed(&self, id: u8) -> bool;
}

/// PWM buzzers with a one-shot note timer.
pub trait BuzzerPort {
    fn init_buzzer(&self, id: u8) -> Result<(), PortError>;

    fn release_buzzer(&self, _id: u8) {}

    /// Arm the note timer; clears the timeout flag until it expires.
    fn set_note_duration(&self, id: u8, duration_ms: u32);

    /// Program the PWM output. Zero disables it (a rest).
    fn set_note_frequency(&self, id: u8, frequency_hz: f64);

    /// Whether the last armed note has expired.
    fn get_note_timeout(&self, id: u8) -> bool;

    /// Silence the output and halt the note timer.
    fn stop(&self, id: u8);
}

/// USARTs whose interrupt handler moves bytes between the data register and
/// fixed buffers.
pub trait UsartPort {
    fn init_usart(&self, id: u8) -> Result<(), PortError>;

    fn release_usart(&self, _id: u8) {}

    /// A full message ending with the end byte sits in the input buffer.
    fn rx_done(&self, id: u8) -> bool;

    /// The output buffer has been shifted out.
    fn tx_done(&self, id: u8) -> bool;

    /// Bytes arrived past the input buffer's capacity since the last reset.
    fn rx_overflowed(&self, _id: u8) -> bool {
        false
    }

    /// The data register can take a byte.
    fn tx_ready(&self, id: u8) -> bool;

    fn get_from_input_buffer(&self, id: u8, out: &mut [u8; INPUT_BUFFER_LEN]);

    /// Replace the output buffer contents; bytes past its capacity are ignored.
    fn copy_to_output_buffer(&self, id: u8, data: &[u8]);

    /// Fill the input buffer with `EMPTY_BYTE` and clear `rx_done`.
    fn reset_input_buffer(&self, id: u8);

    /// Fill the output buffer with `EMPTY_BYTE` and clear `tx_done`.
    fn reset_output_buffer(&self, id: u8);

    /// Shift the next output byte into the data register.
    fn write_data(&self, id: u8);

    fn enable_rx_interrupt(&self, id: u8);
    fn disable_rx_interrupt(&self, id: u8);
    fn enable_tx_interrupt(&self, id: u8);
    fn disable_tx_interrupt(&self, id: u8);

    fn rx_interrupt_enabled(&self, id: u8) -> bool;
}

/// Single LEDs.
pub trait LedPort: Clock {
    fn init_led(&self, id: u8) -> Result<(), PortError>;

    fn release_led(&self, _id: u8) {}

    fn toggle(&self, id: u8);

    fn is_on(&self, id: u8) -> bool;
}

// Machines take their port by value; these let them share one through a
// reference or an `Arc`.
macro_rules! forward_ports {
    (<$($lt:lifetime,)? $t:ident> $ptr:ty) => {
        impl<$($lt,)? $t: Clock + ?Sized> Clock for $ptr {
            fn get_tick(&self) -> u32 {
                (**self).get_tick()
            }
        }

        impl<$($lt,)? $t: ButtonPort + ?Sized> ButtonPort for $ptr {
            fn init_button(&self, id: u8) -> Result<(), PortError> {
                (**self).init_button(id)
            }
            fn release_button(&self, id: u8) {
                (**self).release_button(id)
            }
            fn is_pressed(&self, id: u8) -> bool {
                (**self).is_pressed(id)
            }
        }

        impl<$($lt,)? $t: BuzzerPort + ?Sized> BuzzerPort for $ptr {
            fn init_buzzer(&self, id: u8) -> Result<(), PortError> {
                (**self).init_buzzer(id)
            }
            fn release_buzzer(&self, id: u8) {
                (**self).release_buzzer(id)
            }
            fn set_note_duration(&self, id: u8, duration_ms: u32) {
                (**self).set_note_duration(id, duration_ms)
            }
            fn set_note_frequency(&self, id: u8, frequency_hz: f64) {
                (**self).set_note_frequency(id, frequency_hz)
            }
            fn get_note_timeout(&self, id: u8) -> bool {
                (**self).get_note_timeout(id)
            }
            fn stop(&self, id: u8) {
                (**self).stop(id)
            }
        }

        impl<$($lt,)? $t: UsartPort + ?Sized> UsartPort for $ptr {
            fn init_usart(&self, id: u8) -> Result<(), PortError> {
                (**self).init_usart(id)
            }
            fn release_usart(&self, id: u8) {
                (**self).release_usart(id)
            }
            fn rx_done(&self, id: u8) -> bool {
                (**self).rx_done(id)
            }
            fn tx_done(&self, id: u8) -> bool {
                (**self).tx_done(id)
            }
            fn rx_overflowed(&self, id: u8) -> bool {
                (**self).rx_overflowed(id)
            }
            fn tx_ready(&self, id: u8) -> bool {
                (**self).tx_ready(id)
            }
            fn get_from_input_buffer(&self, id: u8, out: &mut [u8; INPUT_BUFFER_LEN]) {
                (**self).get_from_input_buffer(id, out)
            }
            fn copy_to_output_buffer(&self, id: u8, data: &[u8]) {
                (**self).copy_to_output_buffer(id, data)
            }
            fn reset_input_buffer(&self, id: u8) {
                (**self).reset_input_buffer(id)
            }
            fn reset_output_buffer(&self, id: u8) {
                (**self).reset_output_buffer(id)
            }
            fn write_data(&self, id: u8) {
                (**self).write_data(id)
            }
            fn enable_rx_interrupt(&self, id: u8) {
                (**self).enable_rx_interrupt(id)
            }
            fn disable_rx_interrupt(&self, id: u8) {
                (**self).disable_rx_interrupt(id)
            }
            fn enable_tx_interrupt(&self, id: u8) {
                (**self).enable_tx_interrupt(id)
            }
            fn disable_tx_interrupt(&self, id: u8) {
                (**self).disable_tx_interrupt(id)
            }
            fn rx_interrupt_enabled(&self, id: u8) -> bool {
                (**self).rx_interrupt_enabled(id)
            }
        }

        impl<$($lt,)? $t: LedPort + ?Sized> LedPort for $ptr {
            fn init_led(&self, id: u8) -> Result<(), PortError> {
                (**self).init_led(id)
            }
            fn release_led(&self, id: u8) {
                (**self).release_led(id)
            }
            fn toggle(&self, id: u8) {
                (**self).toggle(id)
            }
            fn is_on(&self, id: u8) -> bool {
                (**self).is_on(id)
            }
        }
    };
}

forward_ports!(<'a, T> &'a T);
forward_ports!(<T> Arc<T>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_after_is_strict() {
        assert!(!tick_after(100, 100));
        assert!(tick_after(101, 100));
        assert!(!tick_after(99, 100));
    }

    #[test]
    fn tick_comparisons_survive_wrap() {
        let deadline = u32::MAX - 5;
        assert!(!tick_after(u32::MAX - 10, deadline));
        assert!(tick_after(3, deadline));
        assert!(tick_reached(deadline, deadline));
        assert!(tick_reached(deadline.wrapping_add(10), deadline));
    }
}
