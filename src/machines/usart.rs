//! Framed message exchange over a USART.
//!
//! The port's interrupt handler fills the input buffer byte by byte and
//! drains the output buffer one byte per transmit-empty interrupt. This
//! machine collects complete messages and starts transmissions; it never
//! touches the data register outside `write_data`.

use crate::builder::{TableBuilder, TransitionBuilder};
use crate::config::UsartConfig;
use crate::engine::{Fsm, Machine, StepResult};
use crate::error::FsmError;
use crate::port::{UsartPort, EMPTY_BYTE, INPUT_BUFFER_LEN, OUTPUT_BUFFER_LEN};
use crate::state_enum;
use log::{debug, warn};

state_enum! {
    /// Link states of a USART.
    pub enum UsartState {
        WaitData,
        SendData,
    }
    idle: [WaitData]
}

struct UsartCtx<P> {
    port: P,
    id: u8,
    data_received: bool,
    truncated: bool,
    in_data: [u8; INPUT_BUFFER_LEN],
    out_data: [u8; OUTPUT_BUFFER_LEN],
}

fn tx_pending<P: UsartPort>(c: &UsartCtx<P>) -> bool {
    c.out_data[0] != EMPTY_BYTE && c.port.tx_ready(c.id)
}

fn rx_complete<P: UsartPort>(c: &UsartCtx<P>) -> bool {
    c.port.rx_done(c.id)
}

fn tx_complete<P: UsartPort>(c: &UsartCtx<P>) -> bool {
    c.port.tx_done(c.id)
}

fn start_transmission<P: UsartPort>(c: &mut UsartCtx<P>) {
    c.port.reset_output_buffer(c.id);
    c.port.copy_to_output_buffer(c.id, &c.out_data);
    c.port.write_data(c.id);
    // A one-byte message is already complete
    if !c.port.tx_done(c.id) {
        c.port.enable_tx_interrupt(c.id);
    }
}

fn collect_input<P: UsartPort>(c: &mut UsartCtx<P>) {
    let rx_enabled = c.port.rx_interrupt_enabled(c.id);
    c.port.disable_rx_interrupt(c.id);

    c.port.get_from_input_buffer(c.id, &mut c.in_data);
    c.truncated = c.port.rx_overflowed(c.id);
    c.port.reset_input_buffer(c.id);

    if rx_enabled {
        c.port.enable_rx_interrupt(c.id);
    }

    if c.truncated {
        warn!("usart {}: message exceeded {} bytes, truncated", c.id, INPUT_BUFFER_LEN);
    }
    c.data_received = true;
}

fn finish_transmission<P: UsartPort>(c: &mut UsartCtx<P>) {
    c.port.reset_output_buffer(c.id);
    c.out_data.fill(EMPTY_BYTE);
}

/// USART transceiver bound to one hardware USART.
///
/// Reception needs the receive interrupt, which stays disabled until
/// [`enable_rx_interrupt`](Self::enable_rx_interrupt) is called.
///
/// # Example
///
/// ```rust
/// use pollfsm::engine::Machine;
/// use pollfsm::machines::UsartFsm;
/// use pollfsm::port::sim::SimPort;
/// use std::sync::Arc;
///
/// let port = Arc::new(SimPort::default());
/// let mut usart = UsartFsm::new(Arc::clone(&port), 0)?;
/// usart.enable_rx_interrupt();
///
/// port.deliver(0, b"ping\n");
/// usart.step();
/// assert_eq!(usart.in_message(), b"ping");
///
/// usart.reset_input_data();
/// usart.set_out_data(b"pong\n")?;
/// usart.step();
/// assert_eq!(port.flush_tx(0), b"pong\n");
/// # Ok::<(), pollfsm::error::FsmError>(())
/// ```
pub struct UsartFsm<P: UsartPort + 'static> {
    fsm: Fsm<UsartState, UsartCtx<P>>,
    ctx: UsartCtx<P>,
}

impl<P: UsartPort + 'static> UsartFsm<P> {
    /// Bind USART `id` with both interrupts disabled.
    pub fn new(port: P, id: u8) -> Result<Self, FsmError> {
        // Transmission is checked first, so a pending message goes out
        // before a completed reception is collected.
        let table = TableBuilder::new()
            .transition(
                TransitionBuilder::new()
                    .from(UsartState::WaitData)
                    .when(tx_pending::<P>)
                    .to(UsartState::SendData)
                    .then(start_transmission::<P>),
            )?
            .transition(
                TransitionBuilder::new()
                    .from(UsartState::WaitData)
                    .when(rx_complete::<P>)
                    .to(UsartState::WaitData)
                    .then(collect_input::<P>),
            )?
            .transition(
                TransitionBuilder::new()
                    .from(UsartState::SendData)
                    .when(tx_complete::<P>)
                    .to(UsartState::WaitData)
                    .then(finish_transmission::<P>),
            )?
            .build()?;

        port.init_usart(id)?;
        debug!("usart {} bound", id);

        Ok(Self {
            fsm: Fsm::new(table),
            ctx: UsartCtx {
                port,
                id,
                data_received: false,
                truncated: false,
                in_data: [EMPTY_BYTE; INPUT_BUFFER_LEN],
                out_data: [EMPTY_BYTE; OUTPUT_BUFFER_LEN],
            },
        })
    }

    /// Framing and overflow handling belong to the port; only the id is
    /// taken from the configuration.
    pub fn from_config(port: P, config: &UsartConfig) -> Result<Self, FsmError> {
        Self::new(port, config.id)
    }

    pub fn id(&self) -> u8 {
        self.ctx.id
    }

    pub fn check_data_received(&self) -> bool {
        self.ctx.data_received
    }

    /// Last collected message, padded with `EMPTY_BYTE`.
    pub fn get_in_data(&self) -> [u8; INPUT_BUFFER_LEN] {
        self.ctx.in_data
    }

    /// Last collected message up to its first empty byte.
    pub fn in_message(&self) -> &[u8] {
        let len = self
            .ctx
            .in_data
            .iter()
            .position(|&b| b == EMPTY_BYTE)
            .unwrap_or(INPUT_BUFFER_LEN);
        &self.ctx.in_data[..len]
    }

    /// Whether bytes were lost or overwritten while the last message
    /// arrived.
    pub fn is_truncated(&self) -> bool {
        self.ctx.truncated
    }

    /// Clear the collected message and the received flag.
    pub fn reset_input_data(&mut self) {
        self.ctx.in_data.fill(EMPTY_BYTE);
        self.ctx.data_received = false;
        self.ctx.truncated = false;
    }

    /// Queue a message for transmission on the next step.
    ///
    /// The message should end with the end-of-message byte. It may not
    /// contain the empty byte, which marks unused slots of the buffer.
    pub fn set_out_data(&mut self, data: &[u8]) -> Result<(), FsmError> {
        if data.len() > OUTPUT_BUFFER_LEN {
            warn!("usart {}: rejected {}-byte message", self.ctx.id, data.len());
            return Err(FsmError::MessageTooLong {
                len: data.len(),
                max: OUTPUT_BUFFER_LEN,
            });
        }
        if let Some(index) = data.iter().position(|&b| b == EMPTY_BYTE) {
            warn!("usart {}: rejected message with empty byte at {}", self.ctx.id, index);
            return Err(FsmError::EmptyByteInMessage { index });
        }
        self.ctx.out_data.fill(EMPTY_BYTE);
        self.ctx.out_data[..data.len()].copy_from_slice(data);
        Ok(())
    }

    pub fn enable_rx_interrupt(&self) {
        self.ctx.port.enable_rx_interrupt(self.ctx.id);
    }

    pub fn disable_rx_interrupt(&self) {
        self.ctx.port.disable_rx_interrupt(self.ctx.id);
    }

    pub fn enable_tx_interrupt(&self) {
        self.ctx.port.enable_tx_interrupt(self.ctx.id);
    }

    pub fn disable_tx_interrupt(&self) {
        self.ctx.port.disable_tx_interrupt(self.ctx.id);
    }
}

impl<P: UsartPort + 'static> Machine for UsartFsm<P> {
    type State = UsartState;

    fn step(&mut self) -> StepResult<UsartState> {
        self.fsm.step(&mut self.ctx)
    }

    fn state(&self) -> UsartState {
        self.fsm.current_state()
    }

    /// `true` while sending or while a received message awaits the caller.
    fn check_activity(&self) -> bool {
        self.fsm.current_state() == UsartState::SendData || self.ctx.data_received
    }
}

impl<P: UsartPort + 'static> Drop for UsartFsm<P> {
    fn drop(&mut self) {
        self.ctx.port.release_usart(self.ctx.id);
    }
}
