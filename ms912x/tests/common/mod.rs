//! Mock HID transport shared by the integration tests.
//!
//! Records every control transfer and answers read reports from a simulated
//! register file. Write reports land in `written`, keyed by their one-byte
//! address, so register contents can depend on the programmed mode.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use ms912x::device::ControlTransport;
use ms912x::TransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transfer {
    Out {
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: Vec<u8>,
    },
    In {
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        length: u16,
    },
}

impl Transfer {
    pub fn out_data(&self) -> Option<&[u8]> {
        match self {
            Transfer::Out { data, .. } => Some(data.as_slice()),
            Transfer::In { .. } => None,
        }
    }
}

/// One register-level operation, decoded from the transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Read(u16),
    Write(u8, [u8; 6]),
}

type ReadFn = dyn Fn(u16, &HashMap<u8, [u8; 6]>) -> u8;

struct State {
    transfers: Vec<Transfer>,
    written: HashMap<u8, [u8; 6]>,
    armed: Option<u16>,
    fail_at: Option<usize>,
    short_read: bool,
}

#[derive(Clone)]
pub struct MockTransport {
    state: Rc<RefCell<State>>,
    read_fn: Rc<ReadFn>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::with_registers(|_, _| 0)
    }

    /// Every read returns `value`.
    pub fn constant(value: u8) -> Self {
        Self::with_registers(move |_, _| value)
    }

    /// `f(address, last write per write address)` answers reads.
    pub fn with_registers<F>(f: F) -> Self
    where
        F: Fn(u16, &HashMap<u8, [u8; 6]>) -> u8 + 'static,
    {
        Self {
            state: Rc::new(RefCell::new(State {
                transfers: Vec::new(),
                written: HashMap::new(),
                armed: None,
                fail_at: None,
                short_read: false,
            })),
            read_fn: Rc::new(f),
        }
    }

    /// The transfer with this zero-based index fails with a pipe stall.
    pub fn fail_at(&self, transfer: usize) {
        self.state.borrow_mut().fail_at = Some(transfer);
    }

    pub fn return_short_reads(&self) {
        self.state.borrow_mut().short_read = true;
    }

    pub fn transfers(&self) -> Vec<Transfer> {
        self.state.borrow().transfers.clone()
    }

    pub fn transfer_count(&self) -> usize {
        self.state.borrow().transfers.len()
    }

    /// Register operations in issue order. A read shows up when its out
    /// report is sent.
    pub fn ops(&self) -> Vec<Op> {
        self.state
            .borrow()
            .transfers
            .iter()
            .filter_map(|t| match t.out_data()? {
                [0xb5, hi, lo, ..] => Some(Op::Read((*hi as u16) << 8 | *lo as u16)),
                [0xa6, addr, payload @ ..] => {
                    Some(Op::Write(*addr, payload.try_into().ok()?))
                }
                _ => None,
            })
            .collect()
    }

    fn record(&self, transfer: Transfer) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        let n = state.transfers.len();
        state.transfers.push(transfer);

        if state.fail_at == Some(n) {
            return Err(TransportError::Usb(rusb::Error::Pipe));
        }
        Ok(())
    }
}

impl ControlTransport for MockTransport {
    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<(), TransportError> {
        self.record(Transfer::Out {
            request_type,
            request,
            value,
            index,
            data: data.to_vec(),
        })?;

        let mut state = self.state.borrow_mut();
        match data {
            [0xb5, hi, lo, ..] => state.armed = Some((*hi as u16) << 8 | *lo as u16),
            [0xa6, addr, payload @ ..] => {
                if let Ok(payload) = <[u8; 6]>::try_from(payload) {
                    state.written.insert(*addr, payload);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn read_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        length: u16,
    ) -> Result<Vec<u8>, TransportError> {
        self.record(Transfer::In {
            request_type,
            request,
            value,
            index,
            length,
        })?;

        let state = self.state.borrow();
        let address = state.armed.unwrap_or(0);
        let value = (self.read_fn)(address, &state.written);

        if state.short_read {
            return Ok(vec![0xb5, (address >> 8) as u8]);
        }

        let mut response = vec![0u8; length as usize];
        response[0] = 0xb5;
        response[1] = (address >> 8) as u8;
        response[2] = address as u8;
        response[3] = value;
        Ok(response)
    }
}
