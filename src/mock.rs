//! In-memory stand-ins for the controller driver and the persistence layer.
//!
//! Useful for exercising [`ChargeLimitController`](crate::controller::ChargeLimitController)
//! without hardware or root. State is shared between clones so a test can keep a
//! handle and inspect what a connection did after it was closed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::charge_limit::ChargeLimit;
use crate::driver::{Connector, Driver, KernReturn, IO_RETURN_NOT_PRIVILEGED, KERN_SUCCESS};
use crate::error::{Error, Result};
use crate::key::encode;
use crate::param::{ParamStruct, Payload, Selector, SmcResult, PAYLOAD_LEN};
use crate::service::{PersistError, Persistence, Transition};

/// One call observed by [`MockSmc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedCall {
    pub selector: u32,
    pub op: u8,
    pub key: u32,
    pub data_size: u32,
}

#[derive(Debug)]
struct SmcState {
    registers: HashMap<u32, Payload>,
    calls: Vec<RecordedCall>,
    privileged: bool,
    connects: usize,
    closes: usize,
}

impl Default for SmcState {
    fn default() -> Self {
        Self {
            registers: HashMap::new(),
            calls: Vec::new(),
            privileged: true,
            connects: 0,
            closes: 0,
        }
    }
}

/// Fake controller holding a register file.
#[derive(Debug, Clone)]
pub struct MockSmc {
    state: Rc<RefCell<SmcState>>,
    open: bool,
}

impl Default for MockSmc {
    fn default() -> Self {
        Self {
            state: Rc::default(),
            open: true,
        }
    }
}

impl MockSmc {
    /// Controller exposing a single register whose first byte is `value`.
    ///
    /// # Panics
    ///
    /// Panics if `code` is not a valid key code.
    pub fn with_register(code: &str, value: u8) -> Self {
        let smc = Self::default();
        smc.set_register(code, value);
        smc
    }

    pub fn set_register(&self, code: &str, value: u8) {
        let key = encode(code).expect("mock register code must be 4 ASCII characters");
        let mut payload = [0; PAYLOAD_LEN];
        payload[0] = value;
        self.state.borrow_mut().registers.insert(key, payload);
    }

    pub fn register(&self, code: &str) -> Option<u8> {
        let key = encode(code).ok()?;
        self.state.borrow().registers.get(&key).map(|p| p[0])
    }

    /// When false every call is rejected at the transport level.
    pub fn set_privileged(&self, privileged: bool) {
        self.state.borrow_mut().privileged = privileged;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.borrow().calls.clone()
    }

    pub fn connects(&self) -> usize {
        self.state.borrow().connects
    }

    pub fn closes(&self) -> usize {
        self.state.borrow().closes
    }

    /// Connections handed out and not yet closed.
    pub fn open_connections(&self) -> usize {
        let state = self.state.borrow();
        state.connects.saturating_sub(state.closes)
    }

    fn handle(&self, input: &ParamStruct, output: &mut ParamStruct) -> SmcResult {
        let mut state = self.state.borrow_mut();
        let size = (input.data_size() as usize).min(PAYLOAD_LEN);
        let Some(register) = state.registers.get_mut(&input.key) else {
            return SmcResult::KeyNotFound;
        };
        if input.data8 == Selector::ReadKey as u8 {
            output.bytes[..size].copy_from_slice(&register[..size]);
            SmcResult::Success
        } else if input.data8 == Selector::WriteKey as u8 {
            register[..size].copy_from_slice(&input.bytes[..size]);
            SmcResult::Success
        } else {
            SmcResult::Error
        }
    }
}

impl Driver for MockSmc {
    fn call_struct_method(
        &mut self,
        selector: u32,
        input: &ParamStruct,
        output: &mut ParamStruct,
    ) -> KernReturn {
        self.state.borrow_mut().calls.push(RecordedCall {
            selector,
            op: input.data8,
            key: input.key,
            data_size: input.data_size(),
        });
        if !self.state.borrow().privileged {
            return IO_RETURN_NOT_PRIVILEGED;
        }
        let result = if selector == Selector::HandleEvent as u32 {
            self.handle(input, output)
        } else {
            SmcResult::Error
        };
        output.key = input.key;
        output.result = result as u8;
        KERN_SUCCESS
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.state.borrow_mut().closes += 1;
        }
    }
}

/// Hands out connections to a shared [`MockSmc`].
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    smc: MockSmc,
    unavailable: bool,
}

impl MockConnector {
    pub fn new(smc: MockSmc) -> Self {
        Self {
            smc,
            unavailable: false,
        }
    }

    /// Connector whose driver cannot be located.
    pub fn unavailable() -> Self {
        Self {
            smc: MockSmc::default(),
            unavailable: true,
        }
    }

    pub fn smc(&self) -> &MockSmc {
        &self.smc
    }
}

impl Connector for MockConnector {
    type Driver = MockSmc;

    fn connect(&self) -> Result<MockSmc> {
        if self.unavailable {
            return Err(Error::DriverNotFound);
        }
        self.smc.state.borrow_mut().connects += 1;
        Ok(MockSmc {
            state: Rc::clone(&self.smc.state),
            open: true,
        })
    }
}

#[derive(Debug, Default)]
struct PersistState {
    active: bool,
    command: Option<Vec<String>>,
    calls: usize,
    fail_updates: bool,
}

/// Persistence kept in memory; the saved command mirrors the launchd arguments.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    state: Rc<RefCell<PersistState>>,
}

impl MemoryPersistence {
    pub fn is_active(&self) -> bool {
        self.state.borrow().active
    }

    /// Saved arguments after the program path, e.g. `["write", "80"]`.
    pub fn command(&self) -> Option<Vec<String>> {
        self.state.borrow().command.clone()
    }

    /// Number of trait calls made so far.
    pub fn calls(&self) -> usize {
        self.state.borrow().calls
    }

    pub fn fail_updates(&self, fail: bool) {
        self.state.borrow_mut().fail_updates = fail;
    }
}

impl Persistence for MemoryPersistence {
    fn is_persisted(&self) -> std::result::Result<bool, PersistError> {
        let mut state = self.state.borrow_mut();
        state.calls += 1;
        Ok(state.active)
    }

    fn set_persisted(&self, enable: bool) -> std::result::Result<Transition, PersistError> {
        let mut state = self.state.borrow_mut();
        state.calls += 1;
        if state.active == enable {
            return Ok(Transition::Unchanged);
        }
        state.active = enable;
        if !enable {
            state.command = None;
        }
        Ok(Transition::Changed)
    }

    fn update_persisted_command(&self, limit: ChargeLimit) -> std::result::Result<(), PersistError> {
        let mut state = self.state.borrow_mut();
        state.calls += 1;
        if state.fail_updates {
            return Err(PersistError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "descriptor is read-only",
            )));
        }
        state.command = Some(vec!["write".to_owned(), limit.to_string()]);
        Ok(())
    }
}
