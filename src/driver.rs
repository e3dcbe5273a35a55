use crate::error::{Error, Result};
use crate::param::ParamStruct;

/// Transport level return code of a driver call (`kern_return_t`).
pub type KernReturn = i32;

pub const KERN_SUCCESS: KernReturn = 0;
pub const IO_RETURN_NOT_PRIVILEGED: KernReturn = 0xE000_02C1_u32 as KernReturn;

/// An open, privileged connection to the controller driver.
pub trait Driver {
    /// Issues one structural call. `output` receives the reply record.
    fn call_struct_method(
        &mut self,
        selector: u32,
        input: &ParamStruct,
        output: &mut ParamStruct,
    ) -> KernReturn;

    /// Releases the connection. Must be safe to call more than once.
    fn close(&mut self) {}
}

/// Opens one driver connection per command.
pub trait Connector {
    type Driver: Driver;

    fn connect(&self) -> Result<Self::Driver>;
}

/// Connects to the real controller of the running machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConnector;

#[cfg(target_os = "macos")]
impl Connector for SystemConnector {
    type Driver = crate::iokit::IoKitConnection;

    fn connect(&self) -> Result<Self::Driver> {
        ensure_supported_platform()?;
        crate::iokit::IoKitConnection::open()
    }
}

#[cfg(not(target_os = "macos"))]
impl Connector for SystemConnector {
    type Driver = Unsupported;

    fn connect(&self) -> Result<Self::Driver> {
        Err(Error::UnsupportedPlatform)
    }
}

/// Driver type of [`SystemConnector`] on platforms without a controller.
#[cfg(not(target_os = "macos"))]
#[derive(Debug)]
pub enum Unsupported {}

#[cfg(not(target_os = "macos"))]
impl Driver for Unsupported {
    fn call_struct_method(&mut self, _: u32, _: &ParamStruct, _: &mut ParamStruct) -> KernReturn {
        match *self {}
    }
}

/// The register scheme only exists on Apple silicon.
pub fn ensure_supported_platform() -> Result<()> {
    if cfg!(all(target_os = "macos", target_arch = "aarch64")) {
        Ok(())
    } else {
        Err(Error::UnsupportedPlatform)
    }
}

#[cfg(unix)]
pub fn is_privileged() -> bool {
    // SAFETY: getuid has no preconditions and cannot fail.
    unsafe { libc::getuid() == 0 }
}

#[cfg(not(unix))]
pub fn is_privileged() -> bool {
    false
}
