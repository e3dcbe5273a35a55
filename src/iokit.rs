//! IOKit bindings for the `AppleSMC` service.

use std::ffi::{c_char, c_void};
use std::mem::size_of;

use crate::driver::{Driver, KernReturn, KERN_SUCCESS};
use crate::error::{Error, Result};
use crate::param::ParamStruct;

type MachPort = u32;
type IoObject = MachPort;
type IoConnect = IoObject;

const IO_OBJECT_NULL: IoObject = 0;
/// `kIOMainPortDefault`, the null port.
const IO_MAIN_PORT_DEFAULT: MachPort = 0;

const SMC_SERVICE: &[u8] = b"AppleSMC\0";

#[link(name = "IOKit", kind = "framework")]
extern "C" {
    fn IOServiceMatching(name: *const c_char) -> *mut c_void;
    fn IOServiceGetMatchingService(main_port: MachPort, matching: *mut c_void) -> IoObject;
    fn IOServiceOpen(
        service: IoObject,
        owning_task: MachPort,
        connect_type: u32,
        connect: *mut IoConnect,
    ) -> KernReturn;
    fn IOServiceClose(connect: IoConnect) -> KernReturn;
    fn IOObjectRelease(object: IoObject) -> KernReturn;
    fn IOConnectCallStructMethod(
        connection: IoConnect,
        selector: u32,
        input: *const c_void,
        input_size: usize,
        output: *mut c_void,
        output_size: *mut usize,
    ) -> KernReturn;
}

extern "C" {
    static mach_task_self_: MachPort;
}

#[derive(Debug)]
pub struct IoKitConnection {
    handle: IoConnect,
}

impl IoKitConnection {
    pub fn open() -> Result<Self> {
        // SAFETY: SMC_SERVICE is NUL terminated. IOServiceGetMatchingService
        // consumes the matching dictionary reference.
        let service = unsafe {
            IOServiceGetMatchingService(
                IO_MAIN_PORT_DEFAULT,
                IOServiceMatching(SMC_SERVICE.as_ptr().cast()),
            )
        };
        if service == IO_OBJECT_NULL {
            return Err(Error::DriverNotFound);
        }

        let mut handle = IO_OBJECT_NULL;
        // SAFETY: service is a valid object we own and release right after.
        let result = unsafe {
            let result = IOServiceOpen(service, mach_task_self_, 0, &mut handle);
            IOObjectRelease(service);
            result
        };
        if result != KERN_SUCCESS {
            return Err(Error::FailedToOpen(result));
        }
        tracing::debug!(handle, "opened AppleSMC connection");
        Ok(Self { handle })
    }
}

impl Driver for IoKitConnection {
    fn call_struct_method(
        &mut self,
        selector: u32,
        input: &ParamStruct,
        output: &mut ParamStruct,
    ) -> KernReturn {
        let mut output_size = size_of::<ParamStruct>();
        // SAFETY: both pointers reference live ParamStruct values of the size passed.
        unsafe {
            IOConnectCallStructMethod(
                self.handle,
                selector,
                (input as *const ParamStruct).cast(),
                size_of::<ParamStruct>(),
                (output as *mut ParamStruct).cast(),
                &mut output_size,
            )
        }
    }

    fn close(&mut self) {
        if self.handle != IO_OBJECT_NULL {
            // SAFETY: handle came from IOServiceOpen and is reset so it is closed once.
            unsafe { IOServiceClose(self.handle) };
            tracing::debug!(handle = self.handle, "closed AppleSMC connection");
            self.handle = IO_OBJECT_NULL;
        }
    }
}

impl Drop for IoKitConnection {
    fn drop(&mut self) {
        self.close();
    }
}
