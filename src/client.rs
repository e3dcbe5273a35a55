use crate::driver::{Connector, Driver, KernReturn, IO_RETURN_NOT_PRIVILEGED, KERN_SUCCESS};
use crate::error::{Error, Result};
use crate::key::{decode, RegisterKey};
use crate::param::{ParamStruct, Payload, Selector, SmcResult};

/// Reads and writes controller registers over one exclusively owned connection.
///
/// The connection is closed when the client goes out of scope, on every path.
pub struct ControllerClient<D: Driver> {
    driver: D,
}

impl<D: Driver> ControllerClient<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    pub fn connect<C>(connector: &C) -> Result<Self>
    where
        C: Connector<Driver = D>,
    {
        connector.connect().map(Self::new)
    }

    pub fn read_register(&mut self, key: &RegisterKey) -> Result<Payload> {
        let input = ParamStruct::request(key, Selector::ReadKey);
        let output = self.call(&input)?;
        Ok(output.bytes)
    }

    pub fn write_register(&mut self, key: &RegisterKey, data: Payload) -> Result<()> {
        let input = ParamStruct::request(key, Selector::WriteKey).with_payload(data);
        self.call(&input).map(drop)
    }

    pub fn close(mut self) {
        self.driver.close();
    }

    fn call(&mut self, input: &ParamStruct) -> Result<ParamStruct> {
        let mut output = ParamStruct::default();
        let ret = self
            .driver
            .call_struct_method(Selector::HandleEvent as u32, input, &mut output);
        tracing::debug!(
            key = %decode(input.key),
            op = input.data8,
            ret,
            result = output.result,
            "controller call"
        );
        classify(ret, output.result, input.key).map(|()| output)
    }
}

impl<D: Driver> Drop for ControllerClient<D> {
    fn drop(&mut self) {
        self.driver.close();
    }
}

fn classify(ret: KernReturn, result: u8, key: u32) -> Result<()> {
    const SUCCESS: u8 = SmcResult::Success as u8;
    const KEY_NOT_FOUND: u8 = SmcResult::KeyNotFound as u8;

    match (ret, result) {
        (KERN_SUCCESS, SUCCESS) => Ok(()),
        (KERN_SUCCESS, KEY_NOT_FOUND) => Err(Error::KeyNotFound(decode(key))),
        (IO_RETURN_NOT_PRIVILEGED, _) => Err(Error::NotPrivileged),
        (transport, result) => Err(Error::UnknownDriverError { transport, result }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::DataType;
    use crate::mock::MockSmc;

    fn chwa() -> RegisterKey {
        RegisterKey::new("CHWA", DataType::UINT8).unwrap()
    }

    #[test]
    fn classifies_reply_codes() {
        let key = 0x4348_5741;
        assert!(classify(KERN_SUCCESS, 0, key).is_ok());
        assert!(matches!(
            classify(KERN_SUCCESS, 132, key),
            Err(Error::KeyNotFound(code)) if code == "CHWA"
        ));
        assert!(matches!(
            classify(IO_RETURN_NOT_PRIVILEGED, 0, key),
            Err(Error::NotPrivileged)
        ));
        assert!(matches!(
            classify(KERN_SUCCESS, 1, key),
            Err(Error::UnknownDriverError { transport: 0, result: 1 })
        ));
        assert!(matches!(
            classify(-1, 0, key),
            Err(Error::UnknownDriverError { transport: -1, result: 0 })
        ));
    }

    #[test]
    fn write_then_read_roundtrips_register() {
        let smc = MockSmc::with_register("CHWA", 0);
        let mut client = ControllerClient::new(smc.clone());
        let mut payload = [0; 32];
        payload[0] = 1;
        client.write_register(&chwa(), payload).unwrap();
        assert_eq!(client.read_register(&chwa()).unwrap()[0], 1);

        let calls = smc.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls
            .iter()
            .all(|c| c.selector == Selector::HandleEvent as u32 && c.data_size == 1));
        assert_eq!(calls[0].op, Selector::WriteKey as u8);
        assert_eq!(calls[1].op, Selector::ReadKey as u8);
    }

    #[test]
    fn missing_key_reports_its_code() {
        let smc = MockSmc::default();
        let mut client = ControllerClient::new(smc);
        let err = client.read_register(&chwa()).unwrap_err();
        assert!(matches!(err, Error::KeyNotFound(code) if code == "CHWA"));
    }

    #[test]
    fn driver_privilege_rejection() {
        let smc = MockSmc::with_register("CHWA", 0);
        smc.set_privileged(false);
        let mut client = ControllerClient::new(smc);
        assert!(matches!(
            client.write_register(&chwa(), [0; 32]),
            Err(Error::NotPrivileged)
        ));
    }

    #[test]
    fn connection_closed_once_on_error_and_explicit_close() {
        let smc = MockSmc::default();
        {
            let mut client = ControllerClient::new(smc.clone());
            assert!(client.read_register(&chwa()).is_err());
        }
        assert_eq!(smc.closes(), 1);

        let smc = MockSmc::default();
        ControllerClient::new(smc.clone()).close();
        assert_eq!(smc.closes(), 1);
    }
}
