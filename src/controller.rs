use crate::charge_limit::{ChargeLimit, RegisterReading};
use crate::client::ControllerClient;
use crate::driver::{is_privileged, Connector};
use crate::error::{Error, Result};
use crate::key::{DataType, FourCharCode, RegisterKey};
use crate::service::{Persistence, Transition};
use crate::CHARGE_LIMIT_KEY;

/// Charge limit register, a single unsigned byte.
pub const CHARGE_LIMIT_REGISTER: RegisterKey = RegisterKey {
    code: FourCharCode::from_bytes(CHARGE_LIMIT_KEY),
    data_type: DataType::UINT8,
};

/// Reads and applies the charge limit and keeps the boot-time command in sync.
///
/// Each operation opens its own controller connection and closes it before
/// returning. Mutating operations check privilege and input before touching
/// the driver or the persistence layer.
pub struct ChargeLimitController<C, P> {
    connector: C,
    persistence: P,
    privileged: bool,
}

impl<C: Connector, P: Persistence> ChargeLimitController<C, P> {
    pub fn new(connector: C, persistence: P) -> Self {
        Self {
            connector,
            persistence,
            privileged: is_privileged(),
        }
    }

    /// Overrides the privilege detected from the process credentials.
    pub fn with_privilege(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    pub fn read(&self) -> Result<ChargeLimit> {
        let raw = self.read_register_byte()?;
        if let RegisterReading::Unrecognized(raw) = RegisterReading::from(raw) {
            tracing::warn!(raw, "unexpected charge limit register value, reporting 100");
        }
        Ok(ChargeLimit::from_register_byte(raw))
    }

    pub fn read_register_byte(&self) -> Result<u8> {
        let mut client = ControllerClient::connect(&self.connector)?;
        let payload = client.read_register(&CHARGE_LIMIT_REGISTER)?;
        Ok(payload[0])
    }

    /// Applies `value` (80 or 100).
    ///
    /// A successful write is followed by a persisted command update when
    /// persistence is active. If that update fails the register keeps the new
    /// value and [`Error::PersistenceOutOfSync`] is returned.
    pub fn write(&self, value: i64) -> Result<ChargeLimit> {
        self.ensure_privileged()?;
        let limit = ChargeLimit::try_from(value)?;

        let mut client = ControllerClient::connect(&self.connector)?;
        client.write_register(&CHARGE_LIMIT_REGISTER, limit.payload())?;
        client.close();
        tracing::debug!(%limit, "charge limit written");

        let synced = self.persistence.is_persisted().and_then(|active| {
            if active {
                self.persistence.update_persisted_command(limit)
            } else {
                Ok(())
            }
        });
        if let Err(source) = synced {
            tracing::warn!(%limit, error = %source, "persisted command out of sync");
            return Err(Error::PersistenceOutOfSync { limit, source });
        }
        Ok(limit)
    }

    /// Saves the current limit as the boot-time command and activates it.
    pub fn persist_current(&self) -> Result<Transition> {
        self.ensure_privileged()?;
        if self.persistence.is_persisted()? {
            return Ok(Transition::Unchanged);
        }
        let limit = self.read()?;
        self.persistence.update_persisted_command(limit)?;
        Ok(self.persistence.set_persisted(true)?)
    }

    pub fn unpersist(&self) -> Result<Transition> {
        self.ensure_privileged()?;
        Ok(self.persistence.set_persisted(false)?)
    }

    pub fn is_persisted(&self) -> Result<bool> {
        Ok(self.persistence.is_persisted()?)
    }

    fn ensure_privileged(&self) -> Result<()> {
        if self.privileged {
            Ok(())
        } else {
            Err(Error::InsufficientPrivilege)
        }
    }
}
