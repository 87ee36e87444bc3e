//! Network ports and unit addresses.

use std::fmt;

use crate::env::Environment;
use crate::error::Result;
use crate::exec::argv;

/// Transport protocol for port operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Port and address operations for the current unit.
pub struct Network<'a> {
    env: &'a Environment,
}

impl<'a> Network<'a> {
    pub fn new(env: &'a Environment) -> Self {
        Self { env }
    }

    /// Expose a service port to clients of this unit.
    pub fn open_port(&self, port: u16, protocol: Protocol) -> Result<()> {
        self.env
            .runner()
            .run(&argv(&["open-port", &format!("{port}/{protocol}")]))?;
        Ok(())
    }

    /// Close a previously opened service port.
    pub fn close_port(&self, port: u16, protocol: Protocol) -> Result<()> {
        self.env
            .runner()
            .run(&argv(&["close-port", &format!("{port}/{protocol}")]))?;
        Ok(())
    }

    /// This unit's public address, if the runtime reports one.
    pub fn public_ip(&self) -> Result<Option<String>> {
        self.address("public-address")
    }

    /// This unit's private address, if the runtime reports one.
    pub fn private_ip(&self) -> Result<Option<String>> {
        self.address("private-address")
    }

    fn address(&self, attribute: &str) -> Result<Option<String>> {
        Ok(self
            .env
            .unit_get(attribute)?
            .and_then(|value| value.as_str().map(str::to_string)))
    }
}
