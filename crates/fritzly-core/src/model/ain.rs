// ── Device identity ──
//
// The AIN (actor identification number) is the stable hardware address of
// a DECT device. It is the only identity that survives across polls; the
// numeric `id` attribute may change when a device is re-paired.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable device identifier, e.g. `"08761 0000434"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ain(String);

impl Ain {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Ain {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Ain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Ain {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for Ain {
    fn from(s: String) -> Self {
        Self(s)
    }
}
