//! Who an arrival is charged to.

use std::fmt;
use std::net::IpAddr;

/// The key admission budgets are tracked under.
///
/// Authenticated callers are charged by principal, so one user is throttled
/// the same way from every address. Everyone else is charged by the address
/// the request came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identity {
    /// An authenticated user or API client.
    Principal(String),
    /// The peer address of an anonymous caller.
    Origin(IpAddr),
}

impl Identity {
    /// Picks the principal when one is present and non-empty, else the origin.
    ///
    /// ```
    /// use intake_resilience_admission::Identity;
    /// use std::net::{IpAddr, Ipv4Addr};
    ///
    /// let origin = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7));
    /// assert_eq!(Identity::resolve(Some("u-42"), origin), Identity::Principal("u-42".into()));
    /// assert_eq!(Identity::resolve(None, origin), Identity::Origin(origin));
    /// ```
    pub fn resolve(principal: Option<&str>, origin: IpAddr) -> Self {
        match principal {
            Some(p) if !p.is_empty() => Identity::Principal(p.to_string()),
            _ => Identity::Origin(origin),
        }
    }

    /// Returns true for authenticated callers.
    pub fn is_principal(&self) -> bool {
        matches!(self, Identity::Principal(_))
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Identity::Principal(_) => "principal",
            Identity::Origin(_) => "origin",
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Principal(p) => write!(f, "principal:{p}"),
            Identity::Origin(ip) => write!(f, "origin:{ip}"),
        }
    }
}

impl From<IpAddr> for Identity {
    fn from(ip: IpAddr) -> Self {
        Identity::Origin(ip)
    }
}
