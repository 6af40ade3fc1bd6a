//! Strongly typed identifiers shared across the core services.
//!
//! Every identifier is a thin newtype over `String` (or `i32` for terminal
//! numbers). This buys us compile-time separation between, say, a
//! `TenantId` and a `StaffId` — both of which are plain strings on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(TenantId, "Tenant identifier, scopes every datastore and cache.");
string_id!(StoreCode, "Store code within a tenant.");
string_id!(StaffId, "Staff member identifier, embedded on terminal sessions.");
string_id!(ItemCode, "Item master key.");
string_id!(CategoryCode, "Category master key.");
string_id!(TaxCode, "Tax master key.");
string_id!(PaymentCode, "Payment method master key.");
string_id!(CartId, "Service-generated cart identifier (UUID as string).");

/// Terminal number within a store. Terminals are numbered from 1.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TerminalNo(pub i32);

impl fmt::Display for TerminalNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compound key identifying a terminal: `(tenant_id, store_code, terminal_no)`.
///
/// The derived string id follows the source convention `"{tenant}-{store}-{no}"`
/// and is what callers pass in URLs; the struct itself is what repositories key on.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TerminalId {
    pub tenant_id: TenantId,
    pub store_code: StoreCode,
    pub terminal_no: TerminalNo,
}

impl TerminalId {
    #[must_use]
    pub fn new(tenant_id: TenantId, store_code: StoreCode, terminal_no: TerminalNo) -> Self {
        Self {
            tenant_id,
            store_code,
            terminal_no,
        }
    }

    /// Renders the derived string id `"{tenant}-{store}-{no}"`.
    #[must_use]
    pub fn as_derived_string(&self) -> String {
        format!("{}-{}-{}", self.tenant_id, self.store_code, self.terminal_no)
    }
}

impl fmt::Display for TerminalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_derived_string())
    }
}

/// Embedded staff reference carried on terminals, carts and tranlogs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRef {
    pub id: StaffId,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_id_derives_string_form() {
        let id = TerminalId::new(TenantId::new("ten1"), StoreCode::new("st1"), TerminalNo(3));
        assert_eq!(id.as_derived_string(), "ten1-st1-3");
        assert_eq!(id.to_string(), "ten1-st1-3");
    }

    #[test]
    fn string_id_roundtrips_through_display() {
        let id = ItemCode::new("49-01");
        assert_eq!(id.as_str(), "49-01");
        assert_eq!(format!("{id}"), "49-01");
    }
}
