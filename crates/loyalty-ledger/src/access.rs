//! Authorization hook consulted before every service operation.
//!
//! Authentication happens in front of this service; the policy only sees the caller
//! identity forwarded by that platform.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of whoever issued a request, as forwarded by the surrounding platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Caller(pub String);

impl Caller {
    pub fn anonymous() -> Self {
        Self("anonymous".to_string())
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Interface operations a policy can allow or deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Ingest,
    DeleteCustomer,
    Recompute,
    NormalizeDates,
    Claim,
    Query,
}

impl Operation {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ingest => "ingest",
            Self::DeleteCustomer => "delete_customer",
            Self::Recompute => "recompute",
            Self::NormalizeDates => "normalize_dates",
            Self::Claim => "claim",
            Self::Query => "query",
        }
    }

    pub const fn is_read_only(self) -> bool {
        matches!(self, Self::Query)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("caller '{caller}' may not perform {}", .operation.label())]
pub struct AccessDenied {
    pub caller: Caller,
    pub operation: Operation,
}

pub trait AccessPolicy: Send + Sync {
    fn authorize(&self, caller: &Caller, operation: Operation) -> Result<(), AccessDenied>;
}

/// Every caller may perform every operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn authorize(&self, _caller: &Caller, _operation: Operation) -> Result<(), AccessDenied> {
        Ok(())
    }
}

/// Only queries are permitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnly;

impl AccessPolicy for ReadOnly {
    fn authorize(&self, caller: &Caller, operation: Operation) -> Result<(), AccessDenied> {
        if operation.is_read_only() {
            Ok(())
        } else {
            Err(AccessDenied {
                caller: caller.clone(),
                operation,
            })
        }
    }
}

/// Policy selection exposed through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Open,
    ReadOnly,
}

impl AccessMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" | "allow-all" => Some(Self::Open),
            "read-only" | "readonly" => Some(Self::ReadOnly),
            _ => None,
        }
    }

    pub fn policy(self) -> Box<dyn AccessPolicy> {
        match self {
            Self::Open => Box::new(AllowAll),
            Self::ReadOnly => Box::new(ReadOnly),
        }
    }
}
