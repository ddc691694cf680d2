//! Domain primitives: TimeMs, AccountId, Venue, ClientKind, Direction.

use serde::{Deserialize, Serialize};

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }
}

/// Opaque account identifier (uuid string).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: String) -> Self {
        AccountId(id)
    }

    /// Generate a fresh random id.
    pub fn generate() -> Self {
        AccountId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trading venue label (e.g. an exchange or platform name).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Venue(pub String);

impl Venue {
    pub fn new(venue: String) -> Self {
        Venue(venue)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client category; selects which ledger mechanism tracks the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientKind {
    /// Direct client; tracked by the single-total outstanding ledger.
    Individual,
    /// Company-partner client; tracked by the four-bucket tally ledger.
    Company,
}

impl std::fmt::Display for ClientKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientKind::Individual => write!(f, "individual"),
            ClientKind::Company => write!(f, "company"),
        }
    }
}

impl std::str::FromStr for ClientKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "individual" => Ok(ClientKind::Individual),
            "company" => Ok(ClientKind::Company),
            other => Err(format!("unknown client kind: {}", other)),
        }
    }
}

/// Which party pays in a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Client pays the broker (settles a loss-side obligation).
    ClientPays,
    /// Broker pays the client (settles a profit-side obligation).
    BrokerPays,
}

impl Direction {
    /// Signed multiplier for the obligation this direction settles:
    /// +1 when the client owes, -1 when the broker owes.
    pub fn sign(&self) -> i32 {
        match self {
            Direction::ClientPays => 1,
            Direction::BrokerPays => -1,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::ClientPays => write!(f, "client_pays"),
            Direction::BrokerPays => write!(f, "broker_pays"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client_pays" => Ok(Direction::ClientPays),
            "broker_pays" => Ok(Direction::BrokerPays),
            other => Err(format!("unknown direction: {}", other)),
        }
    }
}
