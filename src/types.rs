use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// unique identifier for a financing contract
pub type ContractId = Uuid;

/// unique identifier for a payment
pub type PaymentId = Uuid;

/// kind of vehicle being financed (informational)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleType {
    #[serde(rename = "AUTOMOVEL")]
    Car,
    #[serde(rename = "MOTOCICLETA")]
    Motorcycle,
    #[serde(rename = "CAMINHAO")]
    Truck,
}

/// condition of the financed vehicle (informational)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleCondition {
    #[serde(rename = "NOVO")]
    New,
    #[serde(rename = "USADO")]
    Used,
}

/// contract status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractStatus {
    /// balance still outstanding
    #[serde(rename = "ATIVO")]
    Active,
    /// balance fully amortized
    #[serde(rename = "QUITADO")]
    Settled,
    /// terminal, never left once entered
    #[serde(rename = "CANCELADO")]
    Canceled,
}

/// how a payment landed relative to its due date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[serde(rename = "EM_DIA")]
    OnTime,
    #[serde(rename = "ANTECIPADO")]
    Early,
    #[serde(rename = "EM_ATRASO")]
    Late,
}

impl PaymentStatus {
    /// on-time and early payments both count as punctual
    pub fn is_punctual(&self) -> bool {
        matches!(self, PaymentStatus::OnTime | PaymentStatus::Early)
    }
}

/// error returned when a wire string names no known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! wire_strings {
    ($ty:ident, $kind:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $ty {
            /// wire-stable string for this value
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($ty::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

wire_strings!(VehicleType, "vehicle type", {
    Car => "AUTOMOVEL",
    Motorcycle => "MOTOCICLETA",
    Truck => "CAMINHAO",
});

wire_strings!(VehicleCondition, "vehicle condition", {
    New => "NOVO",
    Used => "USADO",
});

wire_strings!(ContractStatus, "contract status", {
    Active => "ATIVO",
    Settled => "QUITADO",
    Canceled => "CANCELADO",
});

wire_strings!(PaymentStatus, "payment status", {
    OnTime => "EM_DIA",
    Early => "ANTECIPADO",
    Late => "EM_ATRASO",
});
