//! Status enums stored as upper-case TEXT columns.
//!
//! Each variant's string matches the `CHECK` constraint on the owning table
//! and the JSON representation used by the API.

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $val)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Return the database/JSON representation.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $val ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $val => Ok($name::$variant), )+
                    other => Err(crate::error::CoreError::Validation(format!(
                        "Unknown {} '{other}'",
                        stringify!($name)
                    ))),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = crate::error::CoreError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }
    };
}

define_status_enum! {
    /// Project lifecycle status.
    ProjectStatus {
        Requesting = "REQUESTING",
        Processing = "PROCESSING",
        Designing = "DESIGNING",
        Constructing = "CONSTRUCTING",
        Finished = "FINISHED",
    }
}

define_status_enum! {
    /// Construction item status (both levels of the tree).
    ItemStatus {
        Opening = "OPENING",
        Processing = "PROCESSING",
        Done = "DONE",
    }
}

define_status_enum! {
    /// Construction task status.
    TaskStatus {
        Opening = "OPENING",
        Processing = "PROCESSING",
        Previewing = "PREVIEWING",
        Done = "DONE",
    }
}

define_status_enum! {
    /// Quotation review status.
    QuotationStatus {
        Previewing = "PREVIEWING",
        Approved = "APPROVED",
        Rejected = "REJECTED",
    }
}

define_status_enum! {
    /// Contract status. `Active` means the customer confirmed it by OTP.
    ContractStatus {
        Processing = "PROCESSING",
        Active = "ACTIVE",
        Cancelled = "CANCELLED",
    }
}

define_status_enum! {
    /// Project document status. `Active` means the customer confirmed it by OTP.
    DocStatus {
        Processing = "PROCESSING",
        Active = "ACTIVE",
    }
}

define_status_enum! {
    /// Promotion status, derived from its validity window.
    PromotionStatus {
        Pending = "PENDING",
        Active = "ACTIVE",
        Expired = "EXPIRED",
    }
}

define_status_enum! {
    /// Payment batch status.
    PaymentBatchStatus {
        Pending = "PENDING",
        Paid = "PAID",
    }
}

define_status_enum! {
    /// Contract payment milestone.
    PaymentPhase {
        Deposit = "DEPOSIT",
        PreConstructing = "PRE_CONSTRUCTING",
        Constructing = "CONSTRUCTING",
        Acceptance = "ACCEPTANCE",
    }
}

define_status_enum! {
    /// Deferred job queue status.
    DeferredJobStatus {
        Pending = "PENDING",
        Running = "RUNNING",
        Done = "DONE",
        Failed = "FAILED",
        Cancelled = "CANCELLED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_database_representation() {
        assert_eq!("PREVIEWING".parse::<TaskStatus>().unwrap(), TaskStatus::Previewing);
        assert_eq!(
            "PRE_CONSTRUCTING".parse::<PaymentPhase>().unwrap(),
            PaymentPhase::PreConstructing
        );
    }

    #[test]
    fn unknown_value_is_a_validation_error() {
        let err = "FINISHED".parse::<ItemStatus>().unwrap_err();
        assert!(err.to_string().contains("Unknown ItemStatus 'FINISHED'"));
    }

    #[test]
    fn serde_uses_upper_case_strings() {
        let json = serde_json::to_string(&ContractStatus::Cancelled).unwrap();
        assert_eq!(json, "\"CANCELLED\"");
        let back: ContractStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ContractStatus::Cancelled);
    }

    #[test]
    fn display_matches_as_str() {
        for status in TaskStatus::ALL {
            assert_eq!(status.to_string(), status.as_str());
        }
    }
}
