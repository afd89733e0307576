use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Frequency {
    Daily => "daily",
    TwiceDaily => "twice_daily",
    Weekly => "weekly",
    Monthly => "monthly",
    AsNeeded => "as_needed",
    Custom => "custom",
});

str_enum!(MedicationStatus {
    Active => "active",
    Inactive => "inactive",
});

str_enum!(ReminderStatus {
    Scheduled => "scheduled",
    Taken => "taken",
    Skipped => "skipped",
});

str_enum!(UserRole {
    Patient => "patient",
    Caregiver => "caregiver",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn frequency_round_trip() {
        for (variant, s) in [
            (Frequency::Daily, "daily"),
            (Frequency::TwiceDaily, "twice_daily"),
            (Frequency::Weekly, "weekly"),
            (Frequency::Monthly, "monthly"),
            (Frequency::AsNeeded, "as_needed"),
            (Frequency::Custom, "custom"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(Frequency::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn reminder_status_round_trip() {
        for (variant, s) in [
            (ReminderStatus::Scheduled, "scheduled"),
            (ReminderStatus::Taken, "taken"),
            (ReminderStatus::Skipped, "skipped"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(ReminderStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn serde_matches_storage_strings() {
        let json = serde_json::to_string(&Frequency::TwiceDaily).unwrap();
        assert_eq!(json, "\"twice_daily\"");
        let parsed: MedicationStatus = serde_json::from_str("\"inactive\"").unwrap();
        assert_eq!(parsed, MedicationStatus::Inactive);
    }

    #[test]
    fn invalid_enum_returns_error() {
        let err = Frequency::from_str("fortnightly").unwrap_err();
        assert!(err.to_string().contains("Frequency"));
        assert!(UserRole::from_str("Caregiver").is_err());
    }

    #[test]
    fn display_uses_storage_string() {
        assert_eq!(UserRole::Caregiver.to_string(), "caregiver");
        assert_eq!(MedicationStatus::Active.to_string(), "active");
    }
}
