//! Recipient-group addressing.
//!
//! A target names one room: a single user, everyone with a role, everyone in
//! an academy, or everyone in a class. The wire grammar is `type:id`
//! (`user:8`, `academy:5`, `class:20`, `role:STUDENT`); internally targets
//! are an exhaustive sum type so only the ad-hoc string entry point carries
//! a parse-error path.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::domain::Role;
use crate::error::ValidationError;

/// One addressable recipient group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    User(i64),
    Role(Role),
    Academy(i64),
    Class(i64),
}

/// Why a `type:id` string could not be parsed into a [`Target`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetParseError {
    #[error("malformed target '{0}', expected 'type:id'")]
    Malformed(String),

    #[error("unknown target type '{kind}' in '{target}'")]
    UnknownKind { target: String, kind: String },

    #[error("non-numeric id '{id}' in '{target}'")]
    NonNumericId { target: String, id: String },

    #[error("unknown role '{role}' in '{target}'")]
    UnknownRole { target: String, role: String },
}

impl Target {
    /// The room key this target addresses, e.g. `user:8` or `role:STUDENT`.
    pub fn room_key(&self) -> String {
        self.to_string()
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Target::User(_) => "user",
            Target::Role(_) => "role",
            Target::Academy(_) => "academy",
            Target::Class(_) => "class",
        }
    }

    /// Reject ids that cannot name a real entity. Role targets carry no id.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let (field, value) = match self {
            Target::User(id) => ("user_id", *id),
            Target::Academy(id) => ("academy_id", *id),
            Target::Class(id) => ("class_id", *id),
            Target::Role(_) => return Ok(()),
        };
        if value <= 0 {
            return Err(ValidationError::NonPositiveId { field, value });
        }
        Ok(())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::User(id) => write!(f, "user:{id}"),
            Target::Role(role) => write!(f, "role:{role}"),
            Target::Academy(id) => write!(f, "academy:{id}"),
            Target::Class(id) => write!(f, "class:{id}"),
        }
    }
}

impl FromStr for Target {
    type Err = TargetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| TargetParseError::Malformed(s.to_string()))?;
        if kind.is_empty() || id.is_empty() {
            return Err(TargetParseError::Malformed(s.to_string()));
        }

        let parse_id = |id: &str| {
            id.parse::<i64>()
                .map_err(|_| TargetParseError::NonNumericId {
                    target: s.to_string(),
                    id: id.to_string(),
                })
        };

        match kind {
            "user" => Ok(Target::User(parse_id(id)?)),
            "academy" => Ok(Target::Academy(parse_id(id)?)),
            "class" => Ok(Target::Class(parse_id(id)?)),
            "role" => Role::parse(id)
                .map(Target::Role)
                .ok_or_else(|| TargetParseError::UnknownRole {
                    target: s.to_string(),
                    role: id.to_string(),
                }),
            _ => Err(TargetParseError::UnknownKind {
                target: s.to_string(),
                kind: kind.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_key_grammar() {
        assert_eq!(Target::User(8).room_key(), "user:8");
        assert_eq!(Target::Academy(5).room_key(), "academy:5");
        assert_eq!(Target::Class(20).room_key(), "class:20");
        assert_eq!(Target::Role(Role::Student).room_key(), "role:STUDENT");
    }

    #[test]
    fn test_parse_valid_targets() {
        assert_eq!("user:8".parse::<Target>(), Ok(Target::User(8)));
        assert_eq!("academy:5".parse::<Target>(), Ok(Target::Academy(5)));
        assert_eq!("class:20".parse::<Target>(), Ok(Target::Class(20)));
        assert_eq!(
            "role:PRINCIPAL".parse::<Target>(),
            Ok(Target::Role(Role::Principal))
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            "bogus".parse::<Target>(),
            Err(TargetParseError::Malformed(_))
        ));
        assert!(matches!(
            "user:".parse::<Target>(),
            Err(TargetParseError::Malformed(_))
        ));
        assert!(matches!(
            ":8".parse::<Target>(),
            Err(TargetParseError::Malformed(_))
        ));
        assert!(matches!(
            "group:8".parse::<Target>(),
            Err(TargetParseError::UnknownKind { .. })
        ));
        assert!(matches!(
            "user:eight".parse::<Target>(),
            Err(TargetParseError::NonNumericId { .. })
        ));
        assert!(matches!(
            "role:ADMIN".parse::<Target>(),
            Err(TargetParseError::UnknownRole { .. })
        ));
    }

    #[test]
    fn test_validate_requires_positive_id() {
        assert!(Target::User(1).validate().is_ok());
        assert!(Target::User(0).validate().is_err());
        assert!(Target::Academy(-5).validate().is_err());
        assert!(Target::Class(0).validate().is_err());
        // Role targets carry no numeric id.
        assert!(Target::Role(Role::Teacher).validate().is_ok());
    }

    #[test]
    fn test_display_parse_round_trip() {
        for target in [
            Target::User(8),
            Target::Academy(5),
            Target::Class(20),
            Target::Role(Role::Teacher),
        ] {
            assert_eq!(target.room_key().parse::<Target>(), Ok(target));
        }
    }
}
