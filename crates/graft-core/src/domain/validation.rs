use std::collections::HashSet;

use crate::domain::{
    entities::{GeneratorDescriptor, PatchKind},
    error::DomainError,
    value_objects::validate_identifier,
};

/// Centralized domain validation.
///
/// All validation logic lives here, not scattered across entities.
pub struct DomainValidator;

impl DomainValidator {
    /// Checks a descriptor before it is registered.
    pub fn validate_descriptor(descriptor: &GeneratorDescriptor) -> Result<(), DomainError> {
        let invalid = |reason: String| DomainError::InvalidIdentifier {
            kind: "generator",
            value: descriptor.id.to_string(),
            reason,
        };

        let mut names = HashSet::new();
        for flag in &descriptor.flags {
            validate_identifier("flag name", &flag.name)?;
            if flag.name.starts_with("no-") {
                return Err(invalid(format!(
                    "flag '{}' collides with the negated form of '{}'",
                    flag.name,
                    &flag.name[3..]
                )));
            }
            if !names.insert(flag.name.as_str()) {
                return Err(invalid(format!("flag '{}' is declared twice", flag.name)));
            }
            if let Some(default) = &flag.default {
                if default.flag_type() != flag.flag_type {
                    return Err(invalid(format!(
                        "default of flag '{}' is a {}, expected a {}",
                        flag.name,
                        default.flag_type(),
                        flag.flag_type
                    )));
                }
            }
        }

        if descriptor.composes.contains(&descriptor.id) {
            return Err(invalid("a generator cannot compose itself".into()));
        }
        Ok(())
    }

    /// Checks an operation a generator returned.
    pub fn validate_patch(kind: &PatchKind) -> Result<(), DomainError> {
        match kind {
            PatchKind::EnsureConfigValue { key_path, .. } | PatchKind::ListInsert { key_path, .. }
                if key_path.is_empty() =>
            {
                Err(DomainError::InvalidKeyPath(key_path.to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::FlagSpec;
    use crate::domain::value_objects::{FlagValue, GeneratorId};

    fn descriptor() -> GeneratorDescriptor {
        GeneratorDescriptor::new(GeneratorId::new("gen").unwrap())
    }

    #[test]
    fn accepts_well_formed_descriptor() {
        let d = descriptor()
            .flag(FlagSpec::string("file"))
            .flag(FlagSpec::boolean("force").default_value(FlagValue::Boolean(false)));
        assert!(DomainValidator::validate_descriptor(&d).is_ok());
    }

    #[test]
    fn rejects_duplicate_and_dotted_flags() {
        let dup = descriptor().flag(FlagSpec::string("a")).flag(FlagSpec::list("a"));
        assert!(DomainValidator::validate_descriptor(&dup).is_err());

        let dotted = descriptor().flag(FlagSpec::string("g.a"));
        assert!(DomainValidator::validate_descriptor(&dotted).is_err());

        let negated = descriptor().flag(FlagSpec::boolean("no-color"));
        assert!(DomainValidator::validate_descriptor(&negated).is_err());
    }

    #[test]
    fn rejects_mistyped_default_and_self_composition() {
        let mistyped = descriptor().flag(FlagSpec::string("n").default_value(FlagValue::Integer(1)));
        assert!(DomainValidator::validate_descriptor(&mistyped).is_err());

        let d = descriptor();
        let looping = d.clone().composes(d.id.clone());
        assert!(DomainValidator::validate_descriptor(&looping).is_err());
    }
}
