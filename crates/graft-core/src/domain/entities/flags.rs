//! Flag declarations and the shared namespace of one composed run.
//!
//! Every participating generator declares flags. Resolution happens once per
//! run over all participants:
//!
//! - one owning group, one type: the bare `--name` reaches every owner;
//! - otherwise the bare name is withdrawn and each group gets `--group.name`
//!   (members of a group whose types disagree get `--generator.name`).
//!
//! A withdrawn bare name is reported as a [`FlagAmbiguity`]; binding only
//! fails when the command line actually uses it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::value_objects::{FlagType, FlagValue, GeneratorId, Group};

use super::generator::GeneratorDescriptor;

/// One flag a generator accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub flag_type: FlagType,
    #[serde(default)]
    pub default: Option<FlagValue>,
    /// Owning group; defaults to the generator's group.
    #[serde(default)]
    pub group: Option<Group>,
    #[serde(default)]
    pub help: String,
}

impl FlagSpec {
    pub fn new(name: impl Into<String>, flag_type: FlagType) -> Self {
        Self {
            name: name.into(),
            flag_type,
            default: None,
            group: None,
            help: String::new(),
        }
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FlagType::Boolean)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FlagType::String)
    }

    pub fn list(name: impl Into<String>) -> Self {
        Self::new(name, FlagType::List)
    }

    pub fn default_value(mut self, value: FlagValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn group(mut self, group: Group) -> Self {
        self.group = Some(group);
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }
}

/// A generator declaring an ambiguous flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagOwner {
    pub generator: GeneratorId,
    pub group: Group,
    pub flag_type: FlagType,
}

/// A bare flag name declared by owners that cannot share it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagAmbiguity {
    pub flag: String,
    pub owners: Vec<FlagOwner>,
    /// Qualified names that replace the bare one.
    pub required: Vec<String>,
}

impl fmt::Display for FlagAmbiguity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let owners: Vec<String> = self
            .owners
            .iter()
            .map(|o| format!("{} (group {}, {})", o.generator, o.group, o.flag_type))
            .collect();
        let required: Vec<String> = self.required.iter().map(|r| format!("--{r}")).collect();
        write!(
            f,
            "flag '--{}' is declared by {}; use {}",
            self.flag,
            owners.join(", "),
            required.join(" or ")
        )
    }
}

/// Every ambiguity of a namespace, one per bare flag name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AmbiguousFlagReport {
    pub ambiguities: Vec<FlagAmbiguity>,
}

impl AmbiguousFlagReport {
    pub fn is_empty(&self) -> bool {
        self.ambiguities.is_empty()
    }
}

impl fmt::Display for AmbiguousFlagReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ambiguous flags ({}):", self.ambiguities.len())?;
        for ambiguity in &self.ambiguities {
            write!(f, "\n  {ambiguity}")?;
        }
        Ok(())
    }
}

/// A generator reached by an accepted flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagTarget {
    pub generator: GeneratorId,
    pub default: Option<FlagValue>,
}

/// A flag form accepted on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptedFlag {
    /// Form typed by the user, e.g. `option` or `docs.option`.
    pub accepted: String,
    /// Name the generators declared.
    pub flag: String,
    pub flag_type: FlagType,
    pub help: String,
    pub targets: Vec<FlagTarget>,
}

/// Resolved flag names for a set of participating generators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlagNamespace {
    accepted: BTreeMap<String, AcceptedFlag>,
    ambiguous: BTreeMap<String, FlagAmbiguity>,
}

struct Declaration<'a> {
    generator: &'a GeneratorId,
    group: Group,
    spec: &'a FlagSpec,
}

impl FlagNamespace {
    /// Resolve over `participants`. Repeated descriptors count once.
    pub fn resolve<'a>(participants: impl IntoIterator<Item = &'a GeneratorDescriptor>) -> Self {
        let mut seen = BTreeSet::new();
        let mut by_name: BTreeMap<&str, Vec<Declaration<'a>>> = BTreeMap::new();
        for descriptor in participants {
            if !seen.insert(&descriptor.id) {
                continue;
            }
            for spec in &descriptor.flags {
                by_name.entry(spec.name.as_str()).or_default().push(Declaration {
                    generator: &descriptor.id,
                    group: spec.group.clone().unwrap_or_else(|| descriptor.group.clone()),
                    spec,
                });
            }
        }

        let mut namespace = Self::default();
        for (name, declarations) in by_name {
            let groups: BTreeMap<&Group, Vec<&Declaration<'_>>> =
                declarations.iter().fold(BTreeMap::new(), |mut acc, d| {
                    acc.entry(&d.group).or_insert_with(Vec::new).push(d);
                    acc
                });

            if groups.len() == 1 && same_type(&declarations) {
                namespace.accept(name.to_string(), declarations.iter());
                continue;
            }

            let mut required = Vec::new();
            for (group, members) in groups {
                if same_type(members.iter().copied()) {
                    let qualified = format!("{group}.{name}");
                    namespace.accept(qualified.clone(), members.iter().copied());
                    required.push(qualified);
                } else {
                    for member in members {
                        let qualified = format!("{}.{name}", member.generator);
                        namespace.accept(qualified.clone(), std::iter::once(member));
                        required.push(qualified);
                    }
                }
            }
            namespace.ambiguous.insert(
                name.to_string(),
                FlagAmbiguity {
                    flag: name.to_string(),
                    owners: declarations
                        .iter()
                        .map(|d| FlagOwner {
                            generator: d.generator.clone(),
                            group: d.group.clone(),
                            flag_type: d.spec.flag_type,
                        })
                        .collect(),
                    required,
                },
            );
        }
        namespace
    }

    fn accept<'d, 'a: 'd>(&mut self, accepted: String, members: impl IntoIterator<Item = &'d Declaration<'a>>) {
        for member in members {
            let entry = self
                .accepted
                .entry(accepted.clone())
                .or_insert_with(|| AcceptedFlag {
                    accepted: accepted.clone(),
                    flag: member.spec.name.clone(),
                    flag_type: member.spec.flag_type,
                    help: member.spec.help.clone(),
                    targets: Vec::new(),
                });
            if entry.help.is_empty() {
                entry.help = member.spec.help.clone();
            }
            entry.targets.push(FlagTarget {
                generator: member.generator.clone(),
                default: member.spec.default.clone(),
            });
        }
    }

    pub fn accepted(&self) -> impl Iterator<Item = &AcceptedFlag> {
        self.accepted.values()
    }

    pub fn get(&self, accepted: &str) -> Option<&AcceptedFlag> {
        self.accepted.get(accepted)
    }

    pub fn report(&self) -> AmbiguousFlagReport {
        AmbiguousFlagReport {
            ambiguities: self.ambiguous.values().cloned().collect(),
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        !self.ambiguous.is_empty()
    }

    /// The namespace itself, or every ambiguity it holds.
    pub fn into_result(self) -> Result<Self, DomainError> {
        if self.is_ambiguous() {
            Err(DomainError::AmbiguousFlags(self.report()))
        } else {
            Ok(self)
        }
    }

    /// Bind raw command-line arguments against the namespace.
    ///
    /// Accepts `--name value`, `--name=value`, `--flag`/`--no-flag` for
    /// booleans, repeated occurrences for lists, and everything after `--`
    /// as positional.
    pub fn bind(&self, raw: &[String]) -> Result<BoundArgs, DomainError> {
        let mut bound = BoundArgs::default();
        let mut used_ambiguous = BTreeSet::new();
        let mut args = raw.iter();

        while let Some(arg) = args.next() {
            if arg == "--" {
                bound.positional.extend(args.by_ref().cloned());
                break;
            }
            let Some(body) = arg.strip_prefix("--") else {
                bound.positional.push(arg.clone());
                continue;
            };
            let (name, inline) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (body, None),
            };

            let negated = name
                .strip_prefix("no-")
                .filter(|n| self.get(n).is_some_and(|f| f.flag_type == FlagType::Boolean));
            if let Some(flag) = negated {
                if inline.is_some() {
                    return Err(DomainError::InvalidFlagValue {
                        flag: name.to_string(),
                        expected: "no value".into(),
                        got: inline.unwrap_or_default().to_string(),
                    });
                }
                bound.values.insert(flag.to_string(), FlagValue::Boolean(false));
                continue;
            }

            let Some(flag) = self.get(name) else {
                let bare = name.strip_prefix("no-").unwrap_or(name);
                if self.ambiguous.contains_key(name) || self.ambiguous.contains_key(bare) {
                    used_ambiguous.insert(if self.ambiguous.contains_key(name) { name } else { bare });
                    if inline.is_none() && args.as_slice().first().is_some_and(|a| !a.starts_with("--")) {
                        args.next();
                    }
                    continue;
                }
                return Err(DomainError::UnknownFlag {
                    flag: name.to_string(),
                });
            };

            let value = match flag.flag_type {
                FlagType::Boolean => match inline {
                    None => FlagValue::Boolean(true),
                    Some(text) => FlagValue::Boolean(parse_bool(text).ok_or_else(|| {
                        DomainError::InvalidFlagValue {
                            flag: name.to_string(),
                            expected: "true or false".into(),
                            got: text.to_string(),
                        }
                    })?),
                },
                other => {
                    let text = match inline {
                        Some(text) => text.to_string(),
                        None => args.next().cloned().ok_or_else(|| DomainError::MissingFlagValue {
                            flag: name.to_string(),
                        })?,
                    };
                    match other {
                        FlagType::Integer => FlagValue::Integer(text.parse().map_err(|_| {
                            DomainError::InvalidFlagValue {
                                flag: name.to_string(),
                                expected: "an integer".into(),
                                got: text.clone(),
                            }
                        })?),
                        FlagType::List => {
                            let mut items = match bound.values.remove(name) {
                                Some(FlagValue::List(items)) => items,
                                _ => Vec::new(),
                            };
                            items.push(text);
                            FlagValue::List(items)
                        }
                        _ => FlagValue::String(text),
                    }
                }
            };
            bound.values.insert(name.to_string(), value);
        }

        if used_ambiguous.is_empty() {
            return Ok(bound);
        }
        Err(DomainError::AmbiguousFlags(AmbiguousFlagReport {
            ambiguities: used_ambiguous
                .into_iter()
                .filter_map(|name| self.ambiguous.get(name).cloned())
                .collect(),
        }))
    }

    /// Arguments one generator sees: its flags under their declared names,
    /// with defaults for anything unset.
    pub fn args_for(&self, bound: &BoundArgs, generator: &GeneratorId) -> GeneratorArgs {
        let mut args = GeneratorArgs {
            positional: bound.positional.clone(),
            flags: BTreeMap::new(),
        };
        for flag in self.accepted.values() {
            let Some(target) = flag.targets.iter().find(|t| &t.generator == generator) else {
                continue;
            };
            let value = bound
                .values
                .get(&flag.accepted)
                .cloned()
                .or_else(|| target.default.clone());
            if let Some(value) = value {
                args.flags.insert(flag.flag.clone(), value);
            }
        }
        args
    }
}

fn same_type<'d, 'a: 'd>(declarations: impl IntoIterator<Item = &'d Declaration<'a>>) -> bool {
    let mut types = declarations.into_iter().map(|d| d.spec.flag_type);
    let first = types.next();
    types.all(|t| Some(t) == first)
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Command-line values keyed by accepted flag form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundArgs {
    pub positional: Vec<String>,
    pub values: BTreeMap<String, FlagValue>,
}

/// Arguments handed to [`Generator::run`](super::generator::Generator::run).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeneratorArgs {
    positional: Vec<String>,
    flags: BTreeMap<String, FlagValue>,
}

impl GeneratorArgs {
    pub fn new(positional: Vec<String>, flags: BTreeMap<String, FlagValue>) -> Self {
        Self { positional, flags }
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    pub fn get(&self, name: &str) -> Option<&FlagValue> {
        self.flags.get(name)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        match self.flags.get(name)? {
            FlagValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> bool {
        matches!(self.flags.get(name), Some(FlagValue::Boolean(true)))
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.flags.get(name)? {
            FlagValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn list(&self, name: &str) -> &[String] {
        match self.flags.get(name) {
            Some(FlagValue::List(items)) => items,
            _ => &[],
        }
    }

    pub fn flags(&self) -> impl Iterator<Item = (&str, &FlagValue)> {
        self.flags.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// String value of a required flag.
    pub fn require(&self, generator: &GeneratorId, name: &str) -> Result<&str, DomainError> {
        self.string(name).ok_or_else(|| DomainError::GeneratorFailed {
            generator: generator.to_string(),
            reason: format!("missing required flag '--{name}'"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> GeneratorId {
        GeneratorId::new(s).unwrap()
    }

    fn group(s: &str) -> Group {
        Group::new(s).unwrap()
    }

    fn descriptor(name: &str, grp: &str, flags: Vec<FlagSpec>) -> GeneratorDescriptor {
        let mut d = GeneratorDescriptor::new(id(name)).in_group(group(grp));
        for flag in flags {
            d = d.flag(flag);
        }
        d
    }

    fn raw(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn same_group_shares_bare_flag() {
        let a = descriptor("gen1", "g1", vec![FlagSpec::string("option")]);
        let b = descriptor("gen2", "g1", vec![FlagSpec::string("option")]);
        let ns = FlagNamespace::resolve([&a, &b]).into_result().unwrap();

        let bound = ns.bind(&raw(&["--option", "x"])).unwrap();
        assert_eq!(ns.args_for(&bound, &a.id).string("option"), Some("x"));
        assert_eq!(ns.args_for(&bound, &b.id).string("option"), Some("x"));
    }

    #[test]
    fn different_groups_are_qualified() {
        let a = descriptor("gen1", "g1", vec![FlagSpec::string("option")]);
        let b = descriptor("gen2", "g2", vec![FlagSpec::string("option")]);
        let ns = FlagNamespace::resolve([&a, &b]);

        let report = ns.report();
        assert_eq!(report.ambiguities.len(), 1);
        assert_eq!(report.ambiguities[0].required, vec!["g1.option", "g2.option"]);
        assert!(ns.clone().into_result().is_err());

        let bound = ns.bind(&raw(&["--g1.option=x", "--g2.option", "y"])).unwrap();
        assert_eq!(ns.args_for(&bound, &a.id).string("option"), Some("x"));
        assert_eq!(ns.args_for(&bound, &b.id).string("option"), Some("y"));
    }

    #[test]
    fn using_ambiguous_bare_flag_fails_binding() {
        let a = descriptor("gen1", "g1", vec![FlagSpec::string("option")]);
        let b = descriptor("gen2", "g2", vec![FlagSpec::string("option")]);
        let ns = FlagNamespace::resolve([&a, &b]);

        let err = ns.bind(&raw(&["--option", "x"])).unwrap_err();
        let DomainError::AmbiguousFlags(report) = err else {
            panic!("expected ambiguity, got {err:?}");
        };
        assert_eq!(report.ambiguities.len(), 1);
        assert_eq!(report.ambiguities[0].owners.len(), 2);
    }

    #[test]
    fn group_members_share_qualified_flag() {
        let a = descriptor("gen1", "g1", vec![FlagSpec::string("option")]);
        let b = descriptor("gen2", "g1", vec![FlagSpec::string("option")]);
        let c = descriptor("gen3", "g2", vec![FlagSpec::string("option")]);
        let ns = FlagNamespace::resolve([&a, &b, &c]);

        let bound = ns.bind(&raw(&["--g1.option", "shared"])).unwrap();
        assert_eq!(ns.args_for(&bound, &a.id).string("option"), Some("shared"));
        assert_eq!(ns.args_for(&bound, &b.id).string("option"), Some("shared"));
        assert_eq!(ns.args_for(&bound, &c.id).string("option"), None);
    }

    #[test]
    fn type_mismatch_in_one_group_qualifies_by_generator() {
        let a = descriptor("gen1", "g1", vec![FlagSpec::string("level")]);
        let b = descriptor("gen2", "g1", vec![FlagSpec::new("level", FlagType::Integer)]);
        let ns = FlagNamespace::resolve([&a, &b]);

        assert_eq!(ns.report().ambiguities[0].required, vec!["gen1.level", "gen2.level"]);
        let bound = ns.bind(&raw(&["--gen2.level", "3"])).unwrap();
        assert_eq!(ns.args_for(&bound, &b.id).integer("level"), Some(3));
    }

    #[test]
    fn duplicate_participants_count_once() {
        let a = descriptor("gen1", "g1", vec![FlagSpec::string("option")]);
        let ns = FlagNamespace::resolve([&a, &a]);
        assert!(!ns.is_ambiguous());
        assert_eq!(ns.get("option").unwrap().targets.len(), 1);
    }

    #[test]
    fn explicit_flag_group_overrides_generator_group() {
        let a = descriptor("gen1", "g1", vec![FlagSpec::string("file").group(group("shared"))]);
        let b = descriptor("gen2", "g2", vec![FlagSpec::string("file").group(group("shared"))]);
        let ns = FlagNamespace::resolve([&a, &b]);
        assert!(!ns.is_ambiguous());
    }

    #[test]
    fn booleans_lists_defaults_and_positionals() {
        let a = descriptor(
            "gen1",
            "g1",
            vec![
                FlagSpec::boolean("force"),
                FlagSpec::boolean("color").default_value(FlagValue::Boolean(true)),
                FlagSpec::list("tag"),
                FlagSpec::string("mode").default_value(FlagValue::String("fast".into())),
            ],
        );
        let ns = FlagNamespace::resolve([&a]);
        let bound = ns
            .bind(&raw(&["name", "--force", "--no-color", "--tag", "a", "--tag=b", "--", "--x"]))
            .unwrap();
        let args = ns.args_for(&bound, &a.id);

        assert_eq!(args.positional(), ["name", "--x"]);
        assert!(args.boolean("force"));
        assert!(!args.boolean("color"));
        assert_eq!(args.list("tag"), ["a", "b"]);
        assert_eq!(args.string("mode"), Some("fast"));
    }

    #[test]
    fn binding_errors() {
        let a = descriptor(
            "gen1",
            "g1",
            vec![FlagSpec::string("name"), FlagSpec::new("count", FlagType::Integer)],
        );
        let ns = FlagNamespace::resolve([&a]);
        assert!(matches!(ns.bind(&raw(&["--nope"])), Err(DomainError::UnknownFlag { .. })));
        assert!(matches!(ns.bind(&raw(&["--name"])), Err(DomainError::MissingFlagValue { .. })));
        assert!(matches!(
            ns.bind(&raw(&["--count", "many"])),
            Err(DomainError::InvalidFlagValue { .. })
        ));
    }
}
