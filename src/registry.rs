use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

/// Subjects checked when a class has no profile on record.
pub const DEFAULT_SUBJECTS: [&str; 6] = [
    "Алгебра",
    "Геометрия",
    "Физика",
    "Информатика",
    "Вероятность и статистика",
    "Труд (технология)",
];

/// Read-only lookup of a class's profile subjects. Implementations must be safe to share
/// between concurrent analyses.
pub trait ProfileRegistry: Send + Sync {
    fn profile_subjects(&self, class_name: &str) -> BTreeSet<String>;
}

#[derive(Debug, Clone, Default)]
pub struct ProfileSnapshot {
    profiles: BTreeMap<String, BTreeSet<String>>,
}

impl ProfileSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class_name: &str, subject: &str) {
        self.profiles
            .entry(class_name.trim().to_string())
            .or_default()
            .insert(subject.trim().to_string());
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }
}

impl<C: AsRef<str>, S: AsRef<str>> FromIterator<(C, S)> for ProfileSnapshot {
    fn from_iter<I: IntoIterator<Item = (C, S)>>(iter: I) -> Self {
        let mut snapshot = ProfileSnapshot::new();
        for (class_name, subject) in iter {
            snapshot.insert(class_name.as_ref(), subject.as_ref());
        }
        snapshot
    }
}

impl ProfileRegistry for ProfileSnapshot {
    fn profile_subjects(&self, class_name: &str) -> BTreeSet<String> {
        self.profiles
            .get(class_name.trim())
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectSource {
    Profile(String),
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectsOfInterest {
    subjects: BTreeSet<String>,
    source: SubjectSource,
}

impl SubjectsOfInterest {
    pub fn new<I, S>(subjects: I, source: SubjectSource) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subjects: subjects.into_iter().map(Into::into).collect(),
            source,
        }
    }

    pub fn contains(&self, subject: &str) -> bool {
        self.subjects.contains(subject)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.subjects.iter().map(String::as_str)
    }

    pub fn source(&self) -> &SubjectSource {
        &self.source
    }
}

pub fn resolve_subjects(
    registry: &dyn ProfileRegistry,
    class_name: Option<&str>,
    defaults: &[String],
) -> SubjectsOfInterest {
    if let Some(class_name) = class_name.map(str::trim).filter(|name| !name.is_empty()) {
        let subjects = registry.profile_subjects(class_name);
        if !subjects.is_empty() {
            info!(class = class_name, count = subjects.len(), "using profile subjects");
            return SubjectsOfInterest::new(subjects, SubjectSource::Profile(class_name.to_string()));
        }
        info!(class = class_name, "no profile for class, using default subjects");
    }
    SubjectsOfInterest::new(defaults.iter().cloned(), SubjectSource::Default)
}

pub fn default_subjects() -> Vec<String> {
    DEFAULT_SUBJECTS.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_registry() -> ProfileSnapshot {
        [("10А", "Алгебра"), ("10А", "Химия"), ("11Б", "История")]
            .into_iter()
            .collect()
    }

    #[test]
    fn class_with_profile_uses_it() {
        let subjects = resolve_subjects(&sample_registry(), Some("10А"), &default_subjects());
        assert_eq!(subjects.iter().collect::<Vec<_>>(), vec!["Алгебра", "Химия"]);
        assert_eq!(subjects.source(), &SubjectSource::Profile("10А".to_string()));
        assert!(!subjects.contains("Физика"));
    }

    #[test]
    fn unknown_or_missing_class_falls_back_to_defaults() {
        let registry = sample_registry();
        for class_name in [Some("9В"), Some("  "), None] {
            let subjects = resolve_subjects(&registry, class_name, &default_subjects());
            assert_eq!(subjects.source(), &SubjectSource::Default);
            assert!(subjects.contains("Труд (технология)"));
            assert_eq!(subjects.iter().count(), DEFAULT_SUBJECTS.len());
        }
    }

    #[test]
    fn snapshot_trims_names() {
        let mut snapshot = ProfileSnapshot::new();
        snapshot.insert(" 10А ", " Физика ");
        assert!(snapshot.profile_subjects("10А").contains("Физика"));
        assert_eq!(snapshot.len(), 1);
    }
}
