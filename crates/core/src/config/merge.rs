//! Layered configuration merging.
//!
//! Fragments are merged with "defaults" semantics: the first layer that
//! defines a key keeps it, later layers only fill keys that are still unset.
//! Objects merge key by key; scalars, arrays and `null` are taken whole.

use serde_json::{Map, Value};

use crate::config::ConfigFragment;

/// Precedence tier a fragment belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentTier {
    /// The environment fragment, merged at the root
    Environment,
    /// The application fragment, merged at the root
    App,
    /// Every other fragment, nested under its normalised name
    Named,
}

/// Naming rules used to classify fragments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentNaming {
    pub suffix: Option<String>,
    pub env_name: String,
    pub app_name: String,
}

impl FragmentNaming {
    pub fn new(
        suffix: Option<String>,
        env_name: impl Into<String>,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            suffix: suffix.filter(|s| !s.is_empty()),
            env_name: env_name.into(),
            app_name: app_name.into(),
        }
    }

    /// Strip the conventional suffix from a fragment name
    pub fn normalize<'a>(&self, name: &'a str) -> &'a str {
        match self.suffix.as_deref() {
            Some(suffix) => name.strip_suffix(suffix).unwrap_or(name),
            None => name,
        }
    }

    /// Classify an already normalised fragment name
    pub fn classify(&self, key: &str) -> FragmentTier {
        if key == self.env_name {
            FragmentTier::Environment
        } else if key == self.app_name {
            FragmentTier::App
        } else {
            FragmentTier::Named
        }
    }
}

/// Merges named fragments into a single resolved tree
#[derive(Debug, Clone)]
pub struct ConfigMerger {
    naming: FragmentNaming,
}

impl ConfigMerger {
    pub fn new(naming: FragmentNaming) -> Self {
        Self { naming }
    }

    pub fn naming(&self) -> &FragmentNaming {
        &self.naming
    }

    /// Resolve `base` and `fragments` into one tree.
    ///
    /// Precedence, highest first: `base`, the environment fragment, the app
    /// fragment, then all other fragments. Fragments are visited in lexical
    /// order of their original names; within a tier a later fragment with
    /// the same normalised name replaces an earlier one.
    pub fn merge<I>(&self, base: &Value, fragments: I) -> Value
    where
        I: IntoIterator<Item = ConfigFragment>,
    {
        let mut fragments: Vec<ConfigFragment> = fragments.into_iter().collect();
        fragments.sort_by(|a, b| a.name.cmp(&b.name));

        let mut env = Value::Object(Map::new());
        let mut app = Value::Object(Map::new());
        let mut named = Map::new();

        for fragment in fragments {
            let key = self.naming.normalize(&fragment.name).to_string();
            match self.naming.classify(&key) {
                FragmentTier::Environment => env = fragment.value,
                FragmentTier::App => app = fragment.value,
                FragmentTier::Named => {
                    named.insert(key, fragment.value);
                }
            }
        }

        tracing::debug!(named_fragments = named.len(), "Merging configuration fragments");

        let named = Value::Object(named);
        let mut resolved = Value::Object(Map::new());
        for layer in [base, &env, &app, &named] {
            defaults_deep(&mut resolved, layer);
        }
        resolved
    }
}

/// Fill keys of `target` that `source` defines and `target` does not.
///
/// Nothing happens unless both sides are objects.
pub fn defaults_deep(target: &mut Value, source: &Value) {
    let (Value::Object(target), Value::Object(source)) = (target, source) else {
        return;
    };

    for (key, value) in source {
        match target.get_mut(key) {
            Some(existing) => defaults_deep(existing, value),
            None => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}
