//! Table of available mods, keyed by the name used in pipeline entries.

use std::collections::BTreeMap;

use super::mods::{ApplyError, ApplyFn, ModArg, ModKind};
use crate::data::GridDataset;

#[derive(Clone)]
pub struct ModSpec {
    pub apply: ApplyFn,
    pub default_args: Vec<ModArg>,
}

impl std::fmt::Debug for ModSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModSpec")
            .field("default_args", &self.default_args)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct ModRegistry {
    mods: BTreeMap<String, ModSpec>,
}

impl ModRegistry {
    /// A registry with no mods at all.
    pub fn empty() -> Self {
        Self {
            mods: BTreeMap::new(),
        }
    }

    /// Every built-in [`ModKind`].
    pub fn builtin() -> Self {
        let mut reg = Self::empty();
        for kind in ModKind::ALL {
            reg.register(kind.name(), kind.apply_fn(), kind.default_args());
        }
        reg
    }

    /// Add a mod, or replace the one registered under the same name.
    pub fn register(&mut self, name: &str, apply: ApplyFn, default_args: Vec<ModArg>) {
        if self.mods.contains_key(name) {
            log::debug!("Replacing registered mod '{}'", name);
        }
        self.mods.insert(name.to_string(), ModSpec { apply, default_args });
    }

    pub fn get(&self, name: &str) -> Option<&ModSpec> {
        self.mods.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.mods.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.mods.keys().map(String::as_str)
    }

    pub fn default_args(&self, name: &str) -> Option<&[ModArg]> {
        self.mods.get(name).map(|m| m.default_args.as_slice())
    }

    /// Run the mod registered as `name`; `None` if there is no such mod.
    pub fn apply(
        &self,
        name: &str,
        data: &GridDataset,
        args: &[ModArg],
    ) -> Option<Result<GridDataset, ApplyError>> {
        self.mods.get(name).map(|m| (m.apply)(data, args))
    }
}

impl Default for ModRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
