//! Specification registry and argument translator.
//!
//! Responsibilities:
//!
//! - own the known families and, per family, the engines implementing them
//! - create and functionally update `ModelSpecification`s, validating every
//!   step against what is registered
//! - translate generalized argument names to the bound engine's native names
//!
//! A registry is an explicit value: build one (or start from
//! `Registry::standard()`), register what you need, then share it read-only.

use log::debug;

use crate::domain::{ArgValue, Mode, ModelArg, ModelSpecification};
use crate::error::SpecError;

pub mod defs;
pub mod standard;

pub use defs::*;

#[derive(Debug, Clone)]
struct FamilyEntry {
    def: FamilyDef,
    engines: Vec<EngineDef>,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    families: Vec<FamilyEntry>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_family(&mut self, family: FamilyDef) -> Result<(), SpecError> {
        if self.entry(&family.id).is_some() {
            return Err(SpecError::DuplicateFamily(family.id));
        }
        for arg in &family.args {
            if let Some(default) = &arg.default {
                if !arg.constraint.check(default) {
                    return Err(SpecError::InvalidArgumentValue {
                        family: family.id.clone(),
                        argument: arg.name.clone(),
                        value: default.to_string(),
                        expected: arg.constraint.describe(),
                    });
                }
            }
        }
        debug!(
            "registered family `{}` ({} arguments, modes {:?})",
            family.id,
            family.args.len(),
            family.modes
        );
        self.families.push(FamilyEntry {
            def: family,
            engines: Vec::new(),
        });
        Ok(())
    }

    pub fn register_engine(&mut self, family: &str, engine: EngineDef) -> Result<(), SpecError> {
        let entry = self
            .families
            .iter_mut()
            .find(|e| e.def.id == family)
            .ok_or_else(|| SpecError::UnknownFamily(family.to_string()))?;

        if entry.engines.iter().any(|e| e.id == engine.id) {
            return Err(SpecError::DuplicateEngine {
                family: family.to_string(),
                engine: engine.id,
            });
        }
        for (general, _) in &engine.arg_map {
            if entry.def.find_arg(general).is_none() {
                return Err(SpecError::InvalidMapping {
                    family: family.to_string(),
                    engine: engine.id.clone(),
                    argument: general.clone(),
                });
            }
        }
        if let Some(mode) = engine.modes.iter().find(|m| !entry.def.supports_mode(**m)) {
            return Err(SpecError::UnsupportedMode {
                family: family.to_string(),
                mode: *mode,
            });
        }

        debug!(
            "registered engine `{}` for family `{family}` (mappings {:?})",
            engine.id, engine.arg_map
        );
        entry.engines.push(engine);
        Ok(())
    }

    fn entry(&self, family: &str) -> Option<&FamilyEntry> {
        self.families.iter().find(|e| e.def.id == family)
    }

    fn require_entry(&self, family: &str) -> Result<&FamilyEntry, SpecError> {
        self.entry(family)
            .ok_or_else(|| SpecError::UnknownFamily(family.to_string()))
    }

    pub fn family(&self, family: &str) -> Option<&FamilyDef> {
        self.entry(family).map(|e| &e.def)
    }

    /// Registered families, in registration order.
    pub fn families(&self) -> impl Iterator<Item = &FamilyDef> {
        self.families.iter().map(|e| &e.def)
    }

    pub fn engines(&self, family: &str) -> Result<&[EngineDef], SpecError> {
        Ok(&self.require_entry(family)?.engines)
    }

    pub fn engine(&self, family: &str, engine: &str) -> Result<&EngineDef, SpecError> {
        self.require_entry(family)?
            .engines
            .iter()
            .find(|e| e.id == engine)
            .ok_or_else(|| SpecError::UnknownEngine {
                family: family.to_string(),
                engine: engine.to_string(),
            })
    }

    /// `(engine, mode)` pairs for a family.
    pub fn show_engines(&self, family: &str) -> Result<Vec<(String, Mode)>, SpecError> {
        let entry = self.require_entry(family)?;
        Ok(entry
            .engines
            .iter()
            .flat_map(|e| e.modes.iter().map(|m| (e.id.clone(), *m)))
            .collect())
    }

    pub fn create_specification(&self, family: &str, mode: Mode) -> Result<ModelSpecification, SpecError> {
        let def = &self.require_entry(family)?.def;
        if !def.supports_mode(mode) {
            return Err(SpecError::UnsupportedMode {
                family: family.to_string(),
                mode,
            });
        }
        let mode = match (mode, def.modes.as_slice()) {
            (Mode::Unspecified, [only]) => *only,
            (mode, _) => mode,
        };
        Ok(ModelSpecification {
            family: def.id.clone(),
            title: def.title.clone(),
            engine: None,
            mode,
            args: Vec::new(),
        })
    }

    pub fn with_engine(&self, spec: &ModelSpecification, engine: &str) -> Result<ModelSpecification, SpecError> {
        let def = self.engine(&spec.family, engine)?;
        if !def.supports_mode(spec.mode) {
            return Err(SpecError::ModeMismatch {
                family: spec.family.clone(),
                engine: engine.to_string(),
                mode: spec.mode,
            });
        }
        let mut next = spec.clone();
        next.engine = Some(def.id.clone());
        Ok(next)
    }

    pub fn with_mode(&self, spec: &ModelSpecification, mode: Mode) -> Result<ModelSpecification, SpecError> {
        let family = &self.require_entry(&spec.family)?.def;
        if !family.supports_mode(mode) {
            return Err(SpecError::UnsupportedMode {
                family: spec.family.clone(),
                mode,
            });
        }
        if let Some(engine) = &spec.engine {
            if !self.engine(&spec.family, engine)?.supports_mode(mode) {
                return Err(SpecError::ModeMismatch {
                    family: spec.family.clone(),
                    engine: engine.clone(),
                    mode,
                });
            }
        }
        let mut next = spec.clone();
        next.mode = mode;
        Ok(next)
    }

    /// Set an argument. Names the family recognizes are validated; any other
    /// name is kept as an opaque engine-specific argument.
    pub fn with_argument(
        &self,
        spec: &ModelSpecification,
        name: &str,
        value: impl Into<ArgValue>,
    ) -> Result<ModelSpecification, SpecError> {
        let value = value.into();
        let family = &self.require_entry(&spec.family)?.def;

        let arg = match family.find_arg(name) {
            Some(main) => {
                if !main.constraint.check(&value) {
                    return Err(SpecError::InvalidArgumentValue {
                        family: spec.family.clone(),
                        argument: name.to_string(),
                        value: value.to_string(),
                        expected: main.constraint.describe(),
                    });
                }
                ModelArg::Main {
                    name: name.to_string(),
                    value,
                }
            }
            None => ModelArg::Engine {
                name: name.to_string(),
                value,
            },
        };
        Ok(spec.with_arg(arg))
    }

    /// Native `(name, value)` pairs for the bound engine.
    ///
    /// Main arguments come first, in the family's declaration order, renamed
    /// through the engine's map; engine-specific arguments follow in the
    /// order they were set.
    pub fn translate(&self, spec: &ModelSpecification) -> Result<Vec<(String, ArgValue)>, SpecError> {
        let entry = self.require_entry(&spec.family)?;
        let Some(engine_id) = &spec.engine else {
            return Err(SpecError::IncompleteSpecification {
                family: spec.family.clone(),
                missing: "no engine has been set".to_string(),
            });
        };
        let engine = self.engine(&spec.family, engine_id)?;

        let mut out = Vec::with_capacity(spec.args.len());
        for main in &entry.def.args {
            let Some(value) = spec
                .main_args()
                .find(|a| a.name() == main.name)
                .map(ModelArg::value)
            else {
                continue;
            };
            let native = engine
                .native_name(&main.name)
                .ok_or_else(|| SpecError::UnsupportedArgument {
                    family: spec.family.clone(),
                    engine: engine_id.clone(),
                    argument: main.name.clone(),
                })?;
            out.push((native.to_string(), value.clone()));
        }
        for extra in spec.engine_args() {
            out.push((extra.name().to_string(), extra.value().clone()));
        }

        debug!("translated {} for engine `{engine_id}`: {out:?}", spec.family);
        Ok(out)
    }
}
