//! Family and engine definitions.
//!
//! Both are plain values assembled with small builders and then handed to the
//! `Registry`, which owns them read-only for the rest of its life.

use std::fmt;
use std::sync::Arc;

use crate::domain::{ArgValue, Constraint, Mode, PredictionType};
use crate::engines::ModelEngine;

/// A generalized (family-level) argument.
#[derive(Debug, Clone, PartialEq)]
pub struct MainArg {
    pub name: String,
    pub default: Option<ArgValue>,
    pub constraint: Constraint,
}

impl MainArg {
    pub fn new(name: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            name: name.into(),
            default: None,
            constraint,
        }
    }

    pub fn with_default(mut self, value: impl Into<ArgValue>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// A modeling approach, independent of any implementation.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyDef {
    pub id: String,
    /// Human title used when printing specifications, e.g. "Linear Regression".
    pub title: String,
    /// Recognized generalized arguments, in translation order.
    pub args: Vec<MainArg>,
    pub modes: Vec<Mode>,
}

impl FamilyDef {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            args: Vec::new(),
            modes: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: MainArg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn modes(mut self, modes: &[Mode]) -> Self {
        self.modes = modes.iter().copied().filter(|m| *m != Mode::Unspecified).collect();
        self
    }

    pub fn find_arg(&self, name: &str) -> Option<&MainArg> {
        self.args.iter().find(|a| a.name == name)
    }

    pub fn supports_mode(&self, mode: Mode) -> bool {
        mode == Mode::Unspecified || self.modes.contains(&mode)
    }
}

/// How an engine prefers to receive data. Only affects how its call is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interface {
    Formula,
    Matrix,
}

/// Data arguments of an engine's native call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSlot {
    Formula,
    Data,
    X,
    Y,
}

impl DataSlot {
    fn default_name(self) -> &'static str {
        match self {
            DataSlot::Formula => "formula",
            DataSlot::Data => "data",
            DataSlot::X => "x",
            DataSlot::Y => "y",
        }
    }
}

/// A concrete implementation of a family.
#[derive(Clone)]
pub struct EngineDef {
    pub(crate) id: String,
    pub(crate) entry: Arc<dyn ModelEngine>,
    pub(crate) arg_map: Vec<(String, String)>,
    pub(crate) modes: Vec<Mode>,
    pub(crate) predictions: Vec<(Mode, PredictionType)>,
    pub(crate) extra_args: Vec<String>,
    pub(crate) interface: Interface,
    pub(crate) data_args: Vec<(DataSlot, String)>,
}

impl EngineDef {
    pub fn new(id: impl Into<String>, entry: impl ModelEngine + 'static) -> Self {
        Self::from_arc(id, Arc::new(entry))
    }

    pub fn from_arc(id: impl Into<String>, entry: Arc<dyn ModelEngine>) -> Self {
        Self {
            id: id.into(),
            entry,
            arg_map: Vec::new(),
            modes: Vec::new(),
            predictions: Vec::new(),
            extra_args: Vec::new(),
            interface: Interface::Formula,
            data_args: Vec::new(),
        }
    }

    /// Map a generalized argument to this engine's native name.
    pub fn map_arg(mut self, general: impl Into<String>, native: impl Into<String>) -> Self {
        let general = general.into();
        let native = native.into();
        match self.arg_map.iter_mut().find(|(g, _)| *g == general) {
            Some(slot) => slot.1 = native,
            None => self.arg_map.push((general, native)),
        }
        self
    }

    pub fn modes(mut self, modes: &[Mode]) -> Self {
        self.modes = modes.iter().copied().filter(|m| *m != Mode::Unspecified).collect();
        self
    }

    /// Declare a supported prediction type. Without any declaration an engine
    /// supports point predictions in each of its modes.
    pub fn predicts(mut self, mode: Mode, kind: PredictionType) -> Self {
        if !self.predictions.contains(&(mode, kind)) {
            self.predictions.push((mode, kind));
        }
        self
    }

    /// Document a native argument that has no generalized name.
    pub fn extra_arg(mut self, name: impl Into<String>) -> Self {
        self.extra_args.push(name.into());
        self
    }

    pub fn interface(mut self, interface: Interface) -> Self {
        self.interface = interface;
        self
    }

    /// Rename one of the engine's data arguments.
    pub fn data_arg(mut self, slot: DataSlot, native: impl Into<String>) -> Self {
        let native = native.into();
        match self.data_args.iter_mut().find(|(s, _)| *s == slot) {
            Some(entry) => entry.1 = native,
            None => self.data_args.push((slot, native)),
        }
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn entry(&self) -> &Arc<dyn ModelEngine> {
        &self.entry
    }

    pub fn arg_map(&self) -> &[(String, String)] {
        &self.arg_map
    }

    pub fn native_name(&self, general: &str) -> Option<&str> {
        self.arg_map
            .iter()
            .find(|(g, _)| g == general)
            .map(|(_, n)| n.as_str())
    }

    pub fn supported_modes(&self) -> &[Mode] {
        &self.modes
    }

    pub fn supports_mode(&self, mode: Mode) -> bool {
        mode == Mode::Unspecified || self.modes.contains(&mode)
    }

    pub fn supports_prediction(&self, mode: Mode, kind: PredictionType) -> bool {
        if !self.modes.contains(&mode) {
            return false;
        }
        if self.predictions.is_empty() {
            return kind == PredictionType::Point;
        }
        self.predictions.contains(&(mode, kind))
    }

    pub fn extra_args(&self) -> &[String] {
        &self.extra_args
    }

    pub fn get_interface(&self) -> Interface {
        self.interface
    }

    pub fn data_arg_name(&self, slot: DataSlot) -> &str {
        self.data_args
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, n)| n.as_str())
            .unwrap_or(slot.default_name())
    }
}

impl fmt::Debug for EngineDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineDef")
            .field("id", &self.id)
            .field("arg_map", &self.arg_map)
            .field("modes", &self.modes)
            .field("predictions", &self.predictions)
            .field("interface", &self.interface)
            .finish()
    }
}
