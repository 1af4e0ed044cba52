//! Operator invocation records.
//!
//! An [`OperatorDef`] names an operator type, the blobs it reads and writes,
//! and its configuration as a list of named [`Argument`]s. Schemas verify
//! them, gradient makers rewrite them and the operator registry turns them
//! into runnable operators.

use crate::device::DeviceOption;
use crate::error::Error;
#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "serialization")]
use std::fs::File;
#[cfg(feature = "serialization")]
use std::io::{BufReader, BufWriter};
#[cfg(feature = "serialization")]
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum ArgValue {
    Int(i64),
    Float(f32),
    Str(String),
    Ints(Vec<i64>),
    Floats(Vec<f32>),
    Strs(Vec<String>),
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ArgValue::Int(v) => write!(f, "{}", v),
            ArgValue::Float(v) => write!(f, "{}", v),
            ArgValue::Str(v) => write!(f, "{:?}", v),
            ArgValue::Ints(v) => write!(f, "{:?}", v),
            ArgValue::Floats(v) => write!(f, "{:?}", v),
            ArgValue::Strs(v) => write!(f, "{:?}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Argument {
    pub name: String,
    pub value: ArgValue,
}

impl Argument {
    pub fn new(name: &str, value: ArgValue) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }

    pub fn int(name: &str, value: i64) -> Self {
        Self::new(name, ArgValue::Int(value))
    }

    pub fn ints(name: &str, values: &[i64]) -> Self {
        Self::new(name, ArgValue::Ints(values.to_vec()))
    }

    pub fn float(name: &str, value: f32) -> Self {
        Self::new(name, ArgValue::Float(value))
    }

    pub fn string(name: &str, value: &str) -> Self {
        Self::new(name, ArgValue::Str(value.to_string()))
    }
}

/// One operator invocation.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct OperatorDef {
    pub op_type: String,
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub args: Vec<Argument>,
    pub device_option: Option<DeviceOption>,
    pub engine: String,
    /// Set on defs produced by a gradient maker.
    pub is_gradient_op: bool,
}

impl OperatorDef {
    pub fn new(op_type: &str, inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            op_type: op_type.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Adds `arg`, replacing an existing argument of the same name.
    pub fn with_arg(mut self, arg: Argument) -> Self {
        self.set_arg(arg);
        self
    }

    pub fn with_device_option(mut self, option: DeviceOption) -> Self {
        self.device_option = Some(option);
        self
    }

    pub fn with_engine(mut self, engine: &str) -> Self {
        self.engine = engine.to_string();
        self
    }

    pub fn set_arg(&mut self, arg: Argument) {
        match self.args.iter_mut().find(|a| a.name == arg.name) {
            Some(existing) => *existing = arg,
            None => self.args.push(arg),
        }
    }

    pub fn arg(&self, name: &str) -> Option<&ArgValue> {
        self.args.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    pub fn has_arg(&self, name: &str) -> bool {
        self.arg(name).is_some()
    }

    fn wrong_kind(&self, name: &str, wanted: &str, found: &ArgValue) -> Error {
        Error::InvalidArgument {
            name: name.to_string(),
            reason: format!("{} expects an {} value, found {}", self.op_type, wanted, found),
        }
    }

    /// Integer argument `name`, `None` when absent.
    pub fn get_int(&self, name: &str) -> Result<Option<i64>, Error> {
        match self.arg(name) {
            None => Ok(None),
            Some(ArgValue::Int(v)) => Ok(Some(*v)),
            Some(other) => Err(self.wrong_kind(name, "int", other)),
        }
    }

    pub fn get_int_or(&self, name: &str, default: i64) -> Result<i64, Error> {
        Ok(self.get_int(name)?.unwrap_or(default))
    }

    pub fn get_ints(&self, name: &str) -> Result<Option<Vec<i64>>, Error> {
        match self.arg(name) {
            None => Ok(None),
            Some(ArgValue::Ints(v)) => Ok(Some(v.clone())),
            Some(other) => Err(self.wrong_kind(name, "ints", other)),
        }
    }

    pub fn get_float(&self, name: &str) -> Result<Option<f32>, Error> {
        match self.arg(name) {
            None => Ok(None),
            Some(ArgValue::Float(v)) => Ok(Some(*v)),
            Some(other) => Err(self.wrong_kind(name, "float", other)),
        }
    }

    pub fn get_string(&self, name: &str) -> Result<Option<String>, Error> {
        match self.arg(name) {
            None => Ok(None),
            Some(ArgValue::Str(v)) => Ok(Some(v.clone())),
            Some(other) => Err(self.wrong_kind(name, "string", other)),
        }
    }

    /// Name used in messages: the def's own name, else its type.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.op_type
        } else {
            &self.name
        }
    }

    #[cfg(feature = "serialization")]
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[cfg(feature = "serialization")]
    pub fn from_json(text: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(text)?)
    }

    /// Writes a list of defs as JSON.
    #[cfg(feature = "serialization")]
    pub fn save_json<P: AsRef<Path>>(defs: &[OperatorDef], path: P) -> Result<(), Error> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, defs)?;
        Ok(())
    }

    #[cfg(feature = "serialization")]
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Vec<OperatorDef>, Error> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl fmt::Display for OperatorDef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}({}) -> ({})", self.op_type, self.inputs.join(", "), self.outputs.join(", "))?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(|a| format!("{}={}", a.name, a.value)).collect();
            write!(f, " [{}]", args.join(", "))?;
        }
        if let Some(option) = &self.device_option {
            write!(f, " on {}", option)?;
        }
        Ok(())
    }
}
