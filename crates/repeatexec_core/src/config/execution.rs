use std::collections::HashMap;
use std::sync::LazyLock;

use repeatexec_error::{DbError, Result};
use serde::{Deserialize, Deserializer, Serialize};

use crate::arrays::scalar::{BorrowedScalarValue, ScalarValue};

pub const DEFAULT_BATCH_SIZE: usize = 2048;

/// Configuration used when executing operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Target batch size.
    ///
    /// Determines the capacity of batches pulled from children and produced by
    /// operators. Never zero.
    #[serde(deserialize_with = "deserialize_batch_size")]
    pub batch_size: usize,
    /// Max bytes a single batch's arena may hold.
    ///
    /// None means no limit beyond what the system allocator provides.
    pub arena_limit: Option<usize>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            batch_size: DEFAULT_BATCH_SIZE,
            arena_limit: None,
        }
    }
}

fn deserialize_batch_size<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let val = usize::deserialize(deserializer)?;
    if val == 0 {
        return Err(serde::de::Error::custom("Batch size must be greater than zero"));
    }
    Ok(val)
}

impl ExecutionConfig {
    pub fn set_from_scalar(&mut self, name: &str, value: BorrowedScalarValue) -> Result<()> {
        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| DbError::new(format!("Missing setting for '{name}'")))?;

        (func.set)(value, self)
    }

    pub fn get_as_scalar(&self, name: &str) -> Result<ScalarValue> {
        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| DbError::new(format!("Missing setting for '{name}'")))?;

        Ok((func.get)(self))
    }

    /// Reset a single setting to its default value.
    pub fn reset(&mut self, name: &str) -> Result<()> {
        let def_conf = Self::default();
        let scalar = def_conf.get_as_scalar(name)?;
        self.set_from_scalar(name, scalar)
    }
}

struct SettingFunctions {
    set: fn(scalar: BorrowedScalarValue, conf: &mut ExecutionConfig) -> Result<()>,
    get: fn(conf: &ExecutionConfig) -> ScalarValue,
}

impl SettingFunctions {
    const fn new<S: ExecutionSetting>() -> Self {
        SettingFunctions {
            set: S::set_from_scalar as _,
            get: S::get_as_scalar as _,
        }
    }
}

fn insert_setting<S: ExecutionSetting>(map: &mut HashMap<&'static str, SettingFunctions>) {
    if map.insert(S::NAME, SettingFunctions::new::<S>()).is_some() {
        panic!("Duplicate settings names: {}", S::NAME);
    }
}

static GET_SET_FUNCTIONS: LazyLock<HashMap<&'static str, SettingFunctions>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    insert_setting::<BatchSize>(&mut map);
    insert_setting::<ArenaLimit>(&mut map);

    map
});

pub trait ExecutionSetting: Sync + Send + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn set_from_scalar(scalar: BorrowedScalarValue, conf: &mut ExecutionConfig) -> Result<()>;
    fn get_as_scalar(conf: &ExecutionConfig) -> ScalarValue;
}

pub struct BatchSize;

impl ExecutionSetting for BatchSize {
    const NAME: &'static str = "batch_size";
    const DESCRIPTION: &'static str = "Desired number of rows in a batch";

    fn set_from_scalar(scalar: BorrowedScalarValue, conf: &mut ExecutionConfig) -> Result<()> {
        let val = scalar.try_as_usize()?;
        if val == 0 {
            return Err(DbError::new("Batch size must be greater than zero"));
        }
        conf.batch_size = val;
        Ok(())
    }

    fn get_as_scalar(conf: &ExecutionConfig) -> ScalarValue {
        ScalarValue::Int64(conf.batch_size as i64)
    }
}

pub struct ArenaLimit;

impl ExecutionSetting for ArenaLimit {
    const NAME: &'static str = "arena_limit";
    const DESCRIPTION: &'static str =
        "Max bytes for a single batch's record arena. Null to disable the limit";

    fn set_from_scalar(scalar: BorrowedScalarValue, conf: &mut ExecutionConfig) -> Result<()> {
        conf.arena_limit = if scalar.is_null() {
            None
        } else {
            Some(scalar.try_as_usize()?)
        };
        Ok(())
    }

    fn get_as_scalar(conf: &ExecutionConfig) -> ScalarValue {
        match conf.arena_limit {
            Some(limit) => ScalarValue::Int64(limit as i64),
            None => ScalarValue::Null,
        }
    }
}
