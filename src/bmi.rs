//! The Basic Model Interface (BMI) contract.
//!
//! A host framework drives a component through `initialize`, repeated
//! `update` calls and `finalize`, and reads or writes model variables
//! through the accessors between steps. Grids here are always unstructured
//! point sets, so only the point-oriented grid accessors are part of the
//! trait.

use crate::config::ConfigError;
use crate::model::NwisError;

pub type BmiResult<T> = Result<T, BmiError>;

/// Errors raised by a `Bmi` implementation.
#[derive(Debug, thiserror::Error)]
pub enum BmiError {
    /// Configuration could not be read or is missing required keys.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The fetch issued during `initialize` failed; the cause is kept as-is.
    #[error(transparent)]
    Fetch(#[from] NwisError),

    /// Operation invoked before `initialize` or after `finalize`.
    #[error("model is not ready: call initialize first")]
    NotReady,

    /// `initialize` called twice without an intervening `finalize`.
    #[error("initialization error: model is already initialized")]
    AlreadyInitialized,

    /// No timestamp left to advance to.
    #[error("end of data: {0}")]
    EndOfData(String),

    /// `update_until` given NaN or an infinite time.
    #[error("cannot update to time {0}: time must be finite")]
    NonFiniteTime(f64),

    /// `update_until` asked to move backwards.
    #[error("cannot update to time {requested}: current time is {current}")]
    TimeBeforeCurrent { requested: f64, current: f64 },

    #[error("shape error: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    #[error("unknown grid: {0}")]
    UnknownGrid(usize),

    #[error("index {index} out of range for {len} points")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("time step is undefined for a series with {0} timestamp(s)")]
    UndefinedTimeStep(usize),
}

/// Fixed method set a hosting framework uses to drive a model component.
pub trait Bmi {
    // --- Lifecycle ---------------------------------------------------------

    /// Reads the configuration file and prepares the model to run.
    fn initialize(&mut self, config_file: &str) -> BmiResult<()>;
    fn update(&mut self) -> BmiResult<()>;
    fn update_until(&mut self, time: f64) -> BmiResult<()>;
    fn finalize(&mut self) -> BmiResult<()>;

    // --- Model information -------------------------------------------------

    fn get_component_name(&self) -> &str;
    fn get_input_item_count(&self) -> BmiResult<usize>;
    fn get_output_item_count(&self) -> BmiResult<usize>;
    fn get_input_var_names(&self) -> BmiResult<Vec<String>>;
    fn get_output_var_names(&self) -> BmiResult<Vec<String>>;

    // --- Variable information ----------------------------------------------

    fn get_var_grid(&self, name: &str) -> BmiResult<usize>;
    fn get_var_type(&self, name: &str) -> BmiResult<&'static str>;
    fn get_var_units(&self, name: &str) -> BmiResult<String>;
    fn get_var_itemsize(&self, name: &str) -> BmiResult<usize>;
    fn get_var_nbytes(&self, name: &str) -> BmiResult<usize>;
    fn get_var_location(&self, name: &str) -> BmiResult<&'static str>;

    // --- Time --------------------------------------------------------------

    fn get_current_time(&self) -> BmiResult<f64>;
    fn get_start_time(&self) -> BmiResult<f64>;
    fn get_end_time(&self) -> BmiResult<f64>;
    fn get_time_units(&self) -> BmiResult<&'static str>;
    fn get_time_step(&self) -> BmiResult<f64>;

    // --- Values ------------------------------------------------------------

    /// Copy of the variable's values at the current step, one per grid point.
    fn get_value(&self, name: &str) -> BmiResult<Vec<f64>>;
    fn get_value_ptr(&self, name: &str) -> BmiResult<&[f64]>;
    fn get_value_at_indices(&self, name: &str, inds: &[usize]) -> BmiResult<Vec<f64>>;
    fn set_value(&mut self, name: &str, values: &[f64]) -> BmiResult<()>;
    fn set_value_at_indices(&mut self, name: &str, inds: &[usize], src: &[f64]) -> BmiResult<()>;

    // --- Grid --------------------------------------------------------------

    fn get_grid_rank(&self, grid: usize) -> BmiResult<usize>;
    fn get_grid_size(&self, grid: usize) -> BmiResult<usize>;
    fn get_grid_type(&self, grid: usize) -> BmiResult<&'static str>;
    fn get_grid_x(&self, grid: usize) -> BmiResult<Vec<f64>>;
    fn get_grid_y(&self, grid: usize) -> BmiResult<Vec<f64>>;
    fn get_grid_node_count(&self, grid: usize) -> BmiResult<usize>;
}
