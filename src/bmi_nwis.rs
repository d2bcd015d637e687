/// `Bmi` implementation serving NWIS time series.
///
/// `initialize` fetches the whole query window once; each `update` then moves
/// one position along the time axis. Every variable lives on its own grid,
/// all of them the same unstructured point set: one node per site, in the
/// site order fixed at initialization.

use tracing::{debug, info};

use crate::bmi::{Bmi, BmiError, BmiResult};
use crate::config::NwisConfig;
use crate::fetcher::NwisData;
use crate::ingest::NwisSource;
use crate::ingest::usgs::UsgsClient;
use crate::model::TimeSeriesResult;

pub const COMPONENT_NAME: &str = "USGS NWIS time series";

/// Values are always stored as `f64`.
const VAR_TYPE: &str = "f64";
const VAR_ITEMSIZE: usize = std::mem::size_of::<f64>();
const TIME_UNITS: &str = "s";

/// Data held between `initialize` and `finalize`.
#[derive(Debug)]
struct ModelState {
    result: TimeSeriesResult,
    step: usize,
    var_names: Vec<String>,
}

impl ModelState {
    fn new(result: TimeSeriesResult) -> Self {
        let var_names = result.variable_names();
        Self {
            result,
            step: 0,
            var_names,
        }
    }

    fn var_index(&self, name: &str) -> BmiResult<usize> {
        self.var_names
            .iter()
            .position(|v| v == name)
            .ok_or_else(|| BmiError::UnknownVariable(name.to_string()))
    }

    fn check_grid(&self, grid: usize) -> BmiResult<()> {
        if grid < self.var_names.len() {
            Ok(())
        } else {
            Err(BmiError::UnknownGrid(grid))
        }
    }

    fn last_step(&self) -> usize {
        self.result.n_times().saturating_sub(1)
    }

    fn time_at(&self, step: usize) -> f64 {
        crate::model::epoch_seconds(&self.result.times[step])
    }

    fn current_row(&self, name: &str) -> BmiResult<&[f64]> {
        self.var_index(name)?;
        self.result
            .row(name, self.step)
            .ok_or_else(|| BmiError::UnknownVariable(name.to_string()))
    }

    fn current_row_mut(&mut self, name: &str) -> BmiResult<&mut [f64]> {
        self.var_index(name)?;
        let step = self.step;
        self.result
            .row_mut(name, step)
            .ok_or_else(|| BmiError::UnknownVariable(name.to_string()))
    }
}

#[derive(Debug)]
enum Lifecycle {
    Uninitialized,
    Ready(Box<ModelState>),
    Finalized,
}

/// NWIS data exposed through the `Bmi` trait.
pub struct BmiNwis<S = UsgsClient> {
    fetcher: NwisData<S>,
    state: Lifecycle,
}

impl BmiNwis<UsgsClient> {
    /// Uses the live NWIS service (honouring `NWIS_BASE_URL`).
    pub fn new() -> Self {
        Self::with_source(UsgsClient::from_env())
    }
}

impl Default for BmiNwis<UsgsClient> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: NwisSource> BmiNwis<S> {
    pub fn with_source(source: S) -> Self {
        Self {
            fetcher: NwisData::new(source),
            state: Lifecycle::Uninitialized,
        }
    }

    pub fn fetcher(&self) -> &NwisData<S> {
        &self.fetcher
    }

    /// `initialize` from an in-memory configuration.
    pub fn initialize_with(&mut self, config: &NwisConfig) -> BmiResult<()> {
        if matches!(self.state, Lifecycle::Ready(_)) {
            return Err(BmiError::AlreadyInitialized);
        }

        let result = self.fetcher.get_data(
            config.sites.codes(),
            &config.start,
            &config.end,
            &config.service,
            config.output.as_deref(),
        )?;

        info!(
            sites = result.n_sites(),
            steps = result.n_times(),
            variables = ?result.variable_names(),
            "Initialized NWIS model"
        );
        self.state = Lifecycle::Ready(Box::new(ModelState::new(result)));
        Ok(())
    }

    /// The table being served.
    pub fn result(&self) -> BmiResult<&TimeSeriesResult> {
        Ok(&self.model()?.result)
    }

    /// 0-based position on the time axis.
    pub fn current_step(&self) -> BmiResult<usize> {
        Ok(self.model()?.step)
    }

    fn model(&self) -> BmiResult<&ModelState> {
        match &self.state {
            Lifecycle::Ready(model) => Ok(&**model),
            _ => Err(BmiError::NotReady),
        }
    }

    fn model_mut(&mut self) -> BmiResult<&mut ModelState> {
        match &mut self.state {
            Lifecycle::Ready(model) => Ok(&mut **model),
            _ => Err(BmiError::NotReady),
        }
    }
}

impl<S: NwisSource> Bmi for BmiNwis<S> {
    fn initialize(&mut self, config_file: &str) -> BmiResult<()> {
        if matches!(self.state, Lifecycle::Ready(_)) {
            return Err(BmiError::AlreadyInitialized);
        }
        let config = NwisConfig::load(config_file)?;
        self.initialize_with(&config)
    }

    fn update(&mut self) -> BmiResult<()> {
        let model = self.model_mut()?;
        if model.step >= model.last_step() {
            return Err(BmiError::EndOfData(format!(
                "already at the last of {} steps",
                model.result.n_times()
            )));
        }
        model.step += 1;
        debug!(step = model.step, "Advanced NWIS model");
        Ok(())
    }

    fn update_until(&mut self, time: f64) -> BmiResult<()> {
        let model = self.model_mut()?;
        if !time.is_finite() {
            return Err(BmiError::NonFiniteTime(time));
        }
        let current = model.time_at(model.step);
        let end = model.time_at(model.last_step());

        if time < current {
            return Err(BmiError::TimeBeforeCurrent {
                requested: time,
                current,
            });
        }
        if time > end {
            return Err(BmiError::EndOfData(format!(
                "time {} is past the last timestamp {}",
                time, end
            )));
        }

        while model.time_at(model.step) < time {
            model.step += 1;
        }
        debug!(step = model.step, "Advanced NWIS model");
        Ok(())
    }

    fn finalize(&mut self) -> BmiResult<()> {
        self.model()?;
        self.state = Lifecycle::Finalized;
        debug!("Finalized NWIS model");
        Ok(())
    }

    fn get_component_name(&self) -> &str {
        COMPONENT_NAME
    }

    fn get_input_item_count(&self) -> BmiResult<usize> {
        Ok(self.model()?.var_names.len())
    }

    fn get_output_item_count(&self) -> BmiResult<usize> {
        Ok(self.model()?.var_names.len())
    }

    fn get_input_var_names(&self) -> BmiResult<Vec<String>> {
        Ok(self.model()?.var_names.clone())
    }

    fn get_output_var_names(&self) -> BmiResult<Vec<String>> {
        Ok(self.model()?.var_names.clone())
    }

    fn get_var_grid(&self, name: &str) -> BmiResult<usize> {
        self.model()?.var_index(name)
    }

    fn get_var_type(&self, name: &str) -> BmiResult<&'static str> {
        self.model()?.var_index(name)?;
        Ok(VAR_TYPE)
    }

    fn get_var_units(&self, name: &str) -> BmiResult<String> {
        let model = self.model()?;
        let idx = model.var_index(name)?;
        Ok(model.result.variables[idx].unit.clone())
    }

    fn get_var_itemsize(&self, name: &str) -> BmiResult<usize> {
        self.model()?.var_index(name)?;
        Ok(VAR_ITEMSIZE)
    }

    fn get_var_nbytes(&self, name: &str) -> BmiResult<usize> {
        let model = self.model()?;
        model.var_index(name)?;
        Ok(VAR_ITEMSIZE * model.result.n_sites())
    }

    fn get_var_location(&self, name: &str) -> BmiResult<&'static str> {
        self.model()?.var_index(name)?;
        Ok("node")
    }

    fn get_current_time(&self) -> BmiResult<f64> {
        let model = self.model()?;
        Ok(model.time_at(model.step))
    }

    fn get_start_time(&self) -> BmiResult<f64> {
        Ok(self.model()?.time_at(0))
    }

    fn get_end_time(&self) -> BmiResult<f64> {
        let model = self.model()?;
        Ok(model.time_at(model.last_step()))
    }

    fn get_time_units(&self) -> BmiResult<&'static str> {
        self.model()?;
        Ok(TIME_UNITS)
    }

    fn get_time_step(&self) -> BmiResult<f64> {
        let model = self.model()?;
        let n = model.result.n_times();
        if n < 2 {
            return Err(BmiError::UndefinedTimeStep(n));
        }
        Ok(model.time_at(1) - model.time_at(0))
    }

    fn get_value(&self, name: &str) -> BmiResult<Vec<f64>> {
        Ok(self.get_value_ptr(name)?.to_vec())
    }

    fn get_value_ptr(&self, name: &str) -> BmiResult<&[f64]> {
        self.model()?.current_row(name)
    }

    fn get_value_at_indices(&self, name: &str, inds: &[usize]) -> BmiResult<Vec<f64>> {
        let row = self.get_value_ptr(name)?;
        inds.iter()
            .map(|&i| {
                row.get(i).copied().ok_or(BmiError::IndexOutOfRange {
                    index: i,
                    len: row.len(),
                })
            })
            .collect()
    }

    fn set_value(&mut self, name: &str, values: &[f64]) -> BmiResult<()> {
        let row = self.model_mut()?.current_row_mut(name)?;
        if values.len() != row.len() {
            return Err(BmiError::ShapeMismatch {
                expected: row.len(),
                actual: values.len(),
            });
        }
        row.copy_from_slice(values);
        Ok(())
    }

    fn set_value_at_indices(&mut self, name: &str, inds: &[usize], src: &[f64]) -> BmiResult<()> {
        let row = self.model_mut()?.current_row_mut(name)?;
        if inds.len() != src.len() {
            return Err(BmiError::ShapeMismatch {
                expected: inds.len(),
                actual: src.len(),
            });
        }
        if let Some(&index) = inds.iter().find(|&&i| i >= row.len()) {
            return Err(BmiError::IndexOutOfRange {
                index,
                len: row.len(),
            });
        }
        for (&i, &v) in inds.iter().zip(src) {
            row[i] = v;
        }
        Ok(())
    }

    fn get_grid_rank(&self, grid: usize) -> BmiResult<usize> {
        self.model()?.check_grid(grid)?;
        Ok(1)
    }

    fn get_grid_size(&self, grid: usize) -> BmiResult<usize> {
        let model = self.model()?;
        model.check_grid(grid)?;
        Ok(model.result.n_sites())
    }

    fn get_grid_type(&self, grid: usize) -> BmiResult<&'static str> {
        self.model()?.check_grid(grid)?;
        Ok("unstructured")
    }

    fn get_grid_x(&self, grid: usize) -> BmiResult<Vec<f64>> {
        let model = self.model()?;
        model.check_grid(grid)?;
        Ok(model.result.longitudes())
    }

    fn get_grid_y(&self, grid: usize) -> BmiResult<Vec<f64>> {
        let model = self.model()?;
        model.check_grid(grid)?;
        Ok(model.result.latitudes())
    }

    fn get_grid_node_count(&self, grid: usize) -> BmiResult<usize> {
        self.get_grid_size(grid)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
