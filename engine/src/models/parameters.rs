use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::utils::errors::{EngineError, Result};

/// Fallback values used for every parameter the caller leaves out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationDefaults {
    /// Spot price at `t = 0`.
    pub initial_price: f64,
    /// Annualized drift.
    pub drift: f64,
    /// Annualized volatility.
    pub volatility: f64,
    /// Horizon in years.
    pub time_horizon: f64,
    /// Rows of the ensemble (path resolution).
    pub time_steps: usize,
    /// Columns of the ensemble (path count).
    pub n_simulations: usize,
}

impl Default for SimulationDefaults {
    fn default() -> Self {
        Self {
            initial_price: 100.0,
            drift: 0.05,
            volatility: 0.2,
            time_horizon: 1.0,
            time_steps: 252,
            n_simulations: 1000,
        }
    }
}

impl SimulationDefaults {
    pub fn with_initial_price(mut self, initial_price: f64) -> Self {
        self.initial_price = initial_price;
        self
    }

    pub fn with_drift(mut self, drift: f64) -> Self {
        self.drift = drift;
        self
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    pub fn with_time_horizon(mut self, time_horizon: f64) -> Self {
        self.time_horizon = time_horizon;
        self
    }

    pub fn with_time_steps(mut self, time_steps: usize) -> Self {
        self.time_steps = time_steps;
        self
    }

    pub fn with_n_simulations(mut self, n_simulations: usize) -> Self {
        self.n_simulations = n_simulations;
        self
    }

    /// The defaults as a fully resolved parameter set (used as a template for callers).
    pub fn as_parameters(&self) -> SimulationParameters {
        SimulationParameters {
            initial_price: self.initial_price,
            drift: self.drift,
            volatility: self.volatility,
            time_horizon: self.time_horizon,
            time_steps: self.time_steps,
            n_simulations: self.n_simulations,
        }
    }
}

/// Keeps an explicit `null` distinguishable from an absent key.
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Loosely typed parameters as they arrive on the wire.
///
/// `None` means the key was absent and the default applies. A present key,
/// `null` included, has to coerce to the field's numeric type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawParameters {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub initial_price: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub drift: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub volatility: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub time_horizon: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub time_steps: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub n_simulations: Option<Value>,
}

impl RawParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_price(mut self, value: impl Into<Value>) -> Self {
        self.initial_price = Some(value.into());
        self
    }

    pub fn with_drift(mut self, value: impl Into<Value>) -> Self {
        self.drift = Some(value.into());
        self
    }

    pub fn with_volatility(mut self, value: impl Into<Value>) -> Self {
        self.volatility = Some(value.into());
        self
    }

    pub fn with_time_horizon(mut self, value: impl Into<Value>) -> Self {
        self.time_horizon = Some(value.into());
        self
    }

    pub fn with_time_steps(mut self, value: impl Into<Value>) -> Self {
        self.time_steps = Some(value.into());
        self
    }

    pub fn with_n_simulations(mut self, value: impl Into<Value>) -> Self {
        self.n_simulations = Some(value.into());
        self
    }

    /// Apply defaults and coerce every field. Does not check ranges, see
    /// [`SimulationParameters::validate`].
    pub fn resolve(&self, defaults: &SimulationDefaults) -> Result<SimulationParameters> {
        Ok(SimulationParameters {
            initial_price: coerce_f64("initial_price", &self.initial_price, defaults.initial_price)?,
            drift: coerce_f64("drift", &self.drift, defaults.drift)?,
            volatility: coerce_f64("volatility", &self.volatility, defaults.volatility)?,
            time_horizon: coerce_f64("time_horizon", &self.time_horizon, defaults.time_horizon)?,
            time_steps: coerce_count("time_steps", &self.time_steps, defaults.time_steps)?,
            n_simulations: coerce_count(
                "n_simulations",
                &self.n_simulations,
                defaults.n_simulations,
            )?,
        })
    }
}

fn coerce_f64(name: &str, value: &Option<Value>, default: f64) -> Result<f64> {
    let value = match value {
        None => return Ok(default),
        Some(v) => v,
    };
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        EngineError::Validation(format!("could not convert {name} to float: {value}"))
    })
}

/// Integer fields accept whole numbers, floats (truncated) and integer strings.
/// Negative inputs resolve to 0 so that validation reports them as non-positive.
fn coerce_count(name: &str, value: &Option<Value>, default: usize) -> Result<usize> {
    let value = match value {
        None => return Ok(default),
        Some(v) => v,
    };
    let parsed: Option<i128> = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i as i128)
            } else if let Some(u) = n.as_u64() {
                Some(u as i128)
            } else {
                n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i128)
            }
        }
        Value::Bool(b) => Some(*b as i128),
        Value::String(s) => s.trim().parse::<i128>().ok(),
        _ => None,
    };
    let parsed = parsed.ok_or_else(|| {
        EngineError::Validation(format!("invalid literal for {name} as integer: {value}"))
    })?;
    if parsed <= 0 {
        return Ok(0);
    }
    usize::try_from(parsed)
        .map_err(|_| EngineError::Validation(format!("{name} is too large: {parsed}")))
}

/// Fully resolved, typed simulation inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    pub initial_price: f64,
    pub drift: f64,
    pub volatility: f64,
    pub time_horizon: f64,
    pub time_steps: usize,
    pub n_simulations: usize,
}

impl SimulationParameters {
    /// Checks the positivity invariants.
    pub fn validate(&self) -> Result<()> {
        let reals = [
            ("initial_price", self.initial_price),
            ("drift", self.drift),
            ("volatility", self.volatility),
            ("time_horizon", self.time_horizon),
        ];
        if let Some((name, _)) = reals.iter().find(|(_, v)| !v.is_finite()) {
            return Err(EngineError::Validation(format!("{name} must be a finite number")));
        }
        if self.initial_price <= 0.0
            || self.time_horizon <= 0.0
            || self.time_steps == 0
            || self.n_simulations == 0
        {
            return Err(EngineError::Validation(
                "All parameters must be positive".to_string(),
            ));
        }
        if self.volatility < 0.0 {
            return Err(EngineError::Validation(
                "volatility must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Length of one time step in years.
    pub fn dt(&self) -> f64 {
        self.time_horizon / self.time_steps as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_apply_when_absent() -> Result<()> {
        let params = RawParameters::new().resolve(&SimulationDefaults::default())?;
        assert_eq!(params, SimulationDefaults::default().as_parameters());
        assert_eq!(params.time_steps, 252);
        assert_eq!(params.n_simulations, 1000);
        Ok(())
    }

    #[test]
    fn test_coercion_from_strings_and_floats() -> Result<()> {
        let raw: RawParameters = serde_json::from_value(json!({
            "initial_price": "50.5",
            "time_steps": 10.9,
            "n_simulations": "20",
            "unknown": "ignored"
        }))
        .unwrap();
        let params = raw.resolve(&SimulationDefaults::default())?;
        assert_eq!(params.initial_price, 50.5);
        assert_eq!(params.time_steps, 10);
        assert_eq!(params.n_simulations, 20);
        assert_eq!(params.drift, 0.05);
        Ok(())
    }

    #[test]
    fn test_explicit_null_is_not_a_default() {
        let raw: RawParameters = serde_json::from_value(json!({ "drift": null })).unwrap();
        assert_eq!(raw.drift, Some(Value::Null));
        let err = raw.resolve(&SimulationDefaults::default()).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("drift"));
    }

    #[test]
    fn test_non_numeric_input_is_validation_error() {
        let raw = RawParameters::new().with_time_steps("many");
        let err = raw.resolve(&SimulationDefaults::default()).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(err.to_string().contains("time_steps"));
    }

    #[test]
    fn test_non_positive_values_fail_validation() {
        let defaults = SimulationDefaults::default();
        let cases = vec![
            RawParameters::new().with_initial_price(0.0),
            RawParameters::new().with_initial_price(-1.0),
            RawParameters::new().with_time_horizon(0.0),
            RawParameters::new().with_time_steps(0),
            RawParameters::new().with_time_steps(-5),
            RawParameters::new().with_n_simulations(0),
        ];
        for raw in cases {
            let params = raw.resolve(&defaults).unwrap();
            let err = params.validate().unwrap_err();
            assert_eq!(err.to_string(), "All parameters must be positive");
        }
    }

    #[test]
    fn test_negative_volatility_rejected_zero_allowed() {
        let defaults = SimulationDefaults::default();
        let zero = RawParameters::new().with_volatility(0.0).resolve(&defaults).unwrap();
        assert!(zero.validate().is_ok());
        let negative = RawParameters::new().with_volatility(-0.1).resolve(&defaults).unwrap();
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_dt() {
        let params = SimulationDefaults::default()
            .with_time_horizon(2.0)
            .with_time_steps(4)
            .as_parameters();
        assert_eq!(params.dt(), 0.5);
    }
}
