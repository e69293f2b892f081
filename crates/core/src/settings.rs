use crate::error::{BridgeError, BridgeResult};
use crate::math::Scalar;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Kernel settings. Iteration limits and the time limit live here; the bridge
/// has no separate cancellation channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub rho: Scalar,
    pub sigma: Scalar,
    pub alpha: Scalar,
    pub eps_abs: Scalar,
    pub eps_rel: Scalar,
    pub eps_prim_inf: Scalar,
    pub eps_dual_inf: Scalar,
    pub max_iter: usize,
    /// Residuals are checked every this many iterations.
    pub check_termination: usize,
    pub adaptive_rho: bool,
    pub adaptive_rho_interval: usize,
    pub adaptive_rho_tolerance: Scalar,
    pub warm_starting: bool,
    pub time_limit: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rho: 0.1,
            sigma: 1e-6,
            alpha: 1.6,
            eps_abs: 1e-3,
            eps_rel: 1e-3,
            eps_prim_inf: 1e-4,
            eps_dual_inf: 1e-4,
            max_iter: 4000,
            check_termination: 25,
            adaptive_rho: true,
            adaptive_rho_interval: 50,
            adaptive_rho_tolerance: 5.0,
            warm_starting: true,
            time_limit: None,
        }
    }
}

impl Settings {
    pub fn with_tolerance(eps_abs: Scalar, eps_rel: Scalar) -> Self {
        Self {
            eps_abs,
            eps_rel,
            ..Self::default()
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_rho(mut self, rho: Scalar) -> Self {
        self.rho = rho;
        self
    }

    pub fn with_adaptive_rho(mut self, enabled: bool) -> Self {
        self.adaptive_rho = enabled;
        self
    }

    pub fn with_warm_starting(mut self, enabled: bool) -> Self {
        self.warm_starting = enabled;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn validate(&self) -> BridgeResult<()> {
        let positive = [("rho", self.rho), ("sigma", self.sigma)];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(BridgeError::InvalidSettings(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        let tolerances = [
            ("eps_abs", self.eps_abs),
            ("eps_rel", self.eps_rel),
            ("eps_prim_inf", self.eps_prim_inf),
            ("eps_dual_inf", self.eps_dual_inf),
        ];
        for (name, value) in tolerances {
            if !(value >= 0.0) {
                return Err(BridgeError::InvalidSettings(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        if !(self.alpha > 0.0 && self.alpha < 2.0) {
            return Err(BridgeError::InvalidSettings(format!(
                "alpha must lie in (0, 2), got {}",
                self.alpha
            )));
        }
        if self.max_iter == 0 {
            return Err(BridgeError::InvalidSettings("max_iter must be positive".into()));
        }
        if !(self.adaptive_rho_tolerance >= 1.0) {
            return Err(BridgeError::InvalidSettings(format!(
                "adaptive_rho_tolerance must be at least 1, got {}",
                self.adaptive_rho_tolerance
            )));
        }
        Ok(())
    }
}
