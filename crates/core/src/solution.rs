use crate::math::Scalar;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Capacity of the kernel's status field, including the terminating NUL.
pub const STATUS_LEN: usize = 32;

/// Outcome of a kernel solve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Status {
    Solved,
    SolvedInaccurate,
    PrimalInfeasible,
    DualInfeasible,
    MaxIterReached,
    TimeLimitReached,
    Unsolved,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Solved => "solved",
            Status::SolvedInaccurate => "solved_inaccurate",
            Status::PrimalInfeasible => "primal_infeasible",
            Status::DualInfeasible => "dual_infeasible",
            Status::MaxIterReached => "max_iter_reached",
            Status::TimeLimitReached => "time_limit_reached",
            Status::Unsolved => "unsolved",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-size, NUL-terminated status text as the kernel stores it.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct StatusField([u8; STATUS_LEN]);

impl StatusField {
    /// Writes `token`, truncated to leave room for the terminator.
    pub fn new(token: &str) -> Self {
        let mut buf = [0u8; STATUS_LEN];
        let bytes = token.as_bytes();
        let len = bytes.len().min(STATUS_LEN - 1);
        buf[..len].copy_from_slice(&bytes[..len]);
        Self(buf)
    }

    pub fn from_bytes(buf: [u8; STATUS_LEN]) -> Self {
        Self(buf)
    }

    /// Text up to the first NUL, or the whole buffer if none is present.
    pub fn decode(&self) -> String {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(STATUS_LEN);
        String::from_utf8_lossy(&self.0[..end]).into_owned()
    }
}

impl From<Status> for StatusField {
    fn from(status: Status) -> Self {
        Self::new(status.as_str())
    }
}

impl Default for StatusField {
    fn default() -> Self {
        Status::Unsolved.into()
    }
}

impl fmt::Debug for StatusField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatusField({:?})", self.decode())
    }
}

/// Diagnostic record of the last solve.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelInfo {
    pub status: StatusField,
    pub iterations: usize,
    pub obj_val: Scalar,
    pub pri_res: Scalar,
    pub dua_res: Scalar,
    pub rho_estimate: Scalar,
    pub rho_updates: usize,
    pub setup_time: Duration,
    pub solve_time: Duration,
}

impl Default for KernelInfo {
    fn default() -> Self {
        Self {
            status: StatusField::default(),
            iterations: 0,
            obj_val: Scalar::NAN,
            pri_res: Scalar::NAN,
            dua_res: Scalar::NAN,
            rho_estimate: 0.0,
            rho_updates: 0,
            setup_time: Duration::ZERO,
            solve_time: Duration::ZERO,
        }
    }
}

/// Borrowed result buffers of a kernel handle.
#[derive(Debug, Clone, Copy)]
pub struct KernelSolution<'h> {
    pub x: &'h [Scalar],
    pub y: &'h [Scalar],
    pub info: &'h KernelInfo,
}
