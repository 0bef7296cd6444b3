//! Mass-action rate evaluation.
//!
//! Stochastic propensity:
//!     a(x) = k × Π_i C(x_i, m_i)
//!
//! Deterministic flux (mean-field limit of the same law):
//!     v(y) = k × Π_i y_i^m_i / m_i!

use super::network::{Network, ReactionChannel};
use super::rule::RateLaw;
use super::state::CountState;
use crate::error::{Error, Result};

/// Binomial coefficient C(n, k) as `f64`; zero when `n < k`.
#[inline]
pub fn binomial(n: u64, k: u32) -> f64 {
    let k = k as u64;
    if n < k {
        return 0.0;
    }
    let mut result = 1.0;
    for i in 0..k {
        result *= (n - i) as f64 / (i + 1) as f64;
    }
    result
}

/// m! as `f64`.
#[inline]
fn factorial(m: u32) -> f64 {
    (2..=m).fold(1.0, |acc, i| acc * i as f64)
}

/// Stochastic propensity of `channel` in `state`.
pub fn propensity(channel: &ReactionChannel, state: &CountState) -> Result<f64> {
    let rate = match channel.rate_law {
        RateLaw::MassAction => {
            let mut a = channel.rate_constant;
            for &(entity, m) in &channel.exponents {
                a *= binomial(state.get(entity), m);
            }
            a
        }
    };
    check_rate(channel, rate)
}

/// Deterministic flux of `channel` at amounts `y`.
pub fn flux(channel: &ReactionChannel, y: &[f64]) -> Result<f64> {
    check_rate(channel, mass_action_flux(channel, y))
}

/// Flux without the sign check; negative amounts count as zero.
///
/// Used inside the ODE right-hand side, where errors cannot be propagated.
#[inline]
pub(crate) fn mass_action_flux(channel: &ReactionChannel, y: &[f64]) -> f64 {
    match channel.rate_law {
        RateLaw::MassAction => {
            let mut v = channel.rate_constant;
            for &(entity, m) in &channel.exponents {
                let amount = y[entity].max(0.0);
                v *= amount.powi(m as i32) / factorial(m);
            }
            v
        }
    }
}

/// Propensities of every channel, in channel order.
pub fn propensities(network: &Network, state: &CountState, out: &mut Vec<f64>) -> Result<f64> {
    out.clear();
    let mut total = 0.0;
    for channel in network.channels() {
        let a = propensity(channel, state)?;
        total += a;
        out.push(a);
    }
    Ok(total)
}

#[inline]
fn check_rate(channel: &ReactionChannel, rate: f64) -> Result<f64> {
    // NaN fails this comparison too
    if rate >= 0.0 {
        Ok(rate)
    } else {
        Err(Error::NegativeRate {
            channel: channel.name.clone(),
            rate,
        })
    }
}
