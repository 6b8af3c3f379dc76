//! Approximate-counter arithmetic for the log Count-Min variants.
//!
//! A stored code `c` in `[0, storage_max]` represents a real count: codes up
//! to `num_reserved` are the count itself, and codes above decode through a
//! geometric series in the base `x`. The base is chosen at construction so
//! that the largest code decodes to `max_count`.

use crate::common::random::RandomSource;
use crate::common::random::XorShift64;
use crate::error::Error;
use crate::error::Result;

/// Derived parameters of a log-counter encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct LogParams {
    pub num_reserved: u32,
    pub storage_max: u32,
    pub max_count: u64,
    /// Geometric base `x > 1` solving
    /// `(x^(storage_max - num_reserved) - 1)/(x - 1) + num_reserved = max_count`.
    pub base: f64,
}

/// Sum of the geometric series `1 + x + ... + x^(c-1)`, stable near `x = 1`.
fn geometric_sum(x: f64, c: f64) -> f64 {
    if (x - 1.0).abs() < 1e-12 {
        c
    } else {
        (x.powf(c) - 1.0) / (x - 1.0)
    }
}

impl LogParams {
    /// Derives the encoding for the given configuration.
    ///
    /// Bisects `x` over `(1, 2]`; the series sum is strictly increasing in
    /// `x`, so the bracket halves until the base is determined to full
    /// floating-point precision.
    pub fn derive(num_reserved: u32, storage_max: u32, max_count: u64) -> Result<Self> {
        if num_reserved >= storage_max {
            return Err(Error::invalid_config(format!(
                "num_reserved must be below the storage maximum {storage_max}, got {num_reserved}"
            )));
        }
        if max_count <= u64::from(storage_max) {
            return Err(Error::invalid_config(format!(
                "max_count must exceed the storage maximum {storage_max}, got {max_count}"
            )));
        }
        let c_max = f64::from(storage_max - num_reserved);
        let target = (max_count - u64::from(num_reserved)) as f64;
        if c_max < 64.0 && geometric_sum(2.0, c_max) < target {
            return Err(Error::invalid_config(format!(
                "no base in (1, 2] reaches max_count {max_count} with {} usable codes",
                storage_max - num_reserved
            )));
        }

        let mut lo = 1.0f64;
        let mut hi = 2.0f64;
        for _ in 0..200 {
            let mid = 0.5 * (lo + hi);
            if geometric_sum(mid, c_max) < target {
                lo = mid;
            } else {
                hi = mid;
            }
            if hi - lo <= f64::EPSILON * hi {
                break;
            }
        }

        Ok(Self {
            num_reserved,
            storage_max,
            max_count,
            base: 0.5 * (lo + hi),
        })
    }

    /// Decodes a stored code to its real-valued count.
    pub fn decode(&self, code: u32) -> f64 {
        if code <= self.num_reserved {
            f64::from(code)
        } else {
            geometric_sum(self.base, f64::from(code - self.num_reserved))
                + f64::from(self.num_reserved)
        }
    }

    /// Decodes a stored code to the integer estimate reported by `query`.
    pub fn decode_rounded(&self, code: u32) -> u64 {
        if code <= self.num_reserved {
            u64::from(code)
        } else {
            let geo = geometric_sum(self.base, f64::from(code - self.num_reserved));
            geo.round() as u64 + u64::from(self.num_reserved)
        }
    }

    /// Applies `count` logical increments to a stored code.
    ///
    /// Codes in the reserved range advance deterministically; above it each
    /// increment fires with probability `x^-(code - num_reserved)`. Returns
    /// the new code and whether an increment hit the storage ceiling.
    pub fn increment(&self, mut code: u32, count: u64, rng: &mut XorShift64) -> (u32, bool) {
        let mut saturated = false;
        for _ in 0..count {
            if code <= self.num_reserved {
                code += 1;
            } else {
                let p = self.base.powi(-((code - self.num_reserved) as i32));
                if rng.next_bernoulli(p) {
                    if code == self.storage_max {
                        saturated = true;
                        break;
                    }
                    code += 1;
                }
            }
        }
        (code, saturated)
    }

    /// Stores the code whose decoded value is nearest the merged real count
    /// `v` (ties to the even code). Returns the code and whether the merge
    /// clamped at the encoding's ceiling.
    pub fn nearest_code(&self, v: f64) -> (u32, bool) {
        let reserved = f64::from(self.num_reserved);
        if v <= reserved {
            return (v.round() as u32, false);
        }
        if v >= self.max_count as f64 {
            return (self.storage_max, true);
        }

        // Invert the decode: c = log_x(1 + (v - reserved)(x - 1)).
        let c_real = (1.0 + (v - reserved) * (self.base - 1.0)).ln() / self.base.ln();
        let lo = self.num_reserved + (c_real.floor() as u32).min(self.storage_max - self.num_reserved);
        let hi = (lo + 1).min(self.storage_max);
        let d_lo = (self.decode(lo) - v).abs();
        let d_hi = (self.decode(hi) - v).abs();
        let code = if d_lo < d_hi {
            lo
        } else if d_hi < d_lo {
            hi
        } else if lo % 2 == 0 {
            lo
        } else {
            hi
        };
        (code, false)
    }
}
