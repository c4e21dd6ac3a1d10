//! GCC-PHAT (Generalized Cross-Correlation with Phase Transform)
//!
//! Cross-correlates two real signals in the frequency domain after whitening
//! the cross-power spectrum, which keeps the phase (delay information) and
//! flattens the magnitude. The exponent β controls how much whitening is
//! applied: 0 is plain cross-correlation, 1 is full PHAT.
//!
//! ```text
//!            X1 · conj(X2)
//!   G(f) = ──────────────────────          r = fftshift(Re(IFFT(G)))
//!          max(|X1 · conj(X2)|, ε)^β
//! ```
//!
//! The returned sequence has `len(s1) + len(s2) - 1` samples; index `L / 2`
//! is zero lag and index `L / 2 + k` holds lag `k` (positive when `s1` lags
//! `s2`).
//!
//! ## Example
//!
//! ```rust
//! use bearing_core::gcc_phat::gcc_phat;
//!
//! let mut a = vec![0.0; 64];
//! let mut b = vec![0.0; 64];
//! a[20] = 1.0;
//! b[17] = 1.0;
//! let corr = gcc_phat(&a, &b, 1.0);
//! let peak = corr
//!     .iter()
//!     .enumerate()
//!     .max_by(|x, y| x.1.total_cmp(y.1))
//!     .map(|(i, _)| i as i64 - (corr.len() / 2) as i64);
//! assert_eq!(peak, Some(3));
//! ```

use num_complex::Complex64;

use crate::spectral::{fft, fft_shift, ifft, next_pow2_len, to_complex, zero_pad};

/// Floor applied to the cross-power magnitude before PHAT weighting.
pub const PHAT_EPSILON: f64 = 1e-12;

/// Default PHAT exponent.
pub const DEFAULT_BETA: f64 = 0.7;

/// Compute the GCC-PHAT correlation of `s1` against `s2`.
///
/// Returns an empty vector if either input is empty.
pub fn gcc_phat(s1: &[f64], s2: &[f64], beta: f64) -> Vec<f64> {
    if s1.is_empty() || s2.is_empty() {
        return Vec::new();
    }
    let out_len = s1.len() + s2.len() - 1;
    let n = next_pow2_len(out_len);

    let mut x1 = zero_pad(&to_complex(s1), n - s1.len());
    let mut x2 = zero_pad(&to_complex(s2), n - s2.len());
    fft(&mut x1);
    fft(&mut x2);

    let mut cross: Vec<Complex64> = x1
        .iter()
        .zip(x2.iter())
        .map(|(a, b)| {
            let c = a * b.conj();
            c / c.norm().max(PHAT_EPSILON).powf(beta)
        })
        .collect();
    ifft(&mut cross);

    let real: Vec<f64> = cross.iter().map(|c| c.re).collect();
    let shifted = fft_shift(&real);

    // Zero lag sits at n / 2 after the shift; keep the L samples around it.
    let start = n / 2 - out_len / 2;
    shifted[start..start + out_len].to_vec()
}
