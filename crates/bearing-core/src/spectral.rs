//! Radix-2 FFT with zero padding and shift helpers
//!
//! These are the transform primitives the GCC-PHAT correlator is built on.
//! The FFT is a recursive radix-2 decimation-in-time transform:
//!
//! ```text
//!   x[0..N]  ──split──►  even x[0], x[2], ...   ──FFT──►  E[k]
//!                        odd  x[1], x[3], ...   ──FFT──►  O[k]
//!
//!   X[k]       = E[k] + W^k · O[k]
//!   X[k + N/2] = E[k] - W^k · O[k]        W = exp(-2πi/N)
//! ```
//!
//! Lengths must be powers of two. Callers pad first (see [`zero_pad`] and
//! [`next_pow2_len`]).
//!
//! ## Example
//!
//! ```rust
//! use bearing_core::spectral::{fft, ifft, to_complex};
//!
//! let mut buf = to_complex(&[1.0, 2.0, 3.0, 4.0]);
//! fft(&mut buf);
//! assert!((buf[0].re - 10.0).abs() < 1e-12);
//! ifft(&mut buf);
//! assert!((buf[3].re - 4.0).abs() < 1e-12);
//! ```

use num_complex::Complex64;
use std::f64::consts::PI;

/// Forward DFT in place.
///
/// # Panics
///
/// Panics if `x.len()` is not a power of two (lengths 0 and 1 are returned
/// unchanged).
pub fn fft(x: &mut [Complex64]) {
    let n = x.len();
    if n <= 1 {
        return;
    }
    assert!(n.is_power_of_two(), "fft length {n} is not a power of two");

    let mut even: Vec<Complex64> = x.iter().step_by(2).copied().collect();
    let mut odd: Vec<Complex64> = x.iter().skip(1).step_by(2).copied().collect();
    fft(&mut even);
    fft(&mut odd);

    let half = n / 2;
    for k in 0..half {
        let twiddle = Complex64::from_polar(1.0, -2.0 * PI * k as f64 / n as f64);
        let t = twiddle * odd[k];
        x[k] = even[k] + t;
        x[k + half] = even[k] - t;
    }
}

/// Inverse DFT in place: conjugate, forward transform, conjugate, scale by 1/N.
///
/// # Panics
///
/// Same precondition as [`fft`].
pub fn ifft(x: &mut [Complex64]) {
    let n = x.len();
    if n == 0 {
        return;
    }
    x.iter_mut().for_each(|c| *c = c.conj());
    fft(x);
    let scale = 1.0 / n as f64;
    x.iter_mut().for_each(|c| *c = c.conj() * scale);
}

/// Return `signal` followed by `pad` zeros.
pub fn zero_pad<T: Copy + Default>(signal: &[T], pad: usize) -> Vec<T> {
    let mut padded = Vec::with_capacity(signal.len() + pad);
    padded.extend_from_slice(signal);
    padded.resize(signal.len() + pad, T::default());
    padded
}

/// Circularly rotate right by `len / 2`, moving element 0 to the centre.
pub fn fft_shift<T: Clone>(x: &[T]) -> Vec<T> {
    let mut shifted = x.to_vec();
    shifted.rotate_right(x.len() / 2);
    shifted
}

/// Smallest power of two that is `>= n` (1 for `n == 0`).
pub fn next_pow2_len(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// Lift a real signal into the complex plane.
pub fn to_complex(signal: &[f64]) -> Vec<Complex64> {
    signal.iter().map(|&s| Complex64::new(s, 0.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rustfft::FftPlanner;

    #[test]
    fn test_fft_known_vector() {
        let mut buf = to_complex(&[1.0, 1.0, 1.0, 1.0, 0.0, 7.0, 2.0, 2.0]);
        fft(&mut buf);

        let re = [15.0, -2.5355, -2.0, 4.5355, -7.0, 4.5355, -2.0, -2.5355];
        let im = [0.0, 5.9497, -5.0, 3.9497, 0.0, -3.9497, 5.0, -5.9497];
        for k in 0..8 {
            assert!((buf[k].re - re[k]).abs() < 1e-4, "re[{k}] = {}", buf[k].re);
            assert!((buf[k].im - im[k]).abs() < 1e-4, "im[{k}] = {}", buf[k].im);
        }
    }

    #[test]
    fn test_fft_inverse_identity() {
        let signal: Vec<Complex64> = (0..64)
            .map(|i| Complex64::new(i as f64, (i * 2) as f64))
            .collect();

        let mut buffer = signal.clone();
        fft(&mut buffer);
        ifft(&mut buffer);

        for (orig, recovered) in signal.iter().zip(buffer.iter()) {
            assert!((orig - recovered).norm() < 1e-6);
        }
    }

    #[test]
    fn test_fft_matches_rustfft() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 256;
        let signal: Vec<Complex64> = (0..n)
            .map(|_| Complex64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
            .collect();

        let mut ours = signal.clone();
        fft(&mut ours);

        let mut reference = signal;
        FftPlanner::<f64>::new()
            .plan_fft_forward(n)
            .process(&mut reference);

        for (a, b) in ours.iter().zip(reference.iter()) {
            assert!((a - b).norm() < 1e-9);
        }
    }

    #[test]
    fn test_fft_single_tone() {
        let n = 128;
        let mut signal: Vec<Complex64> = (0..n)
            .map(|i| Complex64::from_polar(1.0, 2.0 * PI * 10.0 * i as f64 / n as f64))
            .collect();
        fft(&mut signal);

        let peak = signal
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.norm().total_cmp(&b.1.norm()))
            .map(|(i, _)| i);
        assert_eq!(peak, Some(10));
    }

    #[test]
    fn test_trivial_lengths() {
        let mut empty: Vec<Complex64> = Vec::new();
        fft(&mut empty);
        ifft(&mut empty);
        assert!(empty.is_empty());

        let mut one = vec![Complex64::new(3.0, -1.0)];
        fft(&mut one);
        assert_eq!(one[0], Complex64::new(3.0, -1.0));
    }

    #[test]
    #[should_panic(expected = "not a power of two")]
    fn test_fft_rejects_odd_length() {
        let mut buf = to_complex(&[1.0, 2.0, 3.0]);
        fft(&mut buf);
    }

    #[test]
    fn test_fft_shift() {
        assert_eq!(fft_shift(&[1, 2, 3, 4, 5, 6]), vec![4, 5, 6, 1, 2, 3]);
        // Element 0 lands at len / 2 for odd lengths as well.
        assert_eq!(fft_shift(&[0, 1, 2, 3, 4]), vec![3, 4, 0, 1, 2]);
        assert!(fft_shift::<f64>(&[]).is_empty());
    }

    #[test]
    fn test_zero_pad() {
        let signal = [1.5, -2.0, 3.25];
        let padded = zero_pad(&signal, 5);
        assert_eq!(padded.len(), 8);
        assert_eq!(&padded[..3], &signal);
        assert!(padded[3..].iter().all(|&v| v == 0.0));

        assert_eq!(zero_pad(&signal, 0), signal.to_vec());
    }

    #[test]
    fn test_next_pow2_len() {
        assert_eq!(next_pow2_len(0), 1);
        assert_eq!(next_pow2_len(1), 1);
        assert_eq!(next_pow2_len(1023), 1024);
        assert_eq!(next_pow2_len(1024), 1024);
        assert_eq!(next_pow2_len(2047), 2048);
    }
}
