/*! [Reed-Solomon][rs] (255,223) codec.

Systematic encoder and Berlekamp-Massey decoder over GF(2^8), using
the CCSDS parameter set end to end: primitive polynomial 0x11D,
primitive element α = 2, generator roots α^0..α^31.

On the wire the first codeword byte is the highest-degree coefficient:
data occupies positions [0, K), parity [K, N).

The codec corrects up to T = 16 symbol errors per codeword. It makes
no attempt at erasure handling; a block that cannot be corrected is
reported as [`Error::Uncorrectable`] and left to the caller, which by
policy emits the received word unchanged and moves on.

[rs]: https://en.wikipedia.org/wiki/Reed%E2%80%93Solomon_error_correction
 */
use log::{debug, trace};

use crate::gf::{GaloisField, ORDER};
use crate::{Error, Result};

/// Codeword length in symbols.
pub const N: usize = 255;

/// Data symbols per codeword.
pub const K: usize = 223;

/// Parity symbols per codeword.
pub const PARITY: usize = N - K;

/// Correction capability in symbol errors.
pub const T: usize = PARITY / 2;

/// Outcome of a successful decode.
#[derive(Debug, Clone)]
pub struct Correction {
    /// The corrected codeword.
    pub codeword: [u8; N],
    /// Symbol errors corrected. Zero means the word came through clean.
    pub corrected: usize,
}

/// Immutable codec context: field tables plus the generator polynomial.
///
/// Created once at process start. Encode and decode hold no cross-frame
/// state, so one context serves any number of threads by shared
/// reference.
pub struct RsCodec {
    gf: GaloisField,
    /// Generator polynomial g(x) = ∏(x - α^i) for i in [0, 32), stored
    /// low-to-high. Monic, degree 32.
    genpoly: [u8; PARITY + 1],
}

impl RsCodec {
    /// Build the field tables and the generator polynomial.
    #[must_use]
    pub fn new() -> Self {
        let gf = GaloisField::new();
        let mut genpoly = [0u8; PARITY + 1];
        genpoly[0] = 1;
        for i in 0..PARITY {
            // Multiply the running product by (x + α^i).
            let root = gf.alpha(i);
            for j in (1..=i + 1).rev() {
                genpoly[j] = genpoly[j - 1] ^ gf.mul(genpoly[j], root);
            }
            genpoly[0] = gf.mul(genpoly[0], root);
        }
        Self { gf, genpoly }
    }

    /// Systematically encode up to K data bytes into an N-byte codeword.
    ///
    /// Shorter inputs are zero padded to K symbols. The input lands
    /// verbatim in positions [0, K); the 32 parity symbols follow.
    pub fn encode(&self, data: &[u8]) -> Result<[u8; N]> {
        if data.len() > K {
            return Err(Error::PayloadTooLarge {
                got: data.len(),
                max: K,
            });
        }
        let mut codeword = [0u8; N];
        codeword[..data.len()].copy_from_slice(data);

        // LFSR division by the generator polynomial. reg[j] holds the
        // x^j coefficient of the running remainder.
        let mut reg = [0u8; PARITY];
        for i in 0..K {
            let feedback = codeword[i] ^ reg[PARITY - 1];
            for j in (1..PARITY).rev() {
                reg[j] = reg[j - 1] ^ self.gf.mul(self.genpoly[j], feedback);
            }
            reg[0] = self.gf.mul(self.genpoly[0], feedback);
        }
        for (i, &p) in reg.iter().rev().enumerate() {
            codeword[K + i] = p;
        }
        Ok(codeword)
    }

    /// Decode a received word, correcting up to T symbol errors.
    ///
    /// Returns the corrected word together with the number of symbols
    /// corrected, or [`Error::Uncorrectable`] when the error pattern
    /// exceeds the code's capability or the decode is inconsistent.
    pub fn decode(&self, block: &[u8; N]) -> Result<Correction> {
        let synd = self.syndromes(block);
        if synd.iter().all(|&s| s == 0) {
            return Ok(Correction {
                codeword: *block,
                corrected: 0,
            });
        }

        let lambda = self.berlekamp_massey(&synd)?;
        let deg = poly_degree(&lambda);
        if deg == 0 {
            // Nonzero syndromes but a degree zero locator: report the
            // word as clean rather than guess at corrections.
            debug!("RS decode: degree-0 locator despite nonzero syndromes");
            return Ok(Correction {
                codeword: *block,
                corrected: 0,
            });
        }

        // Error evaluator Ω(x) = S(x)·Λ(x) mod x^(2T).
        let mut omega = poly_mul(&self.gf, &synd, &lambda);
        omega.truncate(PARITY);

        // Chien search: an error sits at exponent e iff Λ(α^(-e)) = 0.
        // Wire position of exponent e is N-1-e.
        let mut positions = Vec::with_capacity(deg);
        for e in 0..N {
            if poly_eval(&self.gf, &lambda, self.gf.alpha(ORDER - e)) == 0 {
                if positions.len() == T {
                    return Err(Error::Uncorrectable("more than T error positions"));
                }
                positions.push(N - 1 - e);
            }
        }
        trace!("RS decode: error positions {positions:?}");
        if positions.len() != deg {
            return Err(Error::Uncorrectable(
                "error count does not match locator degree",
            ));
        }

        // Forney: magnitude at exponent e is X·Ω(X^-1)/Λ'(X^-1) with
        // X = α^e. A zero derivative leaves the magnitude undefined, so
        // the block cannot be trusted.
        let deriv = formal_derivative(&lambda);
        let mut codeword = *block;
        for &pos in &positions {
            let e = N - 1 - pos;
            let x_inv = self.gf.alpha(ORDER - e);
            let denom = poly_eval(&self.gf, &deriv, x_inv);
            if denom == 0 {
                return Err(Error::Uncorrectable("zero locator derivative"));
            }
            let num = self.gf.mul(self.gf.alpha(e), poly_eval(&self.gf, &omega, x_inv));
            codeword[pos] ^= self.gf.div(num, denom);
        }
        Ok(Correction {
            codeword,
            corrected: positions.len(),
        })
    }

    /// Syndromes s_i = r(α^i) for i in [0, 2T), by Horner's scheme over
    /// the wire symbol order.
    fn syndromes(&self, block: &[u8; N]) -> [u8; PARITY] {
        let mut synd = [0u8; PARITY];
        for (i, s) in synd.iter_mut().enumerate() {
            let x = self.gf.alpha(i);
            *s = block.iter().fold(0, |acc, &b| self.gf.mul(acc, x) ^ b);
        }
        synd
    }

    /// Berlekamp-Massey: derive the error locator Λ(x) from the
    /// syndromes. Degree bookkeeping doubles as the termination signal
    /// and as the input to the decoder's consistency check.
    fn berlekamp_massey(&self, synd: &[u8; PARITY]) -> Result<Vec<u8>> {
        let mut lambda = vec![1u8];
        let mut prev = vec![1u8];
        let mut l = 0usize;
        let mut m = 1usize;
        let mut last_delta = 1u8;

        for n in 0..PARITY {
            let mut delta = synd[n];
            for i in 1..=l {
                delta ^= self.gf.mul(lambda.get(i).copied().unwrap_or(0), synd[n - i]);
            }
            if delta == 0 {
                m += 1;
                continue;
            }
            let coef = self.gf.div(delta, last_delta);
            if 2 * l <= n {
                let keep = lambda.clone();
                add_scaled_shifted(&self.gf, &mut lambda, &prev, coef, m);
                prev = keep;
                last_delta = delta;
                l = n + 1 - l;
                m = 1;
            } else {
                add_scaled_shifted(&self.gf, &mut lambda, &prev, coef, m);
                m += 1;
            }
        }
        if l > T {
            return Err(Error::Uncorrectable("locator degree exceeds T"));
        }
        Ok(lambda)
    }
}

impl Default for RsCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// p += c · x^shift · q, all polynomials low-to-high.
fn add_scaled_shifted(gf: &GaloisField, p: &mut Vec<u8>, q: &[u8], c: u8, shift: usize) {
    if p.len() < q.len() + shift {
        p.resize(q.len() + shift, 0);
    }
    for (i, &qc) in q.iter().enumerate() {
        p[i + shift] ^= gf.mul(c, qc);
    }
}

/// Degree of a low-to-high polynomial; zero for the zero polynomial.
fn poly_degree(p: &[u8]) -> usize {
    p.iter().rposition(|&c| c != 0).unwrap_or(0)
}

/// Product of two low-to-high polynomials.
fn poly_mul(gf: &GaloisField, a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        if x == 0 {
            continue;
        }
        for (j, &y) in b.iter().enumerate() {
            out[i + j] ^= gf.mul(x, y);
        }
    }
    out
}

/// Evaluate a low-to-high polynomial at `x` by Horner's scheme.
fn poly_eval(gf: &GaloisField, p: &[u8], x: u8) -> u8 {
    p.iter().rev().fold(0, |acc, &c| gf.mul(acc, x) ^ c)
}

/// Formal derivative. Over GF(2^m) only the odd-power terms survive.
fn formal_derivative(p: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; p.len().saturating_sub(1)];
    for (i, &c) in p.iter().enumerate().skip(1).step_by(2) {
        out[i - 1] = c;
    }
    out
}
