use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Reciprocal square root in pure fixed-point arithmetic.
///
/// The argument is first rescaled into a bracket around 1 where the initial
/// guess y = 1 is close enough, then refined with three Newton-Raphson steps
/// of y = y * (3/2 - x * y^2 / 2). Non-positive inputs return 1 so callers
/// never divide by zero.
pub fn inv_sqrt(x: Fixed64) -> Fixed64 {
    if x <= Fixed64::ZERO {
        return Fixed64::ONE;
    }
    let hi = Fixed64::from_num(1.5);
    let lo = Fixed64::from_num(2.0 / 3.0);
    let mut y = Fixed64::ONE;
    while x * y * y > hi {
        y = y * 5 / 7;
    }
    while x * y * y < lo {
        y = y * 7 / 5;
    }
    for _ in 0..3 {
        let e = x * y * y;
        y = y * (hi - e / 2);
    }
    y
}

/// Euclidean length of the vector (dx, dy), via `inv_sqrt`.
pub fn hypot(dx: Fixed64, dy: Fixed64) -> Fixed64 {
    let qu = dx * dx + dy * dy;
    if qu == Fixed64::ZERO {
        return Fixed64::ZERO;
    }
    qu * inv_sqrt(qu)
}
