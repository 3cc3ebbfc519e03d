use crate::{RTD_A, RTD_B, RTD_C};

/// Temperature in degrees Celsius of a platinum RTD reading `rt` ohms.
///
/// The quadratic form of the Callendar-Van Dusen equation is solved exactly. When the
/// root is negative the cubic term of the equation matters, and the result of
/// [polynomial_temperature] is returned instead. The branch is chosen by the sign of the
/// quadratic root alone, so the single crossover sits at 0 °C.
pub fn resistance_to_temperature(rt: f32, nominal: f32) -> f32 {
    let t = quadratic_temperature(rt, nominal);
    if t >= 0.0 {
        return t;
    }
    // NaN from an out-of-range resistance also ends up here
    polynomial_temperature(rt, nominal)
}

/// Positive root of `R(T) = R0 (1 + A T + B T^2)` for `R(T) = rt`.
///
/// Only accurate at or above 0 °C. Below that it still returns a negative value,
/// which is what selects the polynomial branch in [resistance_to_temperature].
pub fn quadratic_temperature(rt: f32, nominal: f32) -> f32 {
    let z1 = -RTD_A;
    let z2 = RTD_A * RTD_A - 4.0 * RTD_B;
    let z3 = (4.0 * RTD_B) / nominal;
    let z4 = 2.0 * RTD_B;
    (libm::sqrtf(z2 + z3 * rt) + z1) / z4
}

/// 5th-order polynomial approximation of the inverse Callendar-Van Dusen equation
/// below 0 °C, in the resistance normalized to a 100 ohm element.
pub fn polynomial_temperature(rt: f32, nominal: f32) -> f32 {
    let r = rt / nominal * 100.0;
    let mut rpoly = r;
    let mut t = -242.02;
    t += 2.2228 * rpoly;
    rpoly *= r;
    t += 2.5859e-3 * rpoly;
    rpoly *= r;
    t -= 4.8260e-6 * rpoly;
    rpoly *= r;
    t -= 2.8183e-8 * rpoly;
    rpoly *= r;
    t += 1.5243e-10 * rpoly;
    t
}

/// Resistance in ohms of a platinum RTD at `t` degrees Celsius.
///
/// Forward Callendar-Van Dusen equation, including the `C` term below 0 °C.
pub fn temperature_to_resistance(t: f32, nominal: f32) -> f32 {
    let mut r = 1.0 + RTD_A * t + RTD_B * t * t;
    if t < 0.0 {
        r += RTD_C * (t - 100.0) * t * t * t;
    }
    nominal * r
}
