//! De Broglie wavelength formula.

/// Planck constant in J·s (exact since the 2019 SI redefinition).
pub const PLANCK_CONSTANT: f64 = 6.62607015e-34;

/// Compute the de Broglie wavelength `h / (m * v)` in metres.
///
/// Returns `0.0` when either input is non-positive (or NaN), since the
/// formula is meaningless there and would otherwise divide by zero.
pub fn compute_wavelength(mass_kg: f64, velocity_m_s: f64) -> f64 {
    if !(mass_kg > 0.0 && velocity_m_s > 0.0) {
        return 0.0;
    }
    PLANCK_CONSTANT / (mass_kg * velocity_m_s)
}
