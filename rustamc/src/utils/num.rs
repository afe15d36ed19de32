/// Model time in year fractions relative to the valuation date. Date
/// arithmetic and day counting happen upstream; this crate only ever sees
/// resolved times.
pub type Time = f64;

/// Two times closer than this are treated as the same simulation time.
pub const TIME_TOLERANCE: f64 = 1e-10;

pub fn same_time(a: Time, b: Time) -> bool {
    (a - b).abs() < TIME_TOLERANCE
}
