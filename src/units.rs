//! Pure conversions between user-facing units and wire units. Time fields
//! travel as microseconds; loss limits travel on a 0-255 scale.

/// Loss tolerance, percent to wire scale (floor).
pub fn loss_percent_to_wire(percent: u64) -> u8 {
    (percent.min(100) * 255 / 100) as u8
}

/// Wire-scale loss back to a percentage, rounded for display only.
pub fn loss_wire_to_percent(wire: u8) -> u8 {
    ((u32::from(wire) * 100 + 127) / 255) as u8
}

/// Milliseconds to wire time units.
pub fn ms_to_wire(ms: u64) -> u64 {
    ms * 1000
}

/// Wire time units to whole milliseconds.
pub fn wire_to_ms(wire: u64) -> u64 {
    wire / 1000
}

/// Wire time units to fractional milliseconds, for RTT display.
pub fn wire_to_ms_f(wire: u64) -> f64 {
    wire as f64 / 1e3
}

/// Seconds to wire time units, for the beat interval option.
pub fn secs_to_wire(secs: u64) -> u64 {
    secs * 1_000_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loss_limit_scale() {
        assert_eq!(loss_percent_to_wire(0), 0);
        assert_eq!(loss_percent_to_wire(100), 255);
        // 50% is 127.5 on the wire scale; the floor wins.
        assert_eq!(loss_percent_to_wire(50), 127);
        assert_eq!(loss_percent_to_wire(1), 2);
    }

    #[test]
    fn loss_limit_display_rounds() {
        assert_eq!(loss_wire_to_percent(0), 0);
        assert_eq!(loss_wire_to_percent(255), 100);
        assert_eq!(loss_wire_to_percent(127), 50);
    }

    #[test]
    fn time_scale() {
        assert_eq!(ms_to_wire(200), 200_000);
        assert_eq!(wire_to_ms(200_000), 200);
        assert_eq!(secs_to_wire(1), 1_000_000);
        assert_eq!(wire_to_ms_f(12_345), 12.345);
    }
}
