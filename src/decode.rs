//! Interpretation of validated frames into typed telemetry messages.
//!
//! All unit conversion happens here so the rest of the crate only ever sees
//! SI values: scaled-integer degrees become `f64` degrees, millimetres become
//! metres, millivolts become volts, centiamps become amps, radians become
//! degrees. Sentinel raw values ("field not provided") decode to `None`
//! rather than a literal zero.

use crate::snapshot::{Attitude, GpsFix, Vec3};
use mavlink::common::{GpsFixType, MavAutopilot, MavMessage, MavModeFlag, MavType};

/// Closed set of telemetry messages the reconciler understands.
///
/// Anything else on the wire decodes to [`TypedMessage::Unrecognized`] and is
/// dropped without effect.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedMessage {
    Heartbeat {
        autopilot: MavAutopilot,
        vehicle_type: MavType,
        base_mode: MavModeFlag,
        custom_mode: u32,
    },
    SystemStatus {
        battery_percent: Option<f32>,
        battery_voltage: Option<f32>,
        battery_current: Option<f32>,
    },
    Battery {
        battery_percent: Option<f32>,
        battery_voltage: Option<f32>,
        battery_current: Option<f32>,
    },
    GpsRaw {
        fix: GpsFix,
        satellites: u8,
        lat: Option<f64>,
        lon: Option<f64>,
        alt_m: Option<f64>,
    },
    GlobalPosition {
        lat: Option<f64>,
        lon: Option<f64>,
        alt_m: Option<f64>,
        relative_alt_m: Option<f64>,
        velocity: Vec3,
    },
    LocalPosition {
        position: Vec3,
    },
    Attitude {
        attitude: Attitude,
    },
    StatusText {
        severity: u8,
        text: String,
    },
    Unrecognized,
}

impl TypedMessage {
    /// Maps one wire message into its typed form, applying scaling and
    /// sentinel rules.
    pub fn from_wire(msg: &MavMessage) -> Self {
        match msg {
            MavMessage::HEARTBEAT(m) => TypedMessage::Heartbeat {
                autopilot: m.autopilot,
                vehicle_type: m.mavtype,
                base_mode: m.base_mode,
                custom_mode: m.custom_mode,
            },
            MavMessage::SYS_STATUS(m) => TypedMessage::SystemStatus {
                battery_percent: percent_from_raw(m.battery_remaining),
                // millivolts, 0 = not provided
                battery_voltage: (m.voltage_battery > 0)
                    .then(|| f32::from(m.voltage_battery) / 1000.0),
                battery_current: current_from_raw(m.current_battery),
            },
            MavMessage::BATTERY_STATUS(m) => TypedMessage::Battery {
                battery_percent: percent_from_raw(m.battery_remaining),
                battery_voltage: first_cell_voltage(&m.voltages),
                battery_current: current_from_raw(m.current_battery),
            },
            MavMessage::GPS_RAW_INT(m) => TypedMessage::GpsRaw {
                fix: gps_fix_from_wire(m.fix_type),
                satellites: m.satellites_visible,
                lat: coordinate_from_raw(m.lat),
                lon: coordinate_from_raw(m.lon),
                alt_m: altitude_from_raw(m.alt),
            },
            MavMessage::GLOBAL_POSITION_INT(m) => TypedMessage::GlobalPosition {
                lat: coordinate_from_raw(m.lat),
                lon: coordinate_from_raw(m.lon),
                alt_m: altitude_from_raw(m.alt),
                relative_alt_m: altitude_from_raw(m.relative_alt),
                // cm/s, zero is a legitimate velocity
                velocity: Vec3 {
                    x: f32::from(m.vx) / 100.0,
                    y: f32::from(m.vy) / 100.0,
                    z: f32::from(m.vz) / 100.0,
                },
            },
            MavMessage::LOCAL_POSITION_NED(m) => TypedMessage::LocalPosition {
                position: Vec3 {
                    x: m.x,
                    y: m.y,
                    z: m.z,
                },
            },
            MavMessage::ATTITUDE(m) => TypedMessage::Attitude {
                attitude: Attitude {
                    roll: m.roll.to_degrees(),
                    pitch: m.pitch.to_degrees(),
                    yaw: m.yaw.to_degrees(),
                },
            },
            MavMessage::STATUSTEXT(m) => TypedMessage::StatusText {
                severity: m.severity as u8,
                text: text_from_raw(&m.text),
            },
            _ => TypedMessage::Unrecognized,
        }
    }
}

/// `°×1e7` scaled integer; raw 0 means "not provided".
fn coordinate_from_raw(raw: i32) -> Option<f64> {
    (raw != 0).then(|| f64::from(raw) / 1e7)
}

/// Millimetres; raw 0 means "not provided".
fn altitude_from_raw(raw: i32) -> Option<f64> {
    (raw != 0).then(|| f64::from(raw) / 1000.0)
}

/// Centiamps; raw -1 means "not provided".
fn current_from_raw(raw: i16) -> Option<f32> {
    (raw >= 0).then(|| f32::from(raw) / 100.0)
}

/// Percent 0-100; raw -1 means "not provided".
fn percent_from_raw(raw: i8) -> Option<f32> {
    (raw >= 0).then(|| f32::from(raw))
}

/// First usable per-cell reading in millivolts. Unpopulated cells report
/// `u16::MAX`.
fn first_cell_voltage(voltages: &[u16]) -> Option<f32> {
    voltages
        .iter()
        .find(|&&mv| mv > 0 && mv != u16::MAX)
        .map(|&mv| f32::from(mv) / 1000.0)
}

/// NUL-padded fixed-width text field; trimmed of padding and whitespace.
fn text_from_raw(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_matches(char::from(0))
        .trim()
        .to_string()
}

fn gps_fix_from_wire(fix: GpsFixType) -> GpsFix {
    match fix {
        GpsFixType::GPS_FIX_TYPE_NO_GPS => GpsFix::NoGps,
        GpsFixType::GPS_FIX_TYPE_NO_FIX => GpsFix::NoFix,
        GpsFixType::GPS_FIX_TYPE_2D_FIX => GpsFix::Fix2d,
        GpsFixType::GPS_FIX_TYPE_3D_FIX => GpsFix::Fix3d,
        GpsFixType::GPS_FIX_TYPE_DGPS => GpsFix::Dgps,
        GpsFixType::GPS_FIX_TYPE_RTK_FLOAT => GpsFix::RtkFloat,
        GpsFixType::GPS_FIX_TYPE_RTK_FIXED => GpsFix::RtkFixed,
        GpsFixType::GPS_FIX_TYPE_STATIC => GpsFix::Static,
        GpsFixType::GPS_FIX_TYPE_PPP => GpsFix::Ppp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mavlink::common::{
        ATTITUDE_DATA, BATTERY_STATUS_DATA, GPS_RAW_INT_DATA, MavSeverity, STATUSTEXT_DATA,
        SYS_STATUS_DATA,
    };

    #[test]
    fn test_gps_zero_lat_lon_decode_to_absent() {
        let msg = MavMessage::GPS_RAW_INT(GPS_RAW_INT_DATA {
            lat: 0,
            lon: 0,
            alt: 0,
            fix_type: GpsFixType::GPS_FIX_TYPE_NO_FIX,
            satellites_visible: 4,
            ..Default::default()
        });
        match TypedMessage::from_wire(&msg) {
            TypedMessage::GpsRaw {
                lat, lon, alt_m, ..
            } => {
                assert_eq!(lat, None);
                assert_eq!(lon, None);
                assert_eq!(alt_m, None);
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn test_gps_scaling() {
        let msg = MavMessage::GPS_RAW_INT(GPS_RAW_INT_DATA {
            lat: 473_977_420,
            lon: 85_455_940,
            alt: 488_200,
            fix_type: GpsFixType::GPS_FIX_TYPE_3D_FIX,
            satellites_visible: 11,
            ..Default::default()
        });
        match TypedMessage::from_wire(&msg) {
            TypedMessage::GpsRaw {
                fix,
                satellites,
                lat,
                lon,
                alt_m,
            } => {
                assert_eq!(fix, GpsFix::Fix3d);
                assert_eq!(satellites, 11);
                assert!((lat.expect("lat") - 47.397742).abs() < 1e-9);
                assert!((lon.expect("lon") - 8.545594).abs() < 1e-9);
                assert!((alt_m.expect("alt") - 488.2).abs() < 1e-9);
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn test_sys_status_battery_scaling_and_sentinels() {
        let msg = MavMessage::SYS_STATUS(SYS_STATUS_DATA {
            voltage_battery: 15_800,
            current_battery: 1_250,
            battery_remaining: 73,
            ..Default::default()
        });
        match TypedMessage::from_wire(&msg) {
            TypedMessage::SystemStatus {
                battery_percent,
                battery_voltage,
                battery_current,
            } => {
                assert_eq!(battery_percent, Some(73.0));
                assert!((battery_voltage.expect("voltage") - 15.8).abs() < 1e-6);
                assert!((battery_current.expect("current") - 12.5).abs() < 1e-6);
            }
            other => panic!("unexpected decode: {other:?}"),
        }

        let invalid = MavMessage::SYS_STATUS(SYS_STATUS_DATA {
            voltage_battery: 0,
            current_battery: -1,
            battery_remaining: -1,
            ..Default::default()
        });
        match TypedMessage::from_wire(&invalid) {
            TypedMessage::SystemStatus {
                battery_percent,
                battery_voltage,
                battery_current,
            } => {
                assert_eq!(battery_percent, None);
                assert_eq!(battery_voltage, None);
                assert_eq!(battery_current, None);
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn test_battery_status_skips_unpopulated_cells() {
        let mut voltages = [u16::MAX; 10];
        voltages[2] = 3_921;
        let msg = MavMessage::BATTERY_STATUS(BATTERY_STATUS_DATA {
            voltages,
            current_battery: -1,
            battery_remaining: 55,
            ..Default::default()
        });
        match TypedMessage::from_wire(&msg) {
            TypedMessage::Battery {
                battery_percent,
                battery_voltage,
                battery_current,
            } => {
                assert_eq!(battery_percent, Some(55.0));
                assert!((battery_voltage.expect("voltage") - 3.921).abs() < 1e-6);
                assert_eq!(battery_current, None);
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn test_attitude_radians_to_degrees() {
        let msg = MavMessage::ATTITUDE(ATTITUDE_DATA {
            roll: std::f32::consts::FRAC_PI_2,
            pitch: -std::f32::consts::FRAC_PI_4,
            yaw: std::f32::consts::PI,
            ..Default::default()
        });
        match TypedMessage::from_wire(&msg) {
            TypedMessage::Attitude { attitude } => {
                assert!((attitude.roll - 90.0).abs() < 1e-3);
                assert!((attitude.pitch + 45.0).abs() < 1e-3);
                assert!((attitude.yaw - 180.0).abs() < 1e-3);
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn test_status_text_trims_padding() {
        let mut text = [0u8; 50];
        text[..14].copy_from_slice(b"  EKF2 ready  ");
        let msg = MavMessage::STATUSTEXT(STATUSTEXT_DATA {
            severity: MavSeverity::MAV_SEVERITY_INFO,
            text,
            ..Default::default()
        });
        match TypedMessage::from_wire(&msg) {
            TypedMessage::StatusText { severity, text } => {
                assert_eq!(severity, 6);
                assert_eq!(text, "EKF2 ready");
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn test_unhandled_message_is_unrecognized() {
        let msg = MavMessage::PARAM_VALUE(Default::default());
        assert_eq!(TypedMessage::from_wire(&msg), TypedMessage::Unrecognized);
    }
}
