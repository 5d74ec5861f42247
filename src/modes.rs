//! Flight-mode name resolution and status-text severity formatting.
//!
//! Firmware families encode the active flight mode differently: PX4 packs a
//! main/sub mode pair into the upper bytes of `custom_mode`, ArduPilot uses a
//! flat per-vehicle enumeration. Resolution tries the vendor-specific table
//! first and degrades through generic base-mode flags down to a literal
//! rendering of the raw code, so unrecognized firmware still yields a usable
//! label.

use mavlink::common::{MavAutopilot, MavModeFlag, MavType};

// PX4 custom_mode layout: byte 2 = main mode, byte 3 = sub mode.
const PX4_MAIN_MODE_SHIFT: u32 = 16;
const PX4_SUB_MODE_SHIFT: u32 = 24;
const PX4_MAIN_MODE_AUTO: u32 = 4;

/// Resolves a heartbeat's identity and mode bits into a human-readable
/// flight-mode label.
///
/// Resolution order: vendor-specific custom-mode decoding (PX4, then
/// ArduPilot by vehicle class), generic base-mode flags, and finally a
/// literal `CM:<n>` rendering of the raw custom mode. First matching vendor
/// wins.
pub fn resolve_mode(
    autopilot: MavAutopilot,
    vehicle_type: MavType,
    base_mode: MavModeFlag,
    custom_mode: u32,
) -> String {
    match autopilot {
        MavAutopilot::MAV_AUTOPILOT_PX4 => {
            if let Some(label) = px4_mode(custom_mode) {
                return label;
            }
        }
        MavAutopilot::MAV_AUTOPILOT_ARDUPILOTMEGA => {
            if let Some(label) = ardupilot_mode(vehicle_type, custom_mode) {
                return label.to_string();
            }
        }
        _ => {}
    }

    if base_mode.contains(MavModeFlag::MAV_MODE_FLAG_AUTO_ENABLED) {
        "AUTO".to_string()
    } else if base_mode.contains(MavModeFlag::MAV_MODE_FLAG_GUIDED_ENABLED) {
        "GUIDED".to_string()
    } else if base_mode.contains(MavModeFlag::MAV_MODE_FLAG_MANUAL_INPUT_ENABLED) {
        "MANUAL".to_string()
    } else {
        format!("CM:{custom_mode}")
    }
}

/// PX4 bit-packed main/sub mode decoding.
fn px4_mode(custom_mode: u32) -> Option<String> {
    let main = (custom_mode >> PX4_MAIN_MODE_SHIFT) & 0xFF;
    let sub = (custom_mode >> PX4_SUB_MODE_SHIFT) & 0xFF;

    if main == PX4_MAIN_MODE_AUTO {
        return Some(match px4_auto_sub_mode(sub) {
            Some(label) => format!("AUTO {label}"),
            None => "AUTO".to_string(),
        });
    }

    let label = match main {
        1 => "MANUAL",
        2 => "ALTCTL",
        3 => "POSCTL",
        5 => "ACRO",
        6 => "OFFBOARD",
        7 => "STABILIZED",
        8 => "RATTITUDE",
        _ => return None,
    };
    Some(label.to_string())
}

fn px4_auto_sub_mode(sub: u32) -> Option<&'static str> {
    let label = match sub {
        1 => "READY",
        2 => "TAKEOFF",
        3 => "LOITER",
        4 => "MISSION",
        5 => "RTL",
        6 => "LAND",
        7 => "RTGS",
        8 => "FOLLOW",
        9 => "PRECLAND",
        _ => return None,
    };
    Some(label)
}

/// ArduPilot flat custom-mode tables, selected by vehicle class.
fn ardupilot_mode(vehicle_type: MavType, custom_mode: u32) -> Option<&'static str> {
    match vehicle_type {
        MavType::MAV_TYPE_QUADROTOR
        | MavType::MAV_TYPE_HEXAROTOR
        | MavType::MAV_TYPE_OCTOROTOR
        | MavType::MAV_TYPE_TRICOPTER
        | MavType::MAV_TYPE_COAXIAL
        | MavType::MAV_TYPE_HELICOPTER => copter_mode(custom_mode),
        MavType::MAV_TYPE_FIXED_WING => plane_mode(custom_mode),
        MavType::MAV_TYPE_GROUND_ROVER => rover_mode(custom_mode),
        _ => None,
    }
}

fn copter_mode(custom_mode: u32) -> Option<&'static str> {
    let label = match custom_mode {
        0 => "STABILIZE",
        1 => "ACRO",
        2 => "ALT_HOLD",
        3 => "AUTO",
        4 => "GUIDED",
        5 => "LOITER",
        6 => "RTL",
        7 => "CIRCLE",
        9 => "LAND",
        11 => "DRIFT",
        13 => "SPORT",
        14 => "FLIP",
        15 => "AUTOTUNE",
        16 => "POSHOLD",
        17 => "BRAKE",
        18 => "THROW",
        19 => "AVOID_ADSB",
        20 => "GUIDED_NOGPS",
        21 => "SMART_RTL",
        22 => "FLOWHOLD",
        23 => "FOLLOW",
        24 => "ZIGZAG",
        _ => return None,
    };
    Some(label)
}

fn plane_mode(custom_mode: u32) -> Option<&'static str> {
    let label = match custom_mode {
        0 => "MANUAL",
        1 => "CIRCLE",
        2 => "STABILIZE",
        3 => "TRAINING",
        4 => "ACRO",
        5 => "FBWA",
        6 => "FBWB",
        7 => "CRUISE",
        8 => "AUTOTUNE",
        10 => "AUTO",
        11 => "RTL",
        12 => "LOITER",
        15 => "GUIDED",
        17 => "QSTABILIZE",
        18 => "QHOVER",
        19 => "QLOITER",
        20 => "QLAND",
        21 => "QRTL",
        _ => return None,
    };
    Some(label)
}

fn rover_mode(custom_mode: u32) -> Option<&'static str> {
    let label = match custom_mode {
        0 => "MANUAL",
        1 => "ACRO",
        3 => "STEERING",
        4 => "HOLD",
        5 => "LOITER",
        6 => "FOLLOW",
        7 => "SIMPLE",
        10 => "AUTO",
        11 => "RTL",
        12 => "SMART_RTL",
        15 => "GUIDED",
        _ => return None,
    };
    Some(label)
}

/// Label for a MAVLink STATUSTEXT severity ordinal.
pub fn severity_label(severity: u8) -> &'static str {
    match severity {
        0..=2 => "CRIT",
        3 => "ERROR",
        4 => "WARN",
        5 | 6 => "INFO",
        _ => "DEBUG",
    }
}

/// Renders a status text as one log line, or `None` when the trimmed text is
/// empty.
pub fn format_status_text(severity: u8, text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(format!("{} {}", severity_label(severity), text))
}
