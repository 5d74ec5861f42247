//! The vehicle state snapshot and the reconciliation step that produces it.
//!
//! A snapshot is an immutable value. Applying a message yields a new snapshot
//! in which only the fields carried by that message changed; everything else
//! is copied from the previous one. Absence of a field means "never
//! observed", not zero.

use crate::decode::TypedMessage;
use crate::modes;
use mavlink::common::MavModeFlag;
use std::time::{Duration, Instant};

/// A three-axis vector (NED frame for both velocity and local position).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Vehicle attitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attitude {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

/// GPS fix quality, ordinal-compatible with the MAVLink `GPS_FIX_TYPE` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpsFix {
    NoGps = 0,
    NoFix = 1,
    Fix2d = 2,
    Fix3d = 3,
    Dgps = 4,
    RtkFloat = 5,
    RtkFixed = 6,
    Static = 7,
    Ppp = 8,
}

impl GpsFix {
    /// Returns `true` for any fix good enough to trust a position (3D or
    /// better).
    pub fn has_position(self) -> bool {
        self as u8 >= GpsFix::Fix3d as u8
    }
}

/// Best-known vehicle state at a point in time.
///
/// Every field except `connected` is independently optional. Consumers
/// receive clones and must treat them as immutable values; a new snapshot is
/// published for every accepted state-bearing message, even when no visible
/// field changed (a heartbeat always refreshes its timestamp).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub connected: bool,
    pub last_heartbeat: Option<Instant>,
    pub mode: Option<String>,
    pub armed: Option<bool>,
    pub battery_percent: Option<f32>,
    pub battery_voltage: Option<f32>,
    pub battery_current: Option<f32>,
    pub gps_fix: Option<GpsFix>,
    pub satellites: Option<u8>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt_m: Option<f64>,
    pub relative_alt_m: Option<f64>,
    pub velocity: Option<Vec3>,
    pub local_position: Option<Vec3>,
    pub attitude: Option<Attitude>,
}

impl TelemetrySnapshot {
    /// Time since the last heartbeat, if one was ever seen. Consumers decide
    /// their own staleness threshold at their own cadence.
    pub fn heartbeat_age(&self) -> Option<Duration> {
        self.last_heartbeat.map(|t| t.elapsed())
    }

    /// Derives the successor snapshot for one decoded message.
    ///
    /// Fields the message carries are overwritten; fields a message marks as
    /// "not provided" (decoded to `None`) keep their previous value.
    /// `StatusText` and `Unrecognized` leave the snapshot untouched.
    pub fn apply(&self, msg: &TypedMessage, now: Instant) -> Self {
        let mut next = self.clone();
        match msg {
            TypedMessage::Heartbeat {
                autopilot,
                vehicle_type,
                base_mode,
                custom_mode,
            } => {
                next.last_heartbeat = Some(now);
                next.armed = Some(base_mode.contains(MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED));
                next.mode = Some(modes::resolve_mode(
                    *autopilot,
                    *vehicle_type,
                    *base_mode,
                    *custom_mode,
                ));
            }
            TypedMessage::SystemStatus {
                battery_percent,
                battery_voltage,
                battery_current,
            }
            | TypedMessage::Battery {
                battery_percent,
                battery_voltage,
                battery_current,
            } => {
                if battery_percent.is_some() {
                    next.battery_percent = *battery_percent;
                }
                if battery_voltage.is_some() {
                    next.battery_voltage = *battery_voltage;
                }
                if battery_current.is_some() {
                    next.battery_current = *battery_current;
                }
            }
            TypedMessage::GpsRaw {
                fix,
                satellites,
                lat,
                lon,
                alt_m,
            } => {
                next.gps_fix = Some(*fix);
                next.satellites = Some(*satellites);
                if lat.is_some() {
                    next.lat = *lat;
                }
                if lon.is_some() {
                    next.lon = *lon;
                }
                if alt_m.is_some() {
                    next.alt_m = *alt_m;
                }
            }
            TypedMessage::GlobalPosition {
                lat,
                lon,
                alt_m,
                relative_alt_m,
                velocity,
            } => {
                if lat.is_some() {
                    next.lat = *lat;
                }
                if lon.is_some() {
                    next.lon = *lon;
                }
                if alt_m.is_some() {
                    next.alt_m = *alt_m;
                }
                if relative_alt_m.is_some() {
                    next.relative_alt_m = *relative_alt_m;
                }
                next.velocity = Some(*velocity);
            }
            TypedMessage::LocalPosition { position } => {
                next.local_position = Some(*position);
            }
            TypedMessage::Attitude { attitude } => {
                next.attitude = Some(*attitude);
            }
            // Status text goes to the log side channel; unknown ids are no-ops.
            TypedMessage::StatusText { .. } | TypedMessage::Unrecognized => {}
        }
        next
    }
}
