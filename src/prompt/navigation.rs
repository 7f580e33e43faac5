//! Navigation phrase
//!
//! Builds the "where to look" sentence fragment for a POI from the
//! aircraft's predicted position and heading. Close POIs get a glance
//! direction, distant ones a compass or clock position with a rounded
//! distance.

use crate::config::UnitSystem;
use crate::geo;
use crate::model::Telemetry;

/// Inside this range the POI is "right there" and gets no distance.
const NEAR_KM: f64 = 4.5;

const COMPASS_POINTS: [&str; 8] = [
    "north",
    "northeast",
    "east",
    "southeast",
    "south",
    "southwest",
    "west",
    "northwest",
];

/// Build the navigation phrase for a POI. Empty when the aircraft is
/// parked next to it.
pub fn navigation_phrase(tel: &Telemetry, poi_lat: f64, poi_lon: f64, units: UnitSystem) -> String {
    let (from_lat, from_lon) = tel.reference_position();
    let distance_km = geo::distance_km(from_lat, from_lon, poi_lat, poi_lon);
    let bearing = geo::bearing_deg(from_lat, from_lon, poi_lat, poi_lon);

    let phrase = if distance_km < NEAR_KM {
        if tel.on_ground {
            return String::new();
        }
        let rel = geo::relative_bearing_deg(bearing, tel.heading_deg);
        sector_phrase(rel).to_string()
    } else {
        let distance = distance_phrase(distance_km, units);
        if tel.on_ground {
            format!("to the {}, {}", compass_point(bearing), distance)
        } else {
            let rel = geo::relative_bearing_deg(bearing, tel.heading_deg);
            format!("at your {} o'clock, {}", clock_position(rel), distance)
        }
    };

    uppercase_first(&phrase)
}

/// Relative sector for nearby airborne POIs. Half-open sectors:
/// 345..15 ahead, 15..135 right, 135..225 behind, 225..345 left.
fn sector_phrase(relative_bearing: f64) -> &'static str {
    if !(15.0..345.0).contains(&relative_bearing) {
        "straight ahead"
    } else if relative_bearing < 135.0 {
        "on your right"
    } else if relative_bearing < 225.0 {
        "behind you"
    } else {
        "on your left"
    }
}

/// 8-point compass from a true bearing.
fn compass_point(bearing: f64) -> &'static str {
    let idx = (((bearing + 22.5).rem_euclid(360.0)) / 45.0) as usize % 8;
    COMPASS_POINTS[idx]
}

/// 12-hour clock position from a relative bearing; dead ahead is 12.
fn clock_position(relative_bearing: f64) -> u32 {
    let clock = (((relative_bearing + 15.0).rem_euclid(360.0)) / 30.0) as u32 % 12;
    if clock == 0 {
        12
    } else {
        clock
    }
}

fn distance_phrase(distance_km: f64, units: UnitSystem) -> String {
    let (value, unit_one, unit_many) = if units.uses_kilometers() {
        (distance_km, "kilometer", "kilometers")
    } else {
        (distance_km / geo::KM_PER_NM, "mile", "miles")
    };
    let rounded = humanize_distance(value);
    let unit = if rounded == 1 { unit_one } else { unit_many };
    format!("about {} {} away", rounded, unit)
}

/// Round to a speakable figure: whole numbers under ten, fives under a
/// hundred, tens beyond.
fn humanize_distance(value: f64) -> u64 {
    if value < 10.0 {
        value.round() as u64
    } else if value < 100.0 {
        ((value / 5.0).round() * 5.0) as u64
    } else {
        ((value / 10.0).round() * 10.0) as u64
    }
}

fn uppercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
