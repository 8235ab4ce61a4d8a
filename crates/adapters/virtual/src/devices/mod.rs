//! The fixed set of simulated sensors.
//!
//! Entity ids and hub device ids are constants so registrations stay
//! stable across restarts.

mod sensor;

pub use sensor::{VirtualSensor, Waveform};

pub const WEATHER_STATION: &str = "virtual_weather_station";
pub const AIR_PURIFIER: &str = "virtual_air_purifier";

/// Sensors provided by the virtual hub.
#[must_use]
pub fn catalog() -> Vec<VirtualSensor> {
    vec![
        VirtualSensor {
            entity_id: "sensor.outside_temperature",
            friendly_name: "Outside Temperature",
            device_id: Some(WEATHER_STATION),
            model: Some("WS-2000"),
            device_class: Some("temperature"),
            unit: Some("\u{b0}C"),
            waveform: Waveform {
                base: 12.0,
                amplitude: 6.0,
                period: 24,
            },
            dropout_every: None,
        },
        VirtualSensor {
            entity_id: "sensor.outside_humidity",
            friendly_name: "Outside Humidity",
            device_id: Some(WEATHER_STATION),
            model: Some("WS-2000"),
            device_class: Some("humidity"),
            unit: Some("%"),
            waveform: Waveform {
                base: 65.0,
                amplitude: 15.0,
                period: 24,
            },
            dropout_every: None,
        },
        VirtualSensor {
            entity_id: "sensor.washing_machine_power",
            friendly_name: "Washing Machine Power",
            device_id: None,
            model: None,
            device_class: Some("power"),
            unit: Some("W"),
            waveform: Waveform {
                base: 400.0,
                amplitude: 350.0,
                period: 10,
            },
            dropout_every: Some(10),
        },
        VirtualSensor {
            entity_id: "sensor.air_quality_index",
            friendly_name: "Air Quality Index",
            device_id: Some(AIR_PURIFIER),
            model: Some("AP-300"),
            device_class: None,
            unit: None,
            waveform: Waveform {
                base: 40.0,
                amplitude: 20.0,
                period: 16,
            },
            dropout_every: None,
        },
    ]
}
