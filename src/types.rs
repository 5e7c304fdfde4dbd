use serde::Serialize;

use crate::protocol::Code;
use crate::{Error, Result};

macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $($variant:ident = $code:literal => $label:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
        #[serde(try_from = "Code", into = "u8")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            // Upstream code order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn code(self) -> u8 {
                match self {
                    $($name::$variant => $code),+
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl TryFrom<u8> for $name {
            type Error = Error;

            fn try_from(code: u8) -> Result<Self> {
                match code {
                    $($code => Ok($name::$variant),)+
                    _ => Err(Error::InvalidCode { field: $field, code }),
                }
            }
        }

        impl TryFrom<Code> for $name {
            type Error = Error;

            fn try_from(code: Code) -> Result<Self> {
                $name::try_from(code.0)
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value.code()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

coded_enum! {
    OperatingState, "System_Status" {
        Idle = 0 => "Idle",
        Heating = 1 => "Heating",
        Cooling = 2 => "Cooling",
        Waiting = 3 => "Waiting",
    }
}

coded_enum! {
    OperationMode, "Operation_Mode" {
        Off = 0 => "Off",
        HeatOnly = 1 => "Heat only",
        CoolOnly = 2 => "Cool only",
        HeatOrCool = 3 => "Heat or Cool",
        EmergencyHeat = 4 => "Emergency Heat",
    }
}

coded_enum! {
    FanMode, "Fan_Mode" {
        Auto = 0 => "Auto",
        On = 1 => "On",
        Circulate = 2 => "Circulate",
    }
}

coded_enum! {
    TemperatureUnits, "Pref_Temp_Units" {
        Fahrenheit = 0 => "\u{00b0}F",
        Celsius = 1 => "\u{00b0}C",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitPreference {
    /// Follow the unit preference stored on the thermostat.
    #[default]
    Device,
    Fixed(TemperatureUnits),
}

impl UnitPreference {
    /// Maps an upstream unit code. Anything other than 0 or 1 means "use the
    /// thermostat's own preference".
    pub fn from_code(code: u8) -> Self {
        match TemperatureUnits::try_from(code) {
            Ok(units) => UnitPreference::Fixed(units),
            Err(_) => UnitPreference::Device,
        }
    }
}

/// A set-point change.
///
/// `Pair` always sets both: the lower value becomes the heat set point and the
/// higher the cool set point. `Single` targets whichever set point the current
/// operation mode uses, and is ignored in `Off` and `HeatOrCool`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetPointUpdate {
    Pair(f64, f64),
    Single(f64),
}

impl From<(f64, f64)> for SetPointUpdate {
    fn from((a, b): (f64, f64)) -> Self {
        SetPointUpdate::Pair(a, b)
    }
}

impl From<f64> for SetPointUpdate {
    fn from(value: f64) -> Self {
        SetPointUpdate::Single(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermostatSnapshot {
    pub state: OperatingState,
    pub operation_mode: OperationMode,
    pub fan_mode: FanMode,
    /// Raw `Away_Mode` flag; non-zero means away.
    pub away_mode: u8,
    /// The thermostat's stored unit preference.
    pub temperature_units: TemperatureUnits,
    pub current_temperature: f64,
    pub current_humidity: f64,
    pub heat_set_point: f64,
    pub cool_set_point: f64,
}

impl ThermostatSnapshot {
    pub fn is_away(&self) -> bool {
        self.away_mode != 0
    }

    pub fn set_points(&self) -> (f64, f64) {
        (self.heat_set_point, self.cool_set_point)
    }

    /// Returns whether either set point changed. A `Single` value is not
    /// checked against the other set point, so it can leave heat above cool.
    pub fn apply_set_points(&mut self, update: SetPointUpdate) -> bool {
        let before = self.set_points();
        match update {
            SetPointUpdate::Pair(a, b) => {
                self.heat_set_point = a.min(b);
                self.cool_set_point = a.max(b);
            }
            SetPointUpdate::Single(value) => match self.operation_mode {
                OperationMode::HeatOnly | OperationMode::EmergencyHeat => {
                    self.heat_set_point = value;
                }
                OperationMode::CoolOnly => self.cool_set_point = value,
                OperationMode::Off | OperationMode::HeatOrCool => {}
            },
        }
        before != self.set_points()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub serial_number: String,
    pub state: u8,
    pub state_text: &'static str,
    pub op_mode: u8,
    pub op_mode_text: &'static str,
    pub fan_mode: u8,
    pub fan_mode_text: &'static str,
    pub away_mode: u8,
    pub temperature_units: u8,
    pub temperature_units_text: &'static str,
    pub current_temperature: f64,
    pub current_humidity: f64,
    pub heat_to: f64,
    pub cool_to: f64,
}

impl StatusReport {
    pub fn new(
        serial_number: &str,
        snapshot: &ThermostatSnapshot,
        units: TemperatureUnits,
    ) -> Self {
        Self {
            serial_number: serial_number.to_string(),
            state: snapshot.state.code(),
            state_text: snapshot.state.label(),
            op_mode: snapshot.operation_mode.code(),
            op_mode_text: snapshot.operation_mode.label(),
            fan_mode: snapshot.fan_mode.code(),
            fan_mode_text: snapshot.fan_mode.label(),
            away_mode: snapshot.away_mode,
            temperature_units: units.code(),
            temperature_units_text: units.label(),
            current_temperature: snapshot.current_temperature,
            current_humidity: snapshot.current_humidity,
            heat_to: snapshot.heat_set_point,
            cool_to: snapshot.cool_set_point,
        }
    }

    /// `Some(n)` pretty-prints with `n`-space indentation.
    pub fn to_json(&self, indent: Option<usize>) -> Result<String> {
        let Some(width) = indent else {
            return Ok(serde_json::to_string(self)?);
        };
        let pad = " ".repeat(width);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(pad.as_bytes());
        let mut out = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut ser)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(mode: OperationMode) -> ThermostatSnapshot {
        ThermostatSnapshot {
            state: OperatingState::Idle,
            operation_mode: mode,
            fan_mode: FanMode::Auto,
            away_mode: 0,
            temperature_units: TemperatureUnits::Fahrenheit,
            current_temperature: 71.0,
            current_humidity: 40.0,
            heat_set_point: 66.0,
            cool_set_point: 76.0,
        }
    }

    #[test]
    fn pair_is_sorted_regardless_of_mode() {
        let mut s = snapshot(OperationMode::Off);
        assert!(s.apply_set_points(SetPointUpdate::Pair(70.0, 65.0)));
        assert_eq!(s.set_points(), (65.0, 70.0));
    }

    #[test]
    fn single_value_targets_cool_in_cool_mode() {
        let mut s = snapshot(OperationMode::CoolOnly);
        s.apply_set_points(SetPointUpdate::Single(68.0));
        assert_eq!(s.set_points(), (66.0, 68.0));
    }

    #[test]
    fn single_value_targets_heat_in_heat_modes() {
        for mode in [OperationMode::HeatOnly, OperationMode::EmergencyHeat] {
            let mut s = snapshot(mode);
            s.apply_set_points(SetPointUpdate::Single(69.0));
            assert_eq!(s.set_points(), (69.0, 76.0));
        }
    }

    #[test]
    fn single_value_ignored_when_off_or_auto() {
        for mode in [OperationMode::Off, OperationMode::HeatOrCool] {
            let mut s = snapshot(mode);
            assert!(!s.apply_set_points(SetPointUpdate::Single(70.0)));
            assert_eq!(s.set_points(), (66.0, 76.0));
        }
    }

    #[test]
    fn single_value_does_not_reorder_against_other_set_point() {
        let mut s = snapshot(OperationMode::HeatOnly);
        s.apply_set_points(SetPointUpdate::Single(80.0));
        assert_eq!(s.set_points(), (80.0, 76.0));
    }

    #[test]
    fn codes_and_labels_follow_upstream_order() {
        let labels: Vec<_> = OperationMode::ALL.iter().map(|m| m.label()).collect();
        assert_eq!(
            labels,
            ["Off", "Heat only", "Cool only", "Heat or Cool", "Emergency Heat"]
        );
        for (i, mode) in OperationMode::ALL.iter().enumerate() {
            assert_eq!(mode.code() as usize, i);
        }
        assert_eq!(OperatingState::try_from(3).unwrap(), OperatingState::Waiting);
        assert_eq!(TemperatureUnits::Celsius.label(), "\u{00b0}C");
    }

    #[test]
    fn unknown_code_is_rejected() {
        let err = FanMode::try_from(7).unwrap_err();
        assert!(matches!(err, Error::InvalidCode { field: "Fan_Mode", code: 7 }));
    }

    #[test]
    fn unit_preference_from_code() {
        assert_eq!(
            UnitPreference::from_code(1),
            UnitPreference::Fixed(TemperatureUnits::Celsius)
        );
        assert_eq!(
            UnitPreference::from_code(0),
            UnitPreference::Fixed(TemperatureUnits::Fahrenheit)
        );
        assert_eq!(UnitPreference::from_code(9), UnitPreference::Device);
    }

    #[test]
    fn report_keeps_field_order() {
        let report = StatusReport::new(
            "ABC123",
            &snapshot(OperationMode::CoolOnly),
            TemperatureUnits::Fahrenheit,
        );
        let json = report.to_json(None).unwrap();
        let keys: Vec<&str> = [
            "serial_number",
            "state",
            "state_text",
            "op_mode",
            "op_mode_text",
            "fan_mode",
            "fan_mode_text",
            "away_mode",
            "temperature_units",
            "temperature_units_text",
            "current_temperature",
            "current_humidity",
            "heat_to",
            "cool_to",
        ]
        .to_vec();
        let positions: Vec<usize> = keys
            .iter()
            .map(|k| json.find(&format!("\"{k}\":")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(json.contains("\"op_mode_text\":\"Cool only\""));
    }

    #[test]
    fn report_indentation() {
        let report = StatusReport::new(
            "ABC123",
            &snapshot(OperationMode::Off),
            TemperatureUnits::Celsius,
        );
        let pretty = report.to_json(Some(4)).unwrap();
        assert!(pretty.contains("\n    \"serial_number\": \"ABC123\""));
        let value: serde_json::Value = serde_json::from_str(&pretty).unwrap();
        assert_eq!(value["temperature_units"], 1);
        assert_eq!(value["temperature_units_text"], "\u{00b0}C");
    }
}
