use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::*;

pub const MYICOMFORT_URL: &str = "https://services.myicomfort.com/DBAcessService.svc/";
pub const LENNOX_URL: &str = "https://services.lennoxicomfort.com/DBAcessService.svc/";

pub(crate) const GET_SYSTEMS_INFO: &str = "GetSystemsInfo";
pub(crate) const GET_TSTAT_INFO_LIST: &str = "GetTStatInfoList";
pub(crate) const SET_TSTAT_INFO: &str = "SetTStatInfo";
pub(crate) const SET_AWAY_MODE: &str = "SetAwayModeNew";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Service {
    #[default]
    MyIComfort,
    Lennox,
}

impl Service {
    pub fn base_url(&self) -> &'static str {
        match self {
            Service::MyIComfort => MYICOMFORT_URL,
            Service::Lennox => LENNOX_URL,
        }
    }
}

pub(crate) fn endpoint_url(base: &str, endpoint: &str) -> String {
    format!("{}/{endpoint}", base.trim_end_matches('/'))
}

/// Integer code that may arrive as a JSON number or a numeric string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code(pub u8);

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Number(f64),
    Text(String),
}

pub(crate) fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Lenient::deserialize(deserializer)? {
        Lenient::Number(n) => Ok(n),
        Lenient::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("expected a number, got {s:?}"))),
    }
}

impl<'de> Deserialize<'de> for Code {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let n = lenient_number(deserializer)?;
        if n.fract() != 0.0 || !(0.0..=255.0).contains(&n) {
            return Err(de::Error::custom(format!("expected an integer code, got {n}")));
        }
        Ok(Code(n as u8))
    }
}

#[derive(Debug, Deserialize)]
struct SystemsInfo {
    #[serde(rename = "Systems", default)]
    systems: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SystemRecord {
    #[serde(rename = "Gateway_SN")]
    gateway_sn: String,
}

#[derive(Debug, Deserialize)]
struct TStatInfoList {
    #[serde(rename = "tStatInfo", default)]
    zones: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ZoneRecord {
    #[serde(rename = "System_Status")]
    state: OperatingState,
    #[serde(rename = "Operation_Mode")]
    operation_mode: OperationMode,
    #[serde(rename = "Fan_Mode")]
    fan_mode: FanMode,
    #[serde(rename = "Away_Mode")]
    away_mode: Code,
    #[serde(rename = "Pref_Temp_Units")]
    temperature_units: TemperatureUnits,
    #[serde(rename = "Indoor_Temp", deserialize_with = "lenient_number")]
    current_temperature: f64,
    #[serde(rename = "Indoor_Humidity", deserialize_with = "lenient_number")]
    current_humidity: f64,
    #[serde(rename = "Heat_Set_Point", deserialize_with = "lenient_number")]
    heat_set_point: f64,
    #[serde(rename = "Cool_Set_Point", deserialize_with = "lenient_number")]
    cool_set_point: f64,
}

impl From<ZoneRecord> for ThermostatSnapshot {
    fn from(r: ZoneRecord) -> Self {
        ThermostatSnapshot {
            state: r.state,
            operation_mode: r.operation_mode,
            fan_mode: r.fan_mode,
            away_mode: r.away_mode.0,
            temperature_units: r.temperature_units,
            current_temperature: r.current_temperature,
            current_humidity: r.current_humidity,
            heat_set_point: r.heat_set_point,
            cool_set_point: r.cool_set_point,
        }
    }
}

// A null or missing list is treated as empty.
pub(crate) fn parse_systems(body: &str) -> serde_json::Result<Vec<Value>> {
    let info: SystemsInfo = serde_json::from_str(body)?;
    Ok(info.systems.unwrap_or_default())
}

pub(crate) fn gateway_serial(system: &Value) -> serde_json::Result<String> {
    SystemRecord::deserialize(system).map(|s| s.gateway_sn)
}

pub(crate) fn parse_zones(body: &str) -> serde_json::Result<Vec<Value>> {
    let list: TStatInfoList = serde_json::from_str(body)?;
    Ok(list.zones.unwrap_or_default())
}

pub(crate) fn parse_zone(zone: &Value) -> serde_json::Result<ThermostatSnapshot> {
    ZoneRecord::deserialize(zone).map(ThermostatSnapshot::from)
}

#[derive(Debug, Serialize)]
pub(crate) struct SetTStatInfo<'a> {
    #[serde(rename = "Cool_Set_Point")]
    pub cool_set_point: f64,
    #[serde(rename = "Heat_Set_Point")]
    pub heat_set_point: f64,
    #[serde(rename = "Fan_Mode")]
    pub fan_mode: FanMode,
    #[serde(rename = "Operation_Mode")]
    pub operation_mode: OperationMode,
    #[serde(rename = "Pref_Temp_Units")]
    pub temperature_units: TemperatureUnits,
    #[serde(rename = "Zone_Number")]
    pub zone: usize,
    #[serde(rename = "GatewaySN")]
    pub serial_number: &'a str,
}

impl<'a> SetTStatInfo<'a> {
    pub fn new(
        snapshot: &ThermostatSnapshot,
        units: TemperatureUnits,
        zone: usize,
        serial_number: &'a str,
    ) -> Self {
        Self {
            cool_set_point: snapshot.cool_set_point,
            heat_set_point: snapshot.heat_set_point,
            fan_mode: snapshot.fan_mode,
            operation_mode: snapshot.operation_mode,
            temperature_units: units,
            zone,
            serial_number,
        }
    }
}
