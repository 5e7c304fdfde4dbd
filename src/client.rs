use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::logger::{MessageLogMode, MessageLogger};
use crate::protocol::{
    GET_SYSTEMS_INFO, GET_TSTAT_INFO_LIST, SET_AWAY_MODE, SET_TSTAT_INFO, Service, SetTStatInfo,
    endpoint_url, gateway_serial, parse_systems, parse_zone, parse_zones,
};
use crate::types::*;
use crate::{Error, Result};

pub struct ThermostatClientBuilder {
    username: String,
    password: String,
    system: usize,
    zone: usize,
    service: Service,
    base_url: Option<String>,
    units: UnitPreference,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl ThermostatClientBuilder {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            system: 0,
            zone: 0,
            service: Service::default(),
            base_url: None,
            units: UnitPreference::Device,
            log_mode: None,
            log_path: None,
        }
    }

    pub fn system(mut self, index: usize) -> Self {
        self.system = index;
        self
    }

    pub fn zone(mut self, index: usize) -> Self {
        self.zone = index;
        self
    }

    pub fn service(mut self, service: Service) -> Self {
        self.service = service;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn units(mut self, units: UnitPreference) -> Self {
        self.units = units;
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    /// Service failures leave the client disconnected rather than failing;
    /// only local setup (HTTP client, message log file) returns an error.
    pub async fn connect(self) -> Result<ThermostatClient> {
        let http = reqwest::Client::builder().build()?;

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(MessageLogger::new(mode, &path)?),
            _ => None,
        };

        // The thermostat's own preference is unknown until the first pull,
        // so that pull is made in Fahrenheit.
        let (temperature_units, track_device_units) = match self.units {
            UnitPreference::Device => (TemperatureUnits::Fahrenheit, true),
            UnitPreference::Fixed(units) => (units, false),
        };

        let mut client = ThermostatClient {
            http,
            base_url: self
                .base_url
                .unwrap_or_else(|| self.service.base_url().to_string()),
            username: self.username,
            password: self.password,
            system: self.system,
            zone: self.zone,
            serial_number: None,
            temperature_units,
            track_device_units,
            snapshot: None,
            snapshot_units: temperature_units,
            logger,
        };

        info!(system = client.system, zone = client.zone, "initializing thermostat");

        if let Err(err) = client.resolve_identity().await {
            debug!(%err, "thermostat identity unresolved");
            return Ok(client);
        }

        match client.pull(true).await {
            Ok(()) if client.track_device_units => {
                // Re-request now that the thermostat's preferred units are known.
                if let Err(err) = client.pull(true).await {
                    debug!(%err, "status pull in thermostat units failed");
                }
            }
            Ok(()) => {}
            Err(err) => debug!(%err, "initial status pull failed"),
        }

        Ok(client)
    }
}

/// Setters update the snapshot first and then push it whole. A failed push is
/// returned but the local change is kept until the next pull.
pub struct ThermostatClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    system: usize,
    zone: usize,
    serial_number: Option<String>,
    temperature_units: TemperatureUnits,
    track_device_units: bool,
    snapshot: Option<ThermostatSnapshot>,
    // Units the snapshot's temperatures were requested in.
    snapshot_units: TemperatureUnits,
    logger: Option<MessageLogger>,
}

impl ThermostatClient {
    pub fn builder(username: impl Into<String>, password: impl Into<String>) -> ThermostatClientBuilder {
        ThermostatClientBuilder::new(username, password)
    }

    pub fn is_connected(&self) -> bool {
        self.serial_number.is_some()
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.serial_number.as_deref()
    }

    pub fn system_index(&self) -> usize {
        self.system
    }

    pub fn zone_index(&self) -> usize {
        self.zone
    }

    /// Units the next pull requests temperatures in.
    pub fn temperature_units(&self) -> TemperatureUnits {
        self.temperature_units
    }

    pub fn tracks_device_units(&self) -> bool {
        self.track_device_units
    }

    /// Units of the temperatures held in [`snapshot`](Self::snapshot).
    pub fn snapshot_units(&self) -> TemperatureUnits {
        self.snapshot_units
    }

    pub fn snapshot(&self) -> Option<&ThermostatSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn state(&self) -> Option<OperatingState> {
        self.snapshot.map(|s| s.state)
    }

    pub fn operation_mode(&self) -> Option<OperationMode> {
        self.snapshot.map(|s| s.operation_mode)
    }

    pub fn fan_mode(&self) -> Option<FanMode> {
        self.snapshot.map(|s| s.fan_mode)
    }

    pub fn away_mode(&self) -> Option<u8> {
        self.snapshot.map(|s| s.away_mode)
    }

    pub fn current_temperature(&self) -> Option<f64> {
        self.snapshot.map(|s| s.current_temperature)
    }

    pub fn current_humidity(&self) -> Option<f64> {
        self.snapshot.map(|s| s.current_humidity)
    }

    pub fn set_points(&self) -> Option<(f64, f64)> {
        self.snapshot.map(|s| s.set_points())
    }

    pub async fn pull_status(&mut self) -> Result<()> {
        self.pull(false).await
    }

    /// The write is not read back.
    pub async fn push_settings(&mut self) -> Result<()> {
        let serial = self.serial_number.clone().ok_or(Error::NotConnected)?;
        let snapshot = self.snapshot.ok_or(Error::NoStatus)?;

        let payload = SetTStatInfo::new(&snapshot, self.snapshot_units, self.zone, &serial);
        let body = serde_json::to_value(&payload)?;
        self.request(Method::PUT, SET_TSTAT_INFO, &[], Some(body)).await?;
        Ok(())
    }

    // The snapshot's away flag only changes on the next pull.
    pub async fn set_away_mode(&mut self, away: bool) -> Result<()> {
        let serial = self.serial_number.clone().ok_or(Error::NotConnected)?;
        let query = [
            ("gatewaysn", serial),
            ("awaymode", u8::from(away).to_string()),
        ];
        self.request(Method::PUT, SET_AWAY_MODE, &query, None).await?;
        Ok(())
    }

    pub async fn set_operation_mode(&mut self, mode: OperationMode) -> Result<()> {
        self.update(|s| s.operation_mode = mode)?;
        self.push_settings().await
    }

    pub async fn set_fan_mode(&mut self, mode: FanMode) -> Result<()> {
        self.update(|s| s.fan_mode = mode)?;
        self.push_settings().await
    }

    pub async fn set_set_points(&mut self, update: impl Into<SetPointUpdate>) -> Result<()> {
        let update = update.into();
        let mut changed = false;
        self.update(|s| changed = s.apply_set_points(update))?;
        if !changed {
            debug!(?update, "set points unchanged");
        }
        self.push_settings().await
    }

    /// Re-pulls in `units` without changing the thermostat's stored preference.
    pub async fn set_temperature_units(&mut self, units: TemperatureUnits) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        self.temperature_units = units;
        self.track_device_units = false;
        self.pull(false).await
    }

    pub async fn export_status(&mut self) -> Result<StatusReport> {
        self.pull(false).await?;
        let serial = self.serial_number.as_deref().ok_or(Error::NotConnected)?;
        let snapshot = self.snapshot.as_ref().ok_or(Error::NoStatus)?;
        Ok(StatusReport::new(serial, snapshot, self.snapshot_units))
    }

    // -- Remote operations --

    async fn resolve_identity(&mut self) -> Result<()> {
        let query = [("UserId", self.username.clone())];
        let body = self.request(Method::GET, GET_SYSTEMS_INFO, &query, None).await?;
        let systems = parse_systems(&body).map_err(malformed)?;

        let system = match systems.get(self.system) {
            Some(system) => system,
            None => {
                warn!(system = self.system, "specified system not found, switching to first system");
                self.system = 0;
                systems.first().ok_or_else(|| {
                    error!("no systems found");
                    Error::InvalidSystem(0)
                })?
            }
        };

        let serial = gateway_serial(system).map_err(malformed)?;
        debug!(serial = %serial, system = self.system, "resolved gateway");
        self.serial_number = Some(serial);
        Ok(())
    }

    async fn pull(&mut self, initial: bool) -> Result<()> {
        let Some(serial) = self.serial_number.clone() else {
            debug!("not connected, skipping status pull");
            return Err(Error::NotConnected);
        };

        let requested = self.temperature_units;
        let query = [
            ("gatewaysn", serial),
            ("TempUnit", requested.code().to_string()),
        ];
        let body = self.request(Method::GET, GET_TSTAT_INFO_LIST, &query, None).await?;
        let zones = parse_zones(&body).map_err(malformed)?;

        let zone = match zones.get(self.zone) {
            Some(zone) => zone,
            None if initial => {
                warn!(zone = self.zone, "specified zone doesn't exist, switching to first zone");
                self.zone = 0;
                zones.first().ok_or_else(|| {
                    error!("no zones found");
                    Error::InvalidZone(0)
                })?
            }
            None => {
                error!(
                    zone = self.zone,
                    available = zones.len(),
                    "specified zone doesn't exist, keeping previous status"
                );
                return Err(Error::InvalidZone(self.zone));
            }
        };

        let snapshot = parse_zone(zone).map_err(malformed)?;
        if self.track_device_units {
            self.temperature_units = snapshot.temperature_units;
        }
        self.snapshot = Some(snapshot);
        self.snapshot_units = requested;
        Ok(())
    }

    // -- Helpers --

    fn update(&mut self, f: impl FnOnce(&mut ThermostatSnapshot)) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        let snapshot = self.snapshot.as_mut().ok_or(Error::NoStatus)?;
        f(snapshot);
        Ok(())
    }

    async fn request(
        &mut self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<String> {
        let url = endpoint_url(&self.base_url, endpoint);
        debug!(method = %method, url = %url, ?query, "requesting");

        if let Some(ref mut logger) = self.logger {
            logger.log_request(method.as_str(), endpoint, query, body.as_ref());
        }

        let mut req = self
            .http
            .request(method, &url)
            .basic_auth(&self.username, Some(&self.password))
            .query(query);
        if let Some(ref body) = body {
            req = req.json(body);
        }

        let resp = req.send().await.inspect_err(|e| {
            error!(error = %e, "myicomfort cloud service unreachable");
        })?;
        let status = resp.status();
        let text = resp.text().await?;

        if let Some(ref mut logger) = self.logger {
            logger.log_response(endpoint, status.as_u16(), &text);
        }
        debug!(status = status.as_u16(), body = %text, "{endpoint} response");

        if status.is_success() {
            Ok(text)
        } else if status == StatusCode::UNAUTHORIZED {
            error!("username or password incorrect");
            Err(Error::Unauthorized)
        } else {
            error!(status = status.as_u16(), "myicomfort cloud service not responding");
            Err(Error::Unavailable {
                status: status.as_u16(),
            })
        }
    }
}

fn malformed(e: serde_json::Error) -> Error {
    error!(error = %e, "malformed response from myicomfort cloud service");
    Error::Json(e)
}
