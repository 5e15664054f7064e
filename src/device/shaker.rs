use std::time::Duration;

use crate::serial::protocol::temperature_tenths;
use crate::serial::{Command, Dialect, PortOpener, Transport};

use super::session::{DeviceSession, Reply};
use super::{
    DeviceError, DeviceFamily, Discovery, ElmState, Result, ShakeState, UNKNOWN_STATE_CODE,
};

pub const DEFAULT_SPEED_TARGET: u32 = 1000;
pub const SPEED_TARGET_MIN: u32 = 200;
pub const SPEED_TARGET_MAX: u32 = 3000;
pub const ACCELERATION_MAX_SECS: u32 = 10;
pub const RUNTIME_MAX_SECS: u64 = 99_999;
pub const TEMP_TARGET_MIN: f64 = 0.0;
pub const TEMP_TARGET_MAX: f64 = 99.0;

/// A BioShake microplate shaker with optional heating and edge locking.
///
/// Setters validate their arguments locally; an out-of-range value is
/// rejected with [`DeviceError::ArgumentOutOfRange`] before anything is sent.
pub struct Shaker<T: Transport> {
    session: DeviceSession<T>,
}

impl<T: Transport> Shaker<T> {
    pub fn new(transport: T) -> Self {
        Self {
            session: DeviceSession::new(transport, Dialect::SHAKER),
        }
    }

    /// Find the single shaker reachable through `opener` and connect to it.
    pub fn discover<P>(opener: &P) -> Result<Self>
    where
        P: PortOpener<Transport = T>,
    {
        let transport = Discovery::new(opener).connect(DeviceFamily::Shaker)?;
        Ok(Self::new(transport))
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.session = self.session.with_tracing(enabled);
        self
    }

    pub fn port(&self) -> &str {
        self.session.port()
    }

    pub fn close(self) -> Result<()> {
        self.session.close()
    }

    /// General information listing.
    pub fn info(&mut self) -> Result<String> {
        self.query_text("info")
    }

    pub fn get_version(&mut self) -> Result<String> {
        self.query_text("getVersion")
    }

    /// Model description, e.g. `BIOSHAKE 3000 elm`.
    pub fn get_description(&mut self) -> Result<String> {
        self.query_text("getDescription")
    }

    /// Restart the controller.
    pub fn reset_device(&mut self) -> Result<()> {
        self.control(Command::new("resetDevice"))
    }

    /// Warnings and errors that occurred, oldest first.
    pub fn get_error_list(&mut self) -> Result<Vec<String>> {
        let text = self.query_text("getErrorList")?;
        Ok(text
            .split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Switch into economical mode.
    ///
    /// The home position solenoid is switched off and the ELM stays locked.
    pub fn set_eco_mode(&mut self) -> Result<()> {
        self.control(Command::new("setEcoMode"))
    }

    /// Leave economical mode and find the home position again.
    pub fn leave_eco_mode(&mut self) -> Result<()> {
        self.control(Command::new("leaveEcoMode"))
    }

    /// Start shaking at `speed_target` rpm.
    pub fn shake_on(&mut self, speed_target: u32) -> Result<()> {
        self.set_shake_target_speed(speed_target)?;
        self.control(Command::new("shakeOn"))
    }

    /// Shake at `speed_target` rpm for `runtime`, truncated to whole seconds.
    pub fn shake_on_with_runtime(&mut self, runtime: Duration, speed_target: u32) -> Result<()> {
        check_range(
            "runtime",
            runtime.as_secs_f64(),
            0.0,
            RUNTIME_MAX_SECS as f64,
        )?;
        self.set_shake_target_speed(speed_target)?;
        self.control(Command::new("shakeOnWithRuntime").arg(runtime.as_secs()))
    }

    pub fn get_shake_remaining_time(&mut self) -> Result<Duration> {
        let secs: u64 = self.query_truncated("getShakeRemainingTime")?;
        Ok(Duration::from_secs(secs))
    }

    /// Stop shaking and return to the home position.
    pub fn shake_off(&mut self) -> Result<()> {
        self.control(Command::new("shakeOff"))
    }

    /// High-speed stop. The home position is not defined afterwards.
    pub fn shake_emergency_off(&mut self) -> Result<()> {
        self.control(Command::new("shakeEmergencyOff"))
    }

    /// Go to the home position and lock in.
    pub fn shake_go_home(&mut self) -> Result<()> {
        self.control(Command::new("shakeGoHome"))
    }

    pub fn get_shake_state(&mut self) -> Result<ShakeState> {
        Ok(ShakeState::from_code(self.query_state("getShakeState")?))
    }

    pub fn get_shake_target_speed(&mut self) -> Result<u32> {
        self.query_truncated("getShakeTargetSpeed")
    }

    /// Set the target mixing speed, 200 to 3000 rpm.
    pub fn set_shake_target_speed(&mut self, speed_target: u32) -> Result<()> {
        check_range(
            "speed_target",
            speed_target as f64,
            SPEED_TARGET_MIN as f64,
            SPEED_TARGET_MAX as f64,
        )?;
        self.control(Command::new("setShakeTargetSpeed").arg(speed_target))
    }

    pub fn get_default_shake_speed_target(&self) -> u32 {
        DEFAULT_SPEED_TARGET
    }

    pub fn get_shake_actual_speed(&mut self) -> Result<u32> {
        self.query_truncated("getShakeActualSpeed")
    }

    pub fn get_shake_min_rpm(&mut self) -> Result<u32> {
        self.query_truncated("getShakeMinRpm")
    }

    pub fn get_shake_max_rpm(&mut self) -> Result<u32> {
        self.query_truncated("getShakeMaxRpm")
    }

    /// Acceleration and deceleration time in seconds.
    pub fn get_shake_acceleration(&mut self) -> Result<u32> {
        self.query_truncated("getShakeAcceleration")
    }

    /// Set the acceleration and deceleration time, 0 to 10 seconds.
    pub fn set_shake_acceleration(&mut self, seconds: u32) -> Result<()> {
        check_range(
            "acceleration",
            seconds as f64,
            0.0,
            ACCELERATION_MAX_SECS as f64,
        )?;
        self.control(Command::new("setShakeAcceleration").arg(seconds))
    }

    /// Set the target temperature and switch temperature control on.
    pub fn temp_on(&mut self, target_celsius: f64) -> Result<()> {
        self.set_temp_target(target_celsius)?;
        self.control(Command::new("tempOn"))
    }

    pub fn temp_off(&mut self) -> Result<()> {
        self.control(Command::new("tempOff"))
    }

    pub fn get_temp_target(&mut self) -> Result<f64> {
        self.query_float("getTempTarget")
    }

    /// Set the target temperature, 0 to 99 °C, sent in tenths of a degree.
    pub fn set_temp_target(&mut self, target_celsius: f64) -> Result<()> {
        check_range("temp_target", target_celsius, TEMP_TARGET_MIN, TEMP_TARGET_MAX)?;
        self.control(Command::new("setTempTarget").arg(temperature_tenths(target_celsius)))
    }

    pub fn get_temp_actual(&mut self) -> Result<f64> {
        self.query_float("getTempActual")
    }

    pub fn get_temp_min(&mut self) -> Result<f64> {
        self.query_float("getTempMin")
    }

    pub fn get_temp_max(&mut self) -> Result<f64> {
        self.query_float("getTempMax")
    }

    /// Close the Edge Locking Mechanism; the microplate is locked.
    pub fn set_elm_lock_pos(&mut self) -> Result<()> {
        self.control(Command::new("setElmLockPos"))
    }

    /// Open the Edge Locking Mechanism for gripping microplates.
    pub fn set_elm_unlock_pos(&mut self) -> Result<()> {
        self.control(Command::new("setElmUnlockPos"))
    }

    pub fn get_elm_state(&mut self) -> Result<ElmState> {
        Ok(ElmState::from_code(self.query_state("getElmState")?))
    }

    fn control(&mut self, command: Command) -> Result<()> {
        let reply = self.session.request(&command)?;
        log::debug!("{} acknowledged with {:?}", reply.request(), reply.text());
        Ok(())
    }

    fn query(&mut self, opcode: &str) -> Result<Reply> {
        self.session.request(&Command::new(opcode))
    }

    fn query_text(&mut self, opcode: &str) -> Result<String> {
        Ok(self.query(opcode)?.text().to_string())
    }

    fn query_float(&mut self, opcode: &str) -> Result<f64> {
        let reply = self.query(opcode)?;
        reply.parse_field(reply.text())
    }

    fn query_truncated<N: TryFrom<i64>>(&mut self, opcode: &str) -> Result<N> {
        let reply = self.query(opcode)?;
        reply.parse_truncated(reply.text())
    }

    /// An empty payload means no state is reported.
    fn query_state(&mut self, opcode: &str) -> Result<i32> {
        let reply = self.query(opcode)?;
        if reply.text().is_empty() {
            Ok(UNKNOWN_STATE_CODE)
        } else {
            reply.parse_field(reply.text())
        }
    }
}

fn check_range(parameter: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if (min..=max).contains(&value) {
        return Ok(());
    }

    log::warn!(
        "Not sending {}: {} is outside the allowed range {} to {}",
        parameter,
        value,
        min,
        max
    );
    Err(DeviceError::ArgumentOutOfRange {
        parameter,
        value,
        min,
        max,
    })
}
