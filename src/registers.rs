//! Register address tables for known meter families.
//!
//! Reference data only; any `u16` can be passed to
//! [`MeterClient::read_registers`](crate::client::MeterClient::read_registers).

/// Registers of the Kamstrup 382 kWh meter.
pub mod kamstrup_382 {
    /// Energy in.
    pub const ENERGY_IN: u16 = 0x0001;
    /// Energy out.
    pub const ENERGY_OUT: u16 = 0x0002;
    /// Energy in, high resolution.
    pub const ENERGY_IN_HIRES: u16 = 0x000D;
    /// Energy out, high resolution.
    pub const ENERGY_OUT_HIRES: u16 = 0x000E;

    /// Voltage, phase 1.
    pub const VOLTAGE_P1: u16 = 0x041E;
    /// Voltage, phase 2.
    pub const VOLTAGE_P2: u16 = 0x041F;
    /// Voltage, phase 3.
    pub const VOLTAGE_P3: u16 = 0x0420;

    /// Current, phase 1.
    pub const CURRENT_P1: u16 = 0x0434;
    /// Current, phase 2.
    pub const CURRENT_P2: u16 = 0x0435;
    /// Current, phase 3.
    pub const CURRENT_P3: u16 = 0x0436;

    /// Internal meter temperature.
    pub const INTERNAL_TEMPERATURE: u16 = 0x0437;

    /// Power, phase 1.
    pub const POWER_P1: u16 = 0x0438;
    /// Power, phase 2.
    pub const POWER_P2: u16 = 0x0439;
    /// Power, phase 3.
    pub const POWER_P3: u16 = 0x043A;
}

/// Registers of the Multical 601 heat meter.
pub mod multical_601 {
    /// Current date (YYMMDD).
    pub const DATE: u16 = 0x03EB;
    /// Energy register 1: heat energy.
    pub const ENERGY_1: u16 = 0x003C;
    /// Energy register 2: control energy.
    pub const ENERGY_2: u16 = 0x005E;
    /// Energy register 3: cooling energy.
    pub const ENERGY_3: u16 = 0x003F;
    /// Energy register 4: flow energy.
    pub const ENERGY_4: u16 = 0x003D;
    /// Energy register 5: return flow energy.
    pub const ENERGY_5: u16 = 0x003E;
    /// Energy register 6: tap water energy.
    pub const ENERGY_6: u16 = 0x005F;
    /// Energy register 7: heat energy Y.
    pub const ENERGY_7: u16 = 0x0060;
    /// Energy register 8: [m3 * T1].
    pub const ENERGY_8: u16 = 0x0061;
    /// Energy register 9: [m3 * T2].
    pub const ENERGY_9: u16 = 0x006E;

    /// Alias for [`ENERGY_1`].
    pub const HEAT_ENERGY: u16 = ENERGY_1;
    /// Alias for [`ENERGY_2`].
    pub const CONTROL_ENERGY: u16 = ENERGY_2;
    /// Alias for [`ENERGY_3`].
    pub const COOLING_ENERGY: u16 = ENERGY_3;
    /// Alias for [`ENERGY_4`].
    pub const FLOW_ENERGY: u16 = ENERGY_4;
    /// Alias for [`ENERGY_5`].
    pub const RETURN_FLOW_ENERGY: u16 = ENERGY_5;
    /// Alias for [`ENERGY_6`].
    pub const TAP_WATER_ENERGY: u16 = ENERGY_6;
    /// Alias for [`ENERGY_7`].
    pub const HEAT_ENERGY_Y: u16 = ENERGY_7;
}
