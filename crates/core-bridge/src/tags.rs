/// Field naming shared by the wire protocol and the metrics exporter, so a
/// value keeps one name all the way from the bus to a dashboard.
#[derive(Debug, Clone, Copy)]
pub struct Tag {
    pub key: &'static str,
    pub metric: &'static str,
}

pub const ESC_ONLINE_COUNT: Tag = Tag {
    key: "online_count",
    metric: "rotorbridge_esc_online_count",
};

pub const ESC_VOLTAGE_V: Tag = Tag {
    key: "voltage_v",
    metric: "rotorbridge_esc_voltage_volts",
};

pub const ESC_CURRENT_A: Tag = Tag {
    key: "current_a",
    metric: "rotorbridge_esc_current_amperes",
};

pub const ESC_TEMPERATURE_C: Tag = Tag {
    key: "temperature_c",
    metric: "rotorbridge_esc_temperature_celsius",
};

pub const ESC_RPM: Tag = Tag {
    key: "rpm",
    metric: "rotorbridge_esc_rpm",
};

pub const SNAPSHOT_COUNTER: Tag = Tag {
    key: "counter",
    metric: "rotorbridge_snapshot_counter",
};
