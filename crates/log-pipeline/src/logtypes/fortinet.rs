//! Fortinet FortiGate 로그 (key=value 형식)

use crate::logtype::LogTypeConfig;
use crate::parser::{AdapterFactory, KeyValueAdapter};
use crate::schema::{Field, Schema, TimeFormat};

pub const TYPE_FORTINET_TRAFFIC: &str = "Fortinet.Traffic";

pub fn log_types() -> Vec<LogTypeConfig> {
    vec![
        LogTypeConfig::new(
            TYPE_FORTINET_TRAFFIC,
            "FortiGate forward/local traffic logs",
            "https://docs.fortinet.com/document/fortigate/7.4.0/fortios-log-message-reference",
            traffic_schema(),
        )
        .with_parser(AdapterFactory::shared(KeyValueAdapter::default())),
    ]
}

/// FortiOS 6.2 이상 형식. `eventtime`은 나노초 epoch 입니다.
fn traffic_schema() -> Schema {
    Schema::new(vec![
        Field::timestamp("date", TimeFormat::strftime("%Y-%m-%d"), "Day the log was recorded (device local time)"),
        Field::string("time", "Time of day the log was recorded (device local time)"),
        Field::timestamp("eventtime", TimeFormat::UnixNanos, "Epoch time the log was triggered")
            .event_time(),
        Field::string("tz", "Device time zone"),
        Field::string("logid", "Log ID").required(),
        Field::string("type", "Log type").required(),
        Field::string("subtype", "Log subtype").required(),
        Field::string("level", "Log severity level"),
        Field::string("vd", "Virtual domain name"),
        Field::string("devname", "Device name"),
        Field::string("devid", "Device serial number"),
        Field::string("srcip", "Source IP address"),
        Field::integer("srcport", "Source port number"),
        Field::string("srcintf", "Source interface name"),
        Field::string("dstip", "Destination IP address"),
        Field::integer("dstport", "Destination port number"),
        Field::string("dstintf", "Destination interface name"),
        Field::integer("policyid", "Firewall policy ID"),
        Field::integer("sessionid", "Session ID"),
        Field::integer("proto", "IANA protocol number"),
        Field::string("action", "Policy action").required(),
        Field::string("service", "Service name"),
        Field::integer("duration", "Session duration in seconds"),
        Field::integer("sentbyte", "Bytes sent"),
        Field::integer("rcvdbyte", "Bytes received"),
        Field::integer("sentpkt", "Packets sent"),
        Field::integer("rcvdpkt", "Packets received"),
    ])
}
