//! Zeek 네트워크 센서 로그

use crate::logtype::LogTypeConfig;
use crate::parser::{AdapterFactory, JsonAdapter};
use crate::schema::{Field, FieldKind, Schema, TimeFormat};

pub const TYPE_ZEEK_DNS: &str = "Zeek.DNS";

/// Zeek 로그 타입 선언
pub fn log_types() -> Vec<LogTypeConfig> {
    vec![
        LogTypeConfig::new(
            TYPE_ZEEK_DNS,
            "Zeek DNS activity",
            "https://docs.zeek.org/en/current/scripts/base/protocols/dns/main.zeek.html#type-DNS::Info",
            dns_schema(),
        )
        .with_parser(AdapterFactory::shared(JsonAdapter::default())),
    ]
}

/// `dns.log` (JSON 출력)
///
/// Zeek은 `id.orig_h`처럼 점이 들어간 키를 평탄하게 출력하므로 원본 키를 따로 지정합니다.
fn dns_schema() -> Schema {
    Schema::new(vec![
        Field::timestamp("ts", TimeFormat::UnixSeconds, "The earliest time at which a DNS protocol message over the associated connection is observed")
            .required()
            .event_time(),
        Field::string("uid", "A unique identifier of the connection over which DNS messages are being transferred").required(),
        Field::string("id_orig_h", "The originator's IP address").source("id.orig_h").required(),
        Field::integer("id_orig_p", "The originator's port number").source("id.orig_p").required(),
        Field::string("id_resp_h", "The responder's IP address").source("id.resp_h").required(),
        Field::integer("id_resp_p", "The responder's port number").source("id.resp_p").required(),
        Field::string("proto", "The transport layer protocol of the connection").required(),
        Field::integer("trans_id", "A 16-bit identifier assigned by the program that generated the DNS query"),
        Field::float("rtt", "Round trip time for the query and response"),
        Field::string("query", "The domain name that is the subject of the DNS query"),
        Field::integer("qclass", "The QCLASS value specifying the class of the query"),
        Field::string("qclass_name", "A descriptive name for the class of the query"),
        Field::integer("qtype", "A QTYPE value specifying the type of the query"),
        Field::string("qtype_name", "A descriptive name for the type of the query"),
        Field::integer("rcode", "The response code value in DNS response messages"),
        Field::string("rcode_name", "A descriptive name for the response code value"),
        Field::boolean("AA", "The Authoritative Answer bit for response messages"),
        Field::boolean("TC", "The Truncation bit specifies that the message was truncated"),
        Field::boolean("RD", "The Recursion Desired bit in a request message"),
        Field::boolean("RA", "The Recursion Available bit in a response message"),
        Field::integer("Z", "A reserved field that is usually zero"),
        Field::array("answers", FieldKind::String, "The set of resource descriptions in the query answer"),
        Field::array("TTLs", FieldKind::Float, "The caching intervals of the associated RRs described by the answers field"),
        Field::boolean("rejected", "The DNS query was rejected by the server"),
    ])
}
